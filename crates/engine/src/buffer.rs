// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-path event coalescing

use skiff_core::{ChangeEvent, SyncError, SyncPath};
use std::collections::HashMap;

/// Coalesces observed events per path and yields a stable planning order.
///
/// Later events replace earlier ones at the same path; exceeding the cap
/// is a [`SyncError::BufferOverflow`], which the engine answers with a
/// full rescan.
pub struct ChangeBuffer {
    cap: usize,
    events: HashMap<SyncPath, ChangeEvent>,
}

impl ChangeBuffer {
    pub fn new(cap: usize) -> Self {
        Self {
            cap,
            events: HashMap::new(),
        }
    }

    /// Insert or replace the latest event for a path.
    pub fn push(&mut self, event: ChangeEvent) -> Result<(), SyncError> {
        if !self.events.contains_key(&event.path) && self.events.len() >= self.cap {
            return Err(SyncError::BufferOverflow { cap: self.cap });
        }
        self.events.insert(event.path.clone(), event);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Drain in stable order: deletions before creations within a parent,
    /// then lexicographic.
    pub fn flush(&mut self) -> Vec<ChangeEvent> {
        let mut out: Vec<ChangeEvent> = self.events.drain().map(|(_, e)| e).collect();
        out.sort_by(|a, b| a.flush_key().cmp(&b.flush_key()));
        out
    }
}

#[cfg(test)]
#[path = "buffer_tests.rs"]
mod tests;
