// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-flight action registry and repeated-failure backoff

use parking_lot::Mutex;
use skiff_core::{Clock, SyncPath};
use std::collections::{HashMap, HashSet};
use std::time::Duration;

const BACKOFF_BASE: Duration = Duration::from_secs(30);
const BACKOFF_MAX: Duration = Duration::from_secs(3600);

#[derive(Debug, Clone, Copy)]
struct FailureState {
    consecutive: u32,
    last_failure_ms: u64,
}

#[derive(Default)]
struct TrackerInner {
    in_flight: HashSet<SyncPath>,
    failures: HashMap<SyncPath, FailureState>,
}

/// Single owner of per-path in-flight state and failure suppression.
///
/// No two actions for the same path run concurrently; a path that keeps
/// failing is skipped for an exponentially expanding window.
pub struct Tracker<C: Clock> {
    inner: Mutex<TrackerInner>,
    clock: C,
}

impl<C: Clock> Tracker<C> {
    pub fn new(clock: C) -> Self {
        Self {
            inner: Mutex::new(TrackerInner::default()),
            clock,
        }
    }

    pub fn has_in_flight(&self, path: &SyncPath) -> bool {
        self.inner.lock().in_flight.contains(path)
    }

    /// Claim a path for execution. Returns false when already claimed.
    pub fn begin(&self, path: &SyncPath) -> bool {
        self.inner.lock().in_flight.insert(path.clone())
    }

    /// Release a path and update its failure accounting.
    pub fn mark_done(&self, path: &SyncPath, success: bool) {
        let mut inner = self.inner.lock();
        inner.in_flight.remove(path);
        if success {
            inner.failures.remove(path);
        } else {
            let now = self.clock.epoch_ms();
            let entry = inner.failures.entry(path.clone()).or_insert(FailureState {
                consecutive: 0,
                last_failure_ms: now,
            });
            entry.consecutive += 1;
            entry.last_failure_ms = now;
        }
    }

    /// Drop in-flight state for a path (cycle cancellation).
    pub fn cancel_by_path(&self, path: &SyncPath) {
        self.inner.lock().in_flight.remove(path);
    }

    /// True while the path's backoff window is open.
    pub fn is_suppressed(&self, path: &SyncPath) -> bool {
        let inner = self.inner.lock();
        let Some(state) = inner.failures.get(path) else {
            return false;
        };
        let exp = state.consecutive.saturating_sub(1).min(16);
        let window = BACKOFF_BASE.saturating_mul(1u32 << exp).min(BACKOFF_MAX);
        let elapsed_ms = self.clock.epoch_ms().saturating_sub(state.last_failure_ms);
        elapsed_ms < window.as_millis() as u64
    }

    /// Consecutive failure count for a path (diagnostics).
    pub fn failure_count(&self, path: &SyncPath) -> u32 {
        self.inner
            .lock()
            .failures
            .get(path)
            .map(|s| s.consecutive)
            .unwrap_or(0)
    }
}

#[cfg(test)]
#[path = "tracker_tests.rs"]
mod tests;
