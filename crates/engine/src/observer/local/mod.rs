// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Local observer: full scans and filesystem watching
//!
//! Two modes. The one-time full scan walks the sync root, hashes with a
//! bounded pool, and diffs against the baseline; watch mode subscribes to
//! filesystem notifications with per-path debouncing. Both feed the same
//! bounded event channel with a counted drop policy.

pub mod scan;
pub mod stable_hash;
pub mod watch;

use parking_lot::Mutex;
use skiff_core::{ChangeEvent, ExclusionSet, HasherFactory, SyncError};
use skiff_store::Baseline;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Observer lifecycle, exposed for diagnostics and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObserverState {
    Idle,
    Scanning,
    Watching,
    Backoff,
    Stopped,
}

/// Scanning half of the local observer. The watching half lives in
/// [`watch::LocalWatcher`] and shares the state cell.
pub struct LocalObserver {
    root: PathBuf,
    excludes: Arc<ExclusionSet>,
    hasher: HasherFactory,
    parallel_hashes: usize,
    state: Arc<Mutex<ObserverState>>,
    dropped: Arc<AtomicU64>,
}

impl LocalObserver {
    pub fn new(
        root: PathBuf,
        excludes: ExclusionSet,
        hasher: HasherFactory,
        parallel_hashes: usize,
    ) -> Self {
        Self {
            root,
            excludes: Arc::new(excludes),
            hasher,
            parallel_hashes: parallel_hashes.max(1),
            state: Arc::new(Mutex::new(ObserverState::Idle)),
            dropped: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn state(&self) -> ObserverState {
        *self.state.lock()
    }

    pub(crate) fn state_cell(&self) -> Arc<Mutex<ObserverState>> {
        Arc::clone(&self.state)
    }

    pub(crate) fn excludes(&self) -> Arc<ExclusionSet> {
        Arc::clone(&self.excludes)
    }

    pub(crate) fn hasher(&self) -> HasherFactory {
        Arc::clone(&self.hasher)
    }

    pub(crate) fn root(&self) -> &std::path::Path {
        &self.root
    }

    /// Events dropped on the bounded channel; reset each cycle.
    pub fn take_dropped(&self) -> u64 {
        self.dropped.swap(0, Ordering::Relaxed)
    }

    pub(crate) fn dropped_cell(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.dropped)
    }

    /// Full scan of the sync root, diffed against the baseline.
    pub async fn scan(
        &self,
        baseline: &Baseline,
        cancel: &CancellationToken,
    ) -> Result<Vec<ChangeEvent>, SyncError> {
        *self.state.lock() = ObserverState::Scanning;
        let result = scan::scan_tree(
            &self.root,
            baseline,
            &self.excludes,
            &self.hasher,
            self.parallel_hashes,
            cancel,
        )
        .await;
        *self.state.lock() = match result {
            Ok(_) => ObserverState::Idle,
            Err(_) => ObserverState::Stopped,
        };
        result
    }
}
