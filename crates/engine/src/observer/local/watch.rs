// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Continuous filesystem watching
//!
//! Subscribes recursively via `notify`, coalesces write bursts with a
//! per-path cooldown, and emits normalized change events on a bounded
//! channel (non-blocking sends; drops are counted and reset each cycle).
//! Watcher errors trigger exponential backoff (1 s doubling to 30 s) and
//! a restart; deletion of the sync root itself raises a distinguished
//! error.

use super::stable_hash::{stable_hash_file, DEFAULT_ATTEMPTS};
use super::ObserverState;
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::Mutex;
use skiff_core::{
    ChangeEvent, ChangeKind, ExclusionSet, HasherFactory, Origin, SyncError, SyncPath,
};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

const BACKOFF_MIN: Duration = Duration::from_secs(1);
const BACKOFF_MAX: Duration = Duration::from_secs(30);
/// How often pending paths are checked against the cooldown.
const SWEEP_INTERVAL: Duration = Duration::from_millis(100);

/// Handle to the background watch task.
pub struct LocalWatcher {
    task: tokio::task::JoinHandle<()>,
}

impl LocalWatcher {
    /// Spawn the watch loop. Debounced events arrive on `event_tx`
    /// (non-blocking; overflow counted in `dropped`), fatal observer
    /// errors on `error_tx`.
    #[allow(clippy::too_many_arguments)]
    pub fn spawn(
        root: PathBuf,
        excludes: Arc<ExclusionSet>,
        hasher: HasherFactory,
        debounce: Duration,
        event_tx: mpsc::Sender<ChangeEvent>,
        error_tx: mpsc::Sender<SyncError>,
        state: Arc<Mutex<ObserverState>>,
        dropped: Arc<AtomicU64>,
        cancel: CancellationToken,
    ) -> Self {
        let task = tokio::spawn(async move {
            watch_loop(
                root, excludes, hasher, debounce, event_tx, error_tx, state, dropped, cancel,
            )
            .await;
        });
        Self { task }
    }

    pub fn abort(&self) {
        self.task.abort();
    }
}

type RawEvent = Result<notify::Event, notify::Error>;

fn make_watcher(
    root: &Path,
    raw_tx: mpsc::UnboundedSender<RawEvent>,
) -> Result<RecommendedWatcher, notify::Error> {
    let mut watcher = notify::recommended_watcher(move |res: RawEvent| {
        let _ = raw_tx.send(res);
    })?;
    watcher.watch(root, RecursiveMode::Recursive)?;
    Ok(watcher)
}

#[allow(clippy::too_many_arguments)]
async fn watch_loop(
    root: PathBuf,
    excludes: Arc<ExclusionSet>,
    hasher: HasherFactory,
    debounce: Duration,
    event_tx: mpsc::Sender<ChangeEvent>,
    error_tx: mpsc::Sender<SyncError>,
    state: Arc<Mutex<ObserverState>>,
    dropped: Arc<AtomicU64>,
    cancel: CancellationToken,
) {
    let mut backoff = BACKOFF_MIN;
    'restart: loop {
        if cancel.is_cancelled() {
            break;
        }
        let (raw_tx, mut raw_rx) = mpsc::unbounded_channel();
        let watcher = match make_watcher(&root, raw_tx) {
            Ok(w) => w,
            Err(e) => {
                if !root.exists() {
                    let _ = error_tx.send(SyncError::SyncRootDeleted).await;
                    *state.lock() = ObserverState::Stopped;
                    return;
                }
                tracing::warn!(error = %e, backoff_s = backoff.as_secs(), "watcher setup failed");
                *state.lock() = ObserverState::Backoff;
                tokio::select! {
                    _ = cancel.cancelled() => break 'restart,
                    _ = tokio::time::sleep(backoff) => {}
                }
                backoff = (backoff * 2).min(BACKOFF_MAX);
                continue 'restart;
            }
        };
        backoff = BACKOFF_MIN;
        *state.lock() = ObserverState::Watching;
        tracing::info!(root = %root.display(), "filesystem watcher started");

        let mut pending: HashMap<SyncPath, Instant> = HashMap::new();
        let mut sweep = tokio::time::interval(SWEEP_INTERVAL);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    drop(watcher);
                    break 'restart;
                }
                raw = raw_rx.recv() => {
                    match raw {
                        Some(Ok(event)) => {
                            for fs_path in event.paths {
                                if fs_path == root {
                                    if !root.exists() {
                                        let _ = error_tx.send(SyncError::SyncRootDeleted).await;
                                        *state.lock() = ObserverState::Stopped;
                                        drop(watcher);
                                        break 'restart;
                                    }
                                    continue;
                                }
                                let Some(path) = SyncPath::from_fs(&root, &fs_path) else {
                                    continue;
                                };
                                if path.is_root() || excludes.is_excluded(&path) {
                                    continue;
                                }
                                pending.insert(path, Instant::now());
                            }
                        }
                        Some(Err(e)) => {
                            tracing::warn!(error = %e, "watcher error; restarting with backoff");
                            *state.lock() = ObserverState::Backoff;
                            drop(watcher);
                            tokio::select! {
                                _ = cancel.cancelled() => break 'restart,
                                _ = tokio::time::sleep(backoff) => {}
                            }
                            backoff = (backoff * 2).min(BACKOFF_MAX);
                            continue 'restart;
                        }
                        None => {
                            // Channel closed: the watcher thread is gone.
                            *state.lock() = ObserverState::Backoff;
                            tokio::select! {
                                _ = cancel.cancelled() => break 'restart,
                                _ = tokio::time::sleep(backoff) => {}
                            }
                            backoff = (backoff * 2).min(BACKOFF_MAX);
                            continue 'restart;
                        }
                    }
                }
                _ = sweep.tick() => {
                    if !root.exists() {
                        let _ = error_tx.send(SyncError::SyncRootDeleted).await;
                        *state.lock() = ObserverState::Stopped;
                        drop(watcher);
                        break 'restart;
                    }
                    let now = Instant::now();
                    let ready: Vec<SyncPath> = pending
                        .iter()
                        .filter(|(_, last)| now.duration_since(**last) >= debounce)
                        .map(|(p, _)| p.clone())
                        .collect();
                    for path in ready {
                        pending.remove(&path);
                        if let Some(event) = settle_path(&root, &path, &hasher).await {
                            match event_tx.try_send(event) {
                                Ok(()) => {}
                                Err(mpsc::error::TrySendError::Full(_)) => {
                                    dropped.fetch_add(1, Ordering::Relaxed);
                                }
                                Err(mpsc::error::TrySendError::Closed(_)) => {
                                    drop(watcher);
                                    break 'restart;
                                }
                            }
                        }
                    }
                }
            }
        }
    }
    *state.lock() = ObserverState::Stopped;
    tracing::debug!("filesystem watcher stopped");
}

/// Stat the settled path and build the corresponding event. Hash failures
/// still emit (with an empty hash) so the planner can defer.
async fn settle_path(root: &Path, path: &SyncPath, hasher: &HasherFactory) -> Option<ChangeEvent> {
    let fs_path = path.to_fs(root);
    let meta = match std::fs::symlink_metadata(&fs_path) {
        Ok(meta) => meta,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Some(ChangeEvent {
                kind: ChangeKind::Delete,
                origin: Origin::Local,
                path: path.clone(),
                name: path.name().to_string(),
                is_folder: false,
                item_id: None,
                parent_id: None,
                size: 0,
                hash: None,
                hash_kind: None,
                mtime: None,
                etag: None,
            });
        }
        Err(e) => {
            tracing::warn!(path = %path, error = %e, "stat failed in watcher");
            return None;
        }
    };

    if meta.is_dir() {
        return Some(ChangeEvent {
            kind: ChangeKind::Create,
            origin: Origin::Local,
            path: path.clone(),
            name: path.name().to_string(),
            is_folder: true,
            item_id: None,
            parent_id: None,
            size: 0,
            hash: None,
            hash_kind: None,
            mtime: None,
            etag: None,
        });
    }
    if !meta.is_file() {
        return None;
    }

    let factory = Arc::clone(hasher);
    let fs_path_for_hash = fs_path.clone();
    let stable = tokio::task::spawn_blocking(move || {
        stable_hash_file(&fs_path_for_hash, &factory, DEFAULT_ATTEMPTS)
    })
    .await
    .ok()?
    .ok()?;

    Some(ChangeEvent {
        kind: ChangeKind::Update,
        origin: Origin::Local,
        path: path.clone(),
        name: path.name().to_string(),
        is_folder: false,
        item_id: None,
        parent_id: None,
        size: stable.size,
        hash: stable.hash,
        hash_kind: Some(stable.kind),
        mtime: stable.mtime,
        etag: None,
    })
}

#[cfg(test)]
#[path = "watch_tests.rs"]
mod tests;
