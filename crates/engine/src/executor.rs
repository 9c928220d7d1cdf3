// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Plan executor
//!
//! Actions are dispatched only after every dependency has committed.
//! Transfers run on the transfer pool, everything else on the check
//! pool; each successful action commits its outcome immediately, so an
//! interrupted cycle re-observes and skips what already landed. The
//! delta cursor rides on the last committed outcome, and only when the
//! whole cycle succeeded.

use crate::tracker::Tracker;
use crate::transfer::download::Downloader;
use crate::transfer::upload::Uploader;
use skiff_core::{
    Action, ActionId, ActionKind, Clock, DeltaCursor, EngineConfig, HasherFactory, ItemId,
    Outcome, Plan, Resolution, SyncError, SyncPath, SyncReport,
};
use skiff_remote::{with_retry, RemoteClient, RemoteError, RetryPolicy};
use skiff_store::{BaselineStore, SessionStore};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// Failures captured per cycle; excess is counted, not stored.
const ERROR_BUFFER_CAP: usize = 1000;

pub struct Executor<R, C: Clock> {
    remote: Arc<R>,
    store: Arc<BaselineStore<C>>,
    sessions: Arc<SessionStore>,
    tracker: Arc<Tracker<C>>,
    config: Arc<EngineConfig>,
    hasher: HasherFactory,
    clock: C,
}

impl<R: RemoteClient, C: Clock> Executor<R, C> {
    pub fn new(
        remote: Arc<R>,
        store: Arc<BaselineStore<C>>,
        sessions: Arc<SessionStore>,
        tracker: Arc<Tracker<C>>,
        config: Arc<EngineConfig>,
        hasher: HasherFactory,
        clock: C,
    ) -> Self {
        Self {
            remote,
            store,
            sessions,
            tracker,
            config,
            hasher,
            clock,
        }
    }

    /// Run the plan to completion (or cancellation). `final_cursor` is
    /// persisted only after every outcome committed with zero failures.
    pub async fn execute(
        &self,
        plan: Plan,
        final_cursor: Option<DeltaCursor>,
        cancel: &CancellationToken,
        report: &mut SyncReport,
    ) -> Result<(), SyncError> {
        // Converged paths: baseline-only commits, no transfers.
        for outcome in &plan.converged {
            self.store
                .commit_outcome(outcome.clone(), None)
                .map_err(SyncError::from)?;
            report.converged += 1;
        }

        let transfer_slots = Arc::new(Semaphore::new(self.config.transfer_workers));
        let check_slots = Arc::new(Semaphore::new(self.config.check_workers));

        let mut pending: Vec<Action> = plan.actions;
        let mut committed: HashSet<ActionId> = HashSet::new();
        let mut failed: HashSet<ActionId> = HashSet::new();
        let mut error_count: usize = 0;
        let mut in_flight: JoinSet<(Action, Result<Outcome, SyncError>)> = JoinSet::new();
        let mut canceled = false;

        loop {
            // Dispatch everything whose dependencies have settled.
            if !canceled && !cancel.is_cancelled() {
                let mut i = 0;
                while i < pending.len() {
                    let ready = pending[i]
                        .depends_on
                        .iter()
                        .all(|dep| committed.contains(dep) || failed.contains(dep));
                    if !ready {
                        i += 1;
                        continue;
                    }
                    let action = pending.remove(i);
                    if action
                        .depends_on
                        .iter()
                        .any(|dep| failed.contains(dep))
                    {
                        failed.insert(action.id);
                        error_count += 1;
                        if error_count <= ERROR_BUFFER_CAP {
                            report.record_error(
                                action.kind,
                                action.path.clone(),
                                "dependency failed".to_string(),
                            );
                        } else {
                            report.failed += 1;
                        }
                        continue;
                    }
                    if self.tracker.is_suppressed(&action.path) {
                        failed.insert(action.id);
                        report.skipped_backoff += 1;
                        continue;
                    }
                    if !self.tracker.begin(&action.path) {
                        // Another action already owns the path this cycle.
                        failed.insert(action.id);
                        report.skipped_backoff += 1;
                        continue;
                    }
                    self.spawn_action(
                        action,
                        Arc::clone(&transfer_slots),
                        Arc::clone(&check_slots),
                        cancel.clone(),
                        &mut in_flight,
                    );
                }
            }

            if canceled || cancel.is_cancelled() {
                canceled = true;
            }

            let Some(joined) = in_flight.join_next().await else {
                if canceled || pending.is_empty() {
                    break;
                }
                // Nothing running and nothing dispatchable: the rest are
                // transitively blocked on failures.
                for action in pending.drain(..) {
                    failed.insert(action.id);
                    report.record_error(
                        action.kind,
                        action.path.clone(),
                        "dependency failed".to_string(),
                    );
                }
                continue;
            };

            let (action, result) = joined.map_err(|e| SyncError::TransientNetwork(e.to_string()))?;
            match result {
                Ok(outcome) => {
                    self.tracker.mark_done(&action.path, true);
                    let verified = outcome.hash_verified;
                    let resolved = outcome.resolved_conflict.clone();
                    self.store
                        .commit_outcome(outcome.clone(), None)
                        .map_err(SyncError::from)?;
                    committed.insert(action.id);
                    if verified {
                        report.record_success(outcome.kind);
                        if resolved.is_some() && outcome.kind != ActionKind::ResolveConflict {
                            report.conflicts_resolved += 1;
                        }
                    } else {
                        // Committed, but surfaced as a verification failure.
                        error_count += 1;
                        report.record_error(
                            action.kind,
                            action.path.clone(),
                            "hash verification failed".to_string(),
                        );
                    }
                }
                Err(SyncError::ContextCanceled) => {
                    self.tracker.cancel_by_path(&action.path);
                    canceled = true;
                }
                Err(e) => {
                    self.tracker.mark_done(&action.path, false);
                    failed.insert(action.id);
                    error_count += 1;
                    if error_count <= ERROR_BUFFER_CAP {
                        report.record_error(action.kind, action.path.clone(), e.to_string());
                    } else {
                        report.failed += 1;
                    }
                    tracing::warn!(
                        kind = action.kind.as_str(),
                        path = %action.path,
                        error = %e,
                        "action failed"
                    );
                }
            }
        }

        if canceled {
            return Err(SyncError::ContextCanceled);
        }

        // Advance the cursor only after a fully clean cycle: a failed or
        // backoff-skipped action means the remote change is not applied
        // yet, and the next observation must still return it.
        if report.failed == 0 && report.skipped_backoff == 0 {
            if let Some(cursor) = final_cursor {
                self.store.set_cursor(Some(cursor)).map_err(SyncError::from)?;
            }
        }
        Ok(())
    }

    fn spawn_action(
        &self,
        action: Action,
        transfer_slots: Arc<Semaphore>,
        check_slots: Arc<Semaphore>,
        cancel: CancellationToken,
        in_flight: &mut JoinSet<(Action, Result<Outcome, SyncError>)>,
    ) {
        let remote = Arc::clone(&self.remote);
        let store = Arc::clone(&self.store);
        let sessions = Arc::clone(&self.sessions);
        let config = Arc::clone(&self.config);
        let hasher = Arc::clone(&self.hasher);
        let clock = self.clock.clone();

        in_flight.spawn(async move {
            let slots = if action.kind.is_transfer() {
                transfer_slots
            } else {
                check_slots
            };
            let permit = slots.acquire_owned().await;
            if permit.is_err() || cancel.is_cancelled() {
                return (action, Err(SyncError::ContextCanceled));
            }
            let result = run_action(
                &action, remote, store, sessions, config, hasher, clock, cancel,
            )
            .await;
            (action, result)
        });
    }
}

/// Resolve the remote id of a path's parent folder from the live baseline.
fn resolve_parent<C: Clock>(
    store: &BaselineStore<C>,
    path: &SyncPath,
) -> Result<ItemId, SyncError> {
    let parent = path.parent().unwrap_or_default();
    if parent.is_root() {
        return Ok(ItemId::root());
    }
    store
        .with_baseline(|b| b.item_by_path(&parent).map(|i| i.item_id.clone()))
        .ok_or_else(|| SyncError::OrphanedItem {
            item: path.to_string(),
            parent: parent.to_string(),
        })
}

#[allow(clippy::too_many_arguments)]
async fn run_action<R: RemoteClient, C: Clock>(
    action: &Action,
    remote: Arc<R>,
    store: Arc<BaselineStore<C>>,
    sessions: Arc<SessionStore>,
    config: Arc<EngineConfig>,
    hasher: HasherFactory,
    clock: C,
    cancel: CancellationToken,
) -> Result<Outcome, SyncError> {
    match action.kind {
        ActionKind::Download => {
            let downloader = Downloader {
                remote: remote.as_ref(),
                drive: &config.drive_id,
                sync_root: &config.sync_root,
                hasher: &hasher,
                cancel: &cancel,
            };
            downloader.download(action).await
        }
        ActionKind::Upload => {
            let parent = resolve_parent(store.as_ref(), &action.path)?;
            let uploader = Uploader {
                remote: remote.as_ref(),
                drive: &config.drive_id,
                sync_root: &config.sync_root,
                hasher: &hasher,
                sessions: sessions.as_ref(),
                chunk_size: config.chunk_size,
                clock: &clock,
                cancel: &cancel,
            };
            uploader.upload(action, parent).await
        }
        ActionKind::CreateLocalFolder => {
            let target = action.path.to_fs(&config.sync_root);
            tokio::fs::create_dir_all(&target)
                .await
                .map_err(|e| SyncError::LocalIo {
                    path: target,
                    source: e,
                })?;
            Ok(Outcome {
                kind: ActionKind::CreateLocalFolder,
                path: action.path.clone(),
                item_id: action.item_id.clone(),
                parent_id: action.parent_id.clone(),
                name: action.path.name().to_string(),
                is_folder: true,
                size: 0,
                content_hash: None,
                hash_kind: None,
                hash_verified: true,
                mtime_local: None,
                mtime_remote: action.mtime,
                etag: action.etag.clone(),
                resolved_conflict: None,
            })
        }
        ActionKind::CreateRemoteFolder => {
            let parent = resolve_parent(store.as_ref(), &action.path)?;
            let name = action.path.name().to_string();
            let item = match with_retry(RetryPolicy::default(), "create_folder", || {
                let name = name.clone();
                let parent = parent.clone();
                let remote = Arc::clone(&remote);
                let drive = config.drive_id.clone();
                async move { remote.create_folder(&drive, &parent, &name).await }
            })
            .await
            {
                Ok(item) => item,
                // Someone else created it first: adopt theirs.
                Err(RemoteError::Conflict(_)) => remote
                    .get_item_by_path(&config.drive_id, &action.path)
                    .await
                    .map_err(SyncError::from)?,
                Err(e) => return Err(e.into()),
            };
            Ok(Outcome {
                kind: ActionKind::CreateRemoteFolder,
                path: action.path.clone(),
                item_id: Some(item.id.clone()),
                parent_id: Some(parent),
                name: item.name.clone(),
                is_folder: true,
                size: 0,
                content_hash: None,
                hash_kind: None,
                hash_verified: true,
                mtime_local: None,
                mtime_remote: item.mtime,
                etag: item.etag.clone(),
                resolved_conflict: None,
            })
        }
        ActionKind::LocalDelete => {
            let target = action.path.to_fs(&config.sync_root);
            delete_local(&target, &config, &clock).await?;
            Ok(delete_outcome(action, ActionKind::LocalDelete))
        }
        ActionKind::RemoteDelete => {
            let item_id = action
                .item_id
                .clone()
                .ok_or_else(|| SyncError::PermanentRemote("delete without item id".into()))?;
            match remote
                .delete_item(&config.drive_id, &item_id, config.permanent_delete)
                .await
            {
                Ok(()) | Err(RemoteError::NotFound) => {}
                Err(e) => return Err(e.into()),
            }
            Ok(delete_outcome(action, ActionKind::RemoteDelete))
        }
        ActionKind::ResolveConflict => {
            run_resolution(
                action, remote, store, sessions, config, hasher, clock, cancel,
            )
            .await
        }
    }
}

#[allow(clippy::too_many_arguments)]
async fn run_resolution<R: RemoteClient, C: Clock>(
    action: &Action,
    remote: Arc<R>,
    store: Arc<BaselineStore<C>>,
    sessions: Arc<SessionStore>,
    config: Arc<EngineConfig>,
    hasher: HasherFactory,
    clock: C,
    cancel: CancellationToken,
) -> Result<Outcome, SyncError> {
    let Some((conflict_id, resolution)) = action.resolution.clone() else {
        return Err(SyncError::PermanentRemote(
            "resolve action without resolution".into(),
        ));
    };
    match resolution {
        Resolution::KeepLocal => {
            let parent = resolve_parent(store.as_ref(), &action.path)?;
            let uploader = Uploader {
                remote: remote.as_ref(),
                drive: &config.drive_id,
                sync_root: &config.sync_root,
                hasher: &hasher,
                sessions: sessions.as_ref(),
                chunk_size: config.chunk_size,
                clock: &clock,
                cancel: &cancel,
            };
            let mut outcome = uploader.upload(action, parent).await?;
            outcome.resolved_conflict = Some((conflict_id, resolution));
            Ok(outcome)
        }
        Resolution::KeepRemote => {
            let item = remote
                .get_item_by_path(&config.drive_id, &action.path)
                .await
                .map_err(SyncError::from)?;
            let mut download_action = action.clone();
            download_action.item_id = Some(item.id.clone());
            download_action.remote_hash = item.quickxor_hash.clone();
            download_action.mtime = item.mtime;
            download_action.etag = item.etag.clone();
            let downloader = Downloader {
                remote: remote.as_ref(),
                drive: &config.drive_id,
                sync_root: &config.sync_root,
                hasher: &hasher,
                cancel: &cancel,
            };
            let mut outcome = downloader.download(&download_action).await?;
            outcome.resolved_conflict = Some((conflict_id, resolution));
            Ok(outcome)
        }
        Resolution::KeepBoth => {
            // Pure metadata move: the losing (local) copy is renamed to a
            // distinct name; later cycles upload the copy and restore the
            // remote original at the old path.
            let source = action.path.to_fs(&config.sync_root);
            if source.exists() {
                let copy_name = conflict_copy_name(action.path.name(), clock.epoch_ms());
                let target = action
                    .path
                    .parent()
                    .unwrap_or_default()
                    .join(&copy_name)
                    .to_fs(&config.sync_root);
                tokio::fs::rename(&source, &target)
                    .await
                    .map_err(|e| SyncError::LocalIo {
                        path: source,
                        source: e,
                    })?;
            }
            Ok(Outcome {
                kind: ActionKind::ResolveConflict,
                path: action.path.clone(),
                item_id: action.item_id.clone(),
                parent_id: None,
                name: action.path.name().to_string(),
                is_folder: false,
                size: 0,
                content_hash: None,
                hash_kind: None,
                hash_verified: true,
                mtime_local: None,
                mtime_remote: None,
                etag: None,
                resolved_conflict: Some((conflict_id, resolution)),
            })
        }
        Resolution::Unresolved => Err(SyncError::ConflictDetected {
            path: action.path.clone(),
        }),
    }
}

fn delete_outcome(action: &Action, kind: ActionKind) -> Outcome {
    Outcome {
        kind,
        path: action.path.clone(),
        item_id: action.item_id.clone(),
        parent_id: action.parent_id.clone(),
        name: action.path.name().to_string(),
        is_folder: false,
        size: 0,
        content_hash: None,
        hash_kind: None,
        hash_verified: true,
        mtime_local: None,
        mtime_remote: None,
        etag: None,
        resolved_conflict: None,
    }
}

async fn delete_local<C: Clock>(
    target: &std::path::Path,
    config: &EngineConfig,
    clock: &C,
) -> Result<(), SyncError> {
    let meta = match tokio::fs::symlink_metadata(target).await {
        Ok(meta) => meta,
        // Already gone: deletion is idempotent.
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(e) => {
            return Err(SyncError::LocalIo {
                path: target.to_path_buf(),
                source: e,
            })
        }
    };

    if config.local_trash {
        let trash = config.trash_dir();
        tokio::fs::create_dir_all(&trash)
            .await
            .map_err(|e| SyncError::LocalIo {
                path: trash.clone(),
                source: e,
            })?;
        let name = target
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "unnamed".to_string());
        let dest = trash.join(format!("{}-{}", clock.epoch_ms(), name));
        tokio::fs::rename(target, &dest)
            .await
            .map_err(|e| SyncError::LocalIo {
                path: target.to_path_buf(),
                source: e,
            })?;
        return Ok(());
    }

    let result = if meta.is_dir() {
        tokio::fs::remove_dir_all(target).await
    } else {
        tokio::fs::remove_file(target).await
    };
    match result {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(SyncError::LocalIo {
            path: target.to_path_buf(),
            source: e,
        }),
    }
}

/// Renames "report.txt" to "report (conflict 2026-08-01).txt".
fn conflict_copy_name(name: &str, epoch_ms: u64) -> String {
    let date = chrono::DateTime::from_timestamp_millis(epoch_ms as i64)
        .map(|t| t.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "undated".to_string());
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => {
            format!("{} (conflict {}).{}", stem, date, ext)
        }
        _ => format!("{} (conflict {})", name, date),
    }
}

#[cfg(test)]
#[path = "executor_tests.rs"]
mod tests;
