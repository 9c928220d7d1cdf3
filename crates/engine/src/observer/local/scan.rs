// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! One-shot full tree scan

use super::stable_hash::{stable_hash_file, DEFAULT_ATTEMPTS};
use skiff_core::{
    ChangeEvent, ChangeKind, ExclusionSet, HasherFactory, Origin, SyncError, SyncPath,
    NOSYNC_GUARD,
};
use skiff_store::Baseline;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// Walk the sync root and emit creates/updates for what exists plus
/// deletes for baseline paths that are gone.
///
/// A `.nosync` guard file in the root aborts (protects against syncing an
/// accidentally empty mount). Hashing runs on a bounded blocking pool.
pub async fn scan_tree(
    root: &Path,
    baseline: &Baseline,
    excludes: &ExclusionSet,
    hasher: &HasherFactory,
    parallel_hashes: usize,
    cancel: &CancellationToken,
) -> Result<Vec<ChangeEvent>, SyncError> {
    if !root.exists() {
        return Err(SyncError::SyncRootDeleted);
    }
    if root.join(NOSYNC_GUARD).exists() {
        return Err(SyncError::NosyncGuard);
    }

    let mut events: Vec<ChangeEvent> = Vec::new();
    let mut seen: HashSet<SyncPath> = HashSet::new();
    let mut file_jobs: JoinSet<Result<Option<ChangeEvent>, SyncError>> = JoinSet::new();
    let hash_slots = Arc::new(Semaphore::new(parallel_hashes));

    let mut stack: Vec<PathBuf> = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        if cancel.is_cancelled() {
            return Err(SyncError::ContextCanceled);
        }
        let entries = std::fs::read_dir(&dir).map_err(|e| SyncError::LocalIo {
            path: dir.clone(),
            source: e,
        })?;
        for entry in entries {
            let entry = entry.map_err(|e| SyncError::LocalIo {
                path: dir.clone(),
                source: e,
            })?;
            let fs_path = entry.path();
            let Some(path) = SyncPath::from_fs(root, &fs_path) else {
                continue;
            };
            if excludes.is_excluded(&path) {
                continue;
            }
            let file_type = entry.file_type().map_err(|e| SyncError::LocalIo {
                path: fs_path.clone(),
                source: e,
            })?;

            if file_type.is_dir() {
                seen.insert(path.clone());
                events.push(folder_event(&path));
                stack.push(fs_path);
            } else if file_type.is_file() {
                seen.insert(path.clone());
                let factory = Arc::clone(hasher);
                let slots = Arc::clone(&hash_slots);
                let cancel = cancel.clone();
                file_jobs.spawn(async move {
                    let _permit = slots
                        .acquire_owned()
                        .await
                        .map_err(|_| SyncError::ContextCanceled)?;
                    if cancel.is_cancelled() {
                        return Err(SyncError::ContextCanceled);
                    }
                    let hashed = tokio::task::spawn_blocking(move || {
                        stable_hash_file(&fs_path, &factory, DEFAULT_ATTEMPTS)
                    })
                    .await
                    .map_err(|e| SyncError::TransientNetwork(e.to_string()))?;
                    match hashed {
                        Ok(stable) => Ok(Some(file_event(&path, stable))),
                        Err(e) => {
                            // Still emitted, hashless; the planner may defer.
                            tracing::warn!(path = %path, error = %e, "failed to hash file during scan");
                            Ok(Some(ChangeEvent {
                                kind: ChangeKind::Create,
                                origin: Origin::Local,
                                name: path.name().to_string(),
                                path,
                                is_folder: false,
                                item_id: None,
                                parent_id: None,
                                size: 0,
                                hash: None,
                                hash_kind: None,
                                mtime: None,
                                etag: None,
                            }))
                        }
                    }
                });
            }
            // Symlinks and specials are not synced.
        }
    }

    while let Some(joined) = file_jobs.join_next().await {
        let result = joined.map_err(|e| SyncError::TransientNetwork(e.to_string()))??;
        if let Some(event) = result {
            events.push(event);
        }
    }

    // Baseline rows with no counterpart on disk are local deletions.
    let mut gone: Vec<&skiff_core::Item> = baseline
        .items
        .values()
        .filter(|item| {
            !item.deleted
                && !item.is_orphaned()
                && !seen.contains(&item.path)
                && !excludes.is_excluded(&item.path)
        })
        .collect();
    gone.sort_by(|a, b| a.path.cmp(&b.path));
    for item in gone {
        events.push(ChangeEvent {
            kind: ChangeKind::Delete,
            origin: Origin::Local,
            path: item.path.clone(),
            name: item.name.clone(),
            is_folder: item.is_folder,
            item_id: Some(item.item_id.clone()),
            parent_id: Some(item.parent_id.clone()),
            size: 0,
            hash: None,
            hash_kind: None,
            mtime: None,
            etag: None,
        });
    }

    events.sort_by(|a, b| a.path.cmp(&b.path));
    tracing::debug!(events = events.len(), "local scan complete");
    Ok(events)
}

fn folder_event(path: &SyncPath) -> ChangeEvent {
    ChangeEvent {
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
    }
}

fn file_event(path: &SyncPath, stable: super::stable_hash::StableHash) -> ChangeEvent {
    ChangeEvent {
        kind: ChangeKind::Create,
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
    }
}

#[cfg(test)]
#[path = "scan_tests.rs"]
mod tests;
