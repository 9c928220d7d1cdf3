// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Remote observer: delta feed consumption and normalization
//!
//! Owns the delta cursor for the cycle. Pages are normalized in four
//! steps, in order: drop opaque package items, zero the (bogus) hashes on
//! tombstones, deduplicate by item id keeping the last occurrence, and
//! stable-sort so deletions precede creations at the same parent.
//! Normalization is idempotent.

use skiff_core::{
    ChangeEvent, ChangeKind, DeltaCursor, DriveId, HashKind, ItemId, Origin, SyncError, SyncPath,
};
use skiff_remote::{with_retry, RemoteClient, RemoteItem, RetryPolicy};
use skiff_store::Baseline;
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Result of one observation pass.
#[derive(Debug, Default)]
pub struct Observation {
    pub events: Vec<ChangeEvent>,
    /// Cursor to persist once every outcome of the cycle has committed.
    pub new_cursor: Option<DeltaCursor>,
}

pub struct RemoteObserver<R> {
    remote: Arc<R>,
    drive: DriveId,
    prefer_alias: bool,
    retry: RetryPolicy,
}

impl<R: RemoteClient> RemoteObserver<R> {
    pub fn new(remote: Arc<R>, drive: DriveId, prefer_alias: bool) -> Self {
        Self {
            remote,
            drive,
            prefer_alias,
            retry: RetryPolicy::default(),
        }
    }

    /// Pull and normalize the change feed from `cursor`.
    ///
    /// `CursorExpired` surfaces as a distinguished error: the engine drops
    /// the cursor and restarts with an initial sync.
    pub async fn observe(
        &self,
        baseline: &Baseline,
        cursor: Option<&DeltaCursor>,
        cancel: &CancellationToken,
    ) -> Result<Observation, SyncError> {
        if !self.remote.supports_delta() {
            return self.observe_by_children(baseline, cancel).await;
        }

        let mut observation = Observation::default();
        let mut resolver = PathResolver::new(baseline);
        let mut page_cursor: Option<String> = cursor.map(|c| c.as_str().to_string());

        loop {
            if cancel.is_cancelled() {
                return Err(SyncError::ContextCanceled);
            }
            let cursor_arg = page_cursor.clone();
            let page = with_retry(self.retry, "delta", || {
                let cursor_arg = cursor_arg.clone();
                async move {
                    self.remote
                        .delta(&self.drive, cursor_arg.as_deref(), self.prefer_alias)
                        .await
                }
            })
            .await
            .map_err(SyncError::from)?;

            let normalized = normalize_page(page.items);
            tracing::debug!(
                events = normalized.len(),
                has_next = page.next_cursor.is_some(),
                "normalized delta page"
            );
            for item in &normalized {
                resolver.to_events(baseline, item, &mut observation.events);
            }

            match (page.next_cursor, page.delta_cursor) {
                (Some(next), _) => page_cursor = Some(next),
                (None, Some(last)) => {
                    observation.new_cursor = Some(DeltaCursor::new(last));
                    return Ok(observation);
                }
                (None, None) => {
                    // A page with neither cursor is a protocol violation.
                    return Err(SyncError::PermanentRemote(
                        "delta page carried no continuation or delta cursor".to_string(),
                    ));
                }
            }
        }
    }

    /// National-cloud fallback: recursive children traversal, synthesizing
    /// creates for everything found and deletes for baseline items that
    /// are gone remotely.
    async fn observe_by_children(
        &self,
        baseline: &Baseline,
        cancel: &CancellationToken,
    ) -> Result<Observation, SyncError> {
        let mut observation = Observation::default();
        let mut resolver = PathResolver::new(baseline);
        let mut seen: HashMap<ItemId, ()> = HashMap::new();
        let mut queue: Vec<ItemId> = vec![ItemId::root()];

        while let Some(folder) = queue.pop() {
            if cancel.is_cancelled() {
                return Err(SyncError::ContextCanceled);
            }
            let children = with_retry(self.retry, "list_children", || async {
                self.remote.list_children(&self.drive, &folder).await
            })
            .await
            .map_err(SyncError::from)?;

            for item in normalize_page(children) {
                seen.insert(item.id.clone(), ());
                if item.is_folder {
                    queue.push(item.id.clone());
                }
                resolver.to_events(baseline, &item, &mut observation.events);
            }
        }

        // Baseline rows absent remotely become deletes.
        let mut gone: Vec<&skiff_core::Item> = baseline
            .items
            .values()
            .filter(|i| !i.deleted && !i.is_orphaned() && !seen.contains_key(&i.item_id))
            .collect();
        gone.sort_by(|a, b| b.path.cmp(&a.path));
        for item in gone {
            observation.events.push(ChangeEvent {
                kind: ChangeKind::Delete,
                origin: Origin::Remote,
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
        Ok(observation)
    }
}

/// Resolves item paths within one observation: parents already seen in
/// the batch shadow the baseline.
struct PathResolver {
    known: HashMap<ItemId, SyncPath>,
}

impl PathResolver {
    fn new(_baseline: &Baseline) -> Self {
        Self {
            known: HashMap::new(),
        }
    }

    fn parent_path(&self, baseline: &Baseline, parent: &ItemId) -> Option<SyncPath> {
        if parent.is_root() {
            return Some(SyncPath::root());
        }
        if let Some(path) = self.known.get(parent) {
            return Some(path.clone());
        }
        baseline
            .items
            .get(parent)
            .filter(|i| !i.deleted && !i.is_orphaned())
            .map(|i| i.path.clone())
    }

    /// Convert a normalized item into change events. A tombstone for an
    /// unknown item produces nothing; a rename or move produces a delete
    /// at the old path plus a create at the new one.
    fn to_events(&mut self, baseline: &Baseline, item: &RemoteItem, out: &mut Vec<ChangeEvent>) {
        let old = baseline.items.get(&item.id).filter(|i| !i.deleted);

        if item.deleted {
            let Some(old) = old else { return };
            if old.path.is_root() {
                return;
            }
            out.push(ChangeEvent {
                kind: ChangeKind::Delete,
                origin: Origin::Remote,
                path: old.path.clone(),
                name: old.name.clone(),
                is_folder: old.is_folder,
                item_id: Some(item.id.clone()),
                parent_id: Some(old.parent_id.clone()),
                size: 0,
                hash: None,
                hash_kind: None,
                mtime: item.mtime,
                etag: item.etag.clone(),
            });
            return;
        }

        let parent = item.parent_id.clone().unwrap_or_else(ItemId::root);
        let (path, kind) = match self.parent_path(baseline, &parent) {
            Some(parent_path) => {
                let path = parent_path.join(&item.name);
                let kind = if old.is_some() {
                    ChangeKind::Update
                } else {
                    ChangeKind::Create
                };
                (path, kind)
            }
            // Unknown ancestor: emit as an orphan (empty path); the
            // planner commits it as a baseline row for later reconciling.
            None => {
                tracing::debug!(item = %item.id, parent = %parent, "orphaned delta item");
                (SyncPath::root(), ChangeKind::Create)
            }
        };
        self.known.insert(item.id.clone(), path.clone());

        // A move or rename leaves the old local copy behind; clear it.
        if let Some(old) = old {
            if !old.path.is_root() && !path.is_root() && old.path != path {
                out.push(ChangeEvent {
                    kind: ChangeKind::Delete,
                    origin: Origin::Remote,
                    path: old.path.clone(),
                    name: old.name.clone(),
                    is_folder: old.is_folder,
                    item_id: Some(item.id.clone()),
                    parent_id: Some(old.parent_id.clone()),
                    size: 0,
                    hash: None,
                    hash_kind: None,
                    mtime: None,
                    etag: None,
                });
            }
        }

        let (hash, hash_kind) = match (&item.quickxor_hash, &item.sha256_hash) {
            (Some(h), _) => (Some(h.clone()), Some(HashKind::QuickXor)),
            (None, Some(h)) => (Some(h.clone()), Some(HashKind::Sha256)),
            (None, None) => (None, None),
        };

        out.push(ChangeEvent {
            kind,
            origin: Origin::Remote,
            path,
            name: item.name.clone(),
            is_folder: item.is_folder,
            item_id: Some(item.id.clone()),
            parent_id: Some(parent),
            size: item.size,
            hash: if item.is_folder { None } else { hash },
            hash_kind: if item.is_folder { None } else { hash_kind },
            mtime: item.mtime,
            etag: item.etag.clone(),
        });
    }
}

/// The four normalization steps, applied in order.
pub fn normalize_page(items: Vec<RemoteItem>) -> Vec<RemoteItem> {
    // 1. Drop opaque package items the local side does not materialize.
    let mut items: Vec<RemoteItem> = items.into_iter().filter(|i| !i.is_package).collect();

    // 2. Zero out hashes the feed returns on tombstones (known bogus).
    for item in &mut items {
        if item.deleted {
            item.quickxor_hash = None;
            item.sha256_hash = None;
        }
    }

    // 3. Deduplicate by id, keeping the last occurrence.
    let mut last_index: HashMap<ItemId, usize> = HashMap::new();
    for (i, item) in items.iter().enumerate() {
        last_index.insert(item.id.clone(), i);
    }
    let mut items: Vec<RemoteItem> = items
        .into_iter()
        .enumerate()
        .filter(|(i, item)| last_index.get(&item.id) == Some(i))
        .map(|(_, item)| item)
        .collect();

    // 4. Stable-sort: deletions precede creations at the same parent.
    items.sort_by_key(|item| {
        (
            item.parent_id.clone().unwrap_or_else(ItemId::root),
            u8::from(!item.deleted),
        )
    });
    items
}

#[cfg(test)]
#[path = "remote_tests.rs"]
mod tests;
