// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Materialized baseline state built from commit-record replay

use serde::{Deserialize, Serialize};
use skiff_core::{
    find_by_prefix, ActionKind, ConflictId, ConflictRecord, DeltaCursor, Item, ItemId, Outcome,
    PrefixLookup, Resolution, SyncPath,
};
use std::collections::HashMap;

/// Drive identity recorded at first open and verified on every open.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriveIdentity {
    pub drive_id: String,
    pub drive_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_email: Option<String>,
    pub created_at_ms: u64,
}

/// Records appended to the WAL; the only way baseline state changes.
///
/// Serializes with `{"type": "...", ...fields}` format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CommitRecord {
    /// One executed action. `cursor` rides along only on the final outcome
    /// of a cycle, keeping invariant: the cursor never runs ahead of an
    /// uncommitted outcome.
    Outcome {
        outcome: Outcome,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        cursor: Option<DeltaCursor>,
        /// Commit timestamp, stamped by the store; drives tombstone retention.
        #[serde(default)]
        at_ms: u64,
    },
    /// Cursor set or cleared without an outcome (empty cycle, expiry reset).
    Cursor { cursor: Option<DeltaCursor> },
    ConflictRecorded { record: ConflictRecord },
    ConflictResolved {
        id: ConflictId,
        resolution: Resolution,
        resolved_by: String,
        at_ms: u64,
    },
    IdentityRecorded { identity: DriveIdentity },
}

/// In-memory index of the last reconciled state of the drive.
///
/// # Idempotency requirement
///
/// **All record handlers MUST be idempotent.** Applying the same record
/// twice must produce the same state as applying it once: records are
/// applied once when committed and again when the WAL is replayed over an
/// older snapshot after a crash. Use assignment, not mutation; guard
/// inserts with existence checks.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Baseline {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity: Option<DriveIdentity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cursor: Option<DeltaCursor>,
    pub items: HashMap<ItemId, Item>,
    /// Conflicts keyed by id (string-keyed for prefix lookup).
    #[serde(default)]
    pub conflicts: HashMap<String, ConflictRecord>,
    /// Derived path index; rebuilt on load, never persisted.
    #[serde(skip)]
    pub paths: HashMap<SyncPath, ItemId>,
}

impl Baseline {
    /// Rebuild the derived path index (after deserialization).
    pub fn rebuild_paths(&mut self) {
        self.paths.clear();
        for item in self.items.values() {
            if !item.deleted && !item.is_orphaned() && !item.path.is_root() {
                self.paths.insert(item.path.clone(), item.item_id.clone());
            }
        }
    }

    /// Look up a live item by path.
    pub fn item_by_path(&self, path: &SyncPath) -> Option<&Item> {
        self.paths.get(path).and_then(|id| self.items.get(id))
    }

    /// Live (non-deleted, non-orphaned) item count.
    pub fn live_item_count(&self) -> usize {
        self.items
            .values()
            .filter(|i| !i.deleted && !i.is_orphaned())
            .count()
    }

    /// Recompute a path from the parent chain; empty when orphaned.
    pub fn materialize_path(&self, item_id: &ItemId) -> SyncPath {
        let mut segments: Vec<String> = Vec::new();
        let mut current = item_id.clone();
        loop {
            if current.is_root() {
                break;
            }
            let Some(item) = self.items.get(&current) else {
                // Unknown ancestor: the chain is orphaned.
                return SyncPath::root();
            };
            segments.push(item.name.clone());
            current = item.parent_id.clone();
        }
        segments.reverse();
        let mut path = SyncPath::root();
        for seg in segments {
            path = path.join(&seg);
        }
        path
    }

    /// Apply one committed record. Idempotent (see type docs).
    pub fn apply(&mut self, record: &CommitRecord) {
        match record {
            CommitRecord::Outcome {
                outcome,
                cursor,
                at_ms,
            } => {
                self.apply_outcome(outcome, *at_ms);
                if let Some(cursor) = cursor {
                    self.cursor = Some(cursor.clone());
                }
            }
            CommitRecord::Cursor { cursor } => {
                self.cursor = cursor.clone();
            }
            CommitRecord::ConflictRecorded { record } => {
                // Guarded insert: re-detection of a live conflict at the
                // same path must not duplicate rows.
                let duplicate = self.conflicts.values().any(|c| {
                    c.path == record.path && !c.is_resolved() && c.id != record.id
                });
                if !duplicate {
                    self.conflicts
                        .insert(record.id.as_str().to_string(), record.clone());
                }
            }
            CommitRecord::ConflictResolved {
                id,
                resolution,
                resolved_by,
                at_ms,
            } => {
                if let Some(c) = self.conflicts.get_mut(id.as_str()) {
                    c.resolution = *resolution;
                    c.resolved_by = Some(resolved_by.clone());
                    c.resolved_at = chrono::DateTime::from_timestamp_millis(*at_ms as i64);
                }
            }
            CommitRecord::IdentityRecorded { identity } => {
                if self.identity.is_none() {
                    self.identity = Some(identity.clone());
                }
            }
        }
    }

    fn apply_outcome(&mut self, outcome: &Outcome, at_ms: u64) {
        match outcome.kind {
            ActionKind::Download
            | ActionKind::Upload
            | ActionKind::CreateLocalFolder
            | ActionKind::CreateRemoteFolder => {
                let Some(item_id) = outcome.item_id.clone() else {
                    return;
                };
                if let Some(old) = self.items.get(&item_id) {
                    if !old.path.is_root() {
                        self.paths.remove(&old.path);
                    }
                }
                let item = Item {
                    item_id: item_id.clone(),
                    parent_id: outcome.parent_id.clone().unwrap_or_else(ItemId::root),
                    name: if outcome.name.is_empty() {
                        outcome.path.name().to_string()
                    } else {
                        outcome.name.clone()
                    },
                    is_folder: outcome.is_folder,
                    size: outcome.size,
                    mtime_remote: outcome.mtime_remote,
                    mtime_local: outcome.mtime_local,
                    etag: outcome.etag.clone(),
                    content_hash: outcome.content_hash.clone(),
                    hash_kind: outcome.hash_kind,
                    path: outcome.path.clone(),
                    deleted: false,
                    deleted_at_ms: None,
                };
                if !item.path.is_root() {
                    self.paths.insert(item.path.clone(), item_id.clone());
                }
                self.items.insert(item_id, item);
                self.reconcile_orphans();
            }
            ActionKind::LocalDelete | ActionKind::RemoteDelete => {
                let id = outcome
                    .item_id
                    .clone()
                    .or_else(|| self.paths.get(&outcome.path).cloned());
                if let Some(id) = id {
                    if let Some(item) = self.items.get_mut(&id) {
                        if !item.deleted {
                            item.deleted = true;
                            item.deleted_at_ms = Some(at_ms);
                        }
                        self.paths.remove(&outcome.path);
                    }
                }
            }
            ActionKind::ResolveConflict => {
                // Resolution bookkeeping is carried by resolved_conflict below.
            }
        }
        if let Some((id, resolution)) = &outcome.resolved_conflict {
            if let Some(c) = self.conflicts.get_mut(id.as_str()) {
                c.resolution = *resolution;
                c.applied = true;
            }
        }
    }

    /// Give orphaned items a path once their ancestors are known.
    fn reconcile_orphans(&mut self) {
        // Re-materialize until a pass changes nothing: a single arriving
        // parent can unlock a whole subtree of orphans.
        loop {
            let mut fixes: Vec<(ItemId, SyncPath)> = Vec::new();
            for item in self.items.values() {
                if item.deleted || !item.is_orphaned() {
                    continue;
                }
                let path = self.materialize_path(&item.item_id);
                if !path.is_root() {
                    fixes.push((item.item_id.clone(), path));
                }
            }
            if fixes.is_empty() {
                return;
            }
            for (id, path) in fixes {
                if let Some(item) = self.items.get_mut(&id) {
                    item.path = path.clone();
                    self.paths.insert(path, id);
                }
            }
        }
    }

    /// Drop tombstones older than the retention window. Returns the number
    /// purged. Called from checkpointing, never mid-cycle.
    pub fn purge_tombstones(&mut self, now_ms: u64, retention_ms: u64) -> usize {
        let before = self.items.len();
        self.items.retain(|_, item| {
            !(item.deleted
                && item
                    .deleted_at_ms
                    .map(|t| now_ms.saturating_sub(t) > retention_ms)
                    .unwrap_or(true))
        });
        before - self.items.len()
    }

    /// Find a conflict by id or unique prefix.
    pub fn find_conflict(&self, query: &str) -> PrefixLookup<&ConflictRecord> {
        find_by_prefix(&self.conflicts, query)
    }

    /// Conflicts, unresolved first then by path, resolved included on demand.
    pub fn list_conflicts(&self, include_resolved: bool) -> Vec<&ConflictRecord> {
        let mut out: Vec<&ConflictRecord> = self
            .conflicts
            .values()
            .filter(|c| include_resolved || !c.is_resolved())
            .collect();
        out.sort_by(|a, b| {
            a.is_resolved()
                .cmp(&b.is_resolved())
                .then_with(|| a.path.cmp(&b.path))
        });
        out
    }
}

#[cfg(test)]
#[path = "baseline_tests.rs"]
mod tests;
