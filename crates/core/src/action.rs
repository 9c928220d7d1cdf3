// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Planned actions and committed outcomes

use crate::conflict::Resolution;
use crate::hash::HashKind;
use crate::id::ConflictId;
use crate::item::ItemId;
use crate::path::SyncPath;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier of an action within one plan.
pub type ActionId = u64;

/// What the executor must do for one path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Download,
    Upload,
    LocalDelete,
    RemoteDelete,
    CreateLocalFolder,
    CreateRemoteFolder,
    ResolveConflict,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Download => "download",
            ActionKind::Upload => "upload",
            ActionKind::LocalDelete => "local_delete",
            ActionKind::RemoteDelete => "remote_delete",
            ActionKind::CreateLocalFolder => "create_local_folder",
            ActionKind::CreateRemoteFolder => "create_remote_folder",
            ActionKind::ResolveConflict => "resolve_conflict",
        }
    }

    pub fn is_delete(&self) -> bool {
        matches!(self, ActionKind::LocalDelete | ActionKind::RemoteDelete)
    }

    /// Transfers run on the transfer pool; everything else on the check pool.
    pub fn is_transfer(&self) -> bool {
        matches!(self, ActionKind::Download | ActionKind::Upload)
    }
}

/// One node of the action plan DAG.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    pub id: ActionId,
    pub kind: ActionKind,
    pub path: SyncPath,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_id: Option<ItemId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<ItemId>,
    #[serde(default)]
    pub size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_hash_kind: Option<HashKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mtime: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
    /// Conflict resolution payload, set only for `ResolveConflict`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution: Option<(ConflictId, Resolution)>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<ActionId>,
}

/// Ordered action plan with dependency edges.
///
/// Actions appear in a deterministic order (the planner iterates sorted
/// maps) and `depends_on` always references earlier logic, forming a DAG:
/// folder-creates precede children, deletes at a parent follow deletes of
/// its descendants.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    pub actions: Vec<Action>,
    /// Baseline-only updates for converged paths (both sides changed to the
    /// same content); committed without executing any transfer.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub converged: Vec<Outcome>,
}

impl Plan {
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty() && self.converged.is_empty()
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn count(&self, kind: ActionKind) -> usize {
        self.actions.iter().filter(|a| a.kind == kind).count()
    }

    pub fn delete_count(&self) -> usize {
        self.actions.iter().filter(|a| a.kind.is_delete()).count()
    }

    pub fn get(&self, id: ActionId) -> Option<&Action> {
        self.actions.iter().find(|a| a.id == id)
    }
}

/// The post-execution record for one action; the unit of commit.
///
/// Only successful actions produce outcomes. Failures stay in the report
/// and the tracker's backoff window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outcome {
    pub kind: ActionKind,
    pub path: SyncPath,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_id: Option<ItemId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<ItemId>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub is_folder: bool,
    #[serde(default)]
    pub size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash_kind: Option<HashKind>,
    /// False when download verification exhausted its retries; the item is
    /// committed with the observed hash but flagged in the report.
    #[serde(default = "default_true")]
    pub hash_verified: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mtime_local: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mtime_remote: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
    /// Conflict removed by this outcome, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_conflict: Option<(ConflictId, Resolution)>,
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
#[path = "action_tests.rs"]
mod tests;
