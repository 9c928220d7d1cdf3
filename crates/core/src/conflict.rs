// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Conflict records

use crate::id::ConflictId;
use crate::path::SyncPath;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How the two sides diverged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConflictKind {
    EditEdit,
    EditDelete,
    DeleteEdit,
    TypeMismatch,
}

impl ConflictKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConflictKind::EditEdit => "edit-edit",
            ConflictKind::EditDelete => "edit-delete",
            ConflictKind::DeleteEdit => "delete-edit",
            ConflictKind::TypeMismatch => "type-mismatch",
        }
    }
}

/// Chosen resolution for a conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Resolution {
    Unresolved,
    KeepLocal,
    KeepRemote,
    KeepBoth,
}

impl Resolution {
    pub fn as_str(&self) -> &'static str {
        match self {
            Resolution::Unresolved => "unresolved",
            Resolution::KeepLocal => "keep-local",
            Resolution::KeepRemote => "keep-remote",
            Resolution::KeepBoth => "keep-both",
        }
    }
}

/// A recorded divergence, born at planning and mutated only by the
/// conflict engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConflictRecord {
    pub id: ConflictId,
    pub path: SyncPath,
    pub kind: ConflictKind,
    pub detected_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_hash: Option<String>,
    #[serde(default = "Resolution::unresolved")]
    pub resolution: Resolution,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_by: Option<String>,
    /// True once the resolving action (upload, download, rename) has been
    /// committed; a resolved-but-unapplied conflict is enforced next cycle.
    #[serde(default)]
    pub applied: bool,
}

impl Resolution {
    fn unresolved() -> Self {
        Resolution::Unresolved
    }
}

impl ConflictRecord {
    pub fn is_resolved(&self) -> bool {
        self.resolution != Resolution::Unresolved
    }

    /// Resolution chosen but the enforcing action has not committed yet.
    pub fn is_pending_apply(&self) -> bool {
        self.is_resolved() && !self.applied
    }
}

#[cfg(test)]
#[path = "conflict_tests.rs"]
mod tests;
