// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Change events observed on either side of the sync

use crate::hash::HashKind;
use crate::item::ItemId;
use crate::path::SyncPath;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What happened to a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Create,
    Update,
    Delete,
}

/// Which observer produced the event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    Local,
    Remote,
}

/// One observed change, normalized for the buffer and planner.
///
/// Remote events carry `item_id`/`parent_id`/`etag` from the delta feed;
/// local events carry whatever the scanner could compute (`hash` is empty
/// when stable hashing gave up, and the planner may defer the path).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub kind: ChangeKind,
    pub origin: Origin,
    pub path: SyncPath,
    pub name: String,
    pub is_folder: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_id: Option<ItemId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<ItemId>,
    #[serde(default)]
    pub size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash_kind: Option<HashKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mtime: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
}

impl ChangeEvent {
    /// Sort key for stable flush order: deletions precede creations within
    /// a parent, then lexicographic by path.
    pub fn flush_key(&self) -> (SyncPath, u8, SyncPath) {
        let parent = self.path.parent().unwrap_or_else(SyncPath::root);
        let rank = match self.kind {
            ChangeKind::Delete => 0,
            ChangeKind::Update => 1,
            ChangeKind::Create => 2,
        };
        (parent, rank, self.path.clone())
    }
}

impl std::fmt::Display for ChangeEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self.kind {
            ChangeKind::Create => "create",
            ChangeKind::Update => "update",
            ChangeKind::Delete => "delete",
        };
        let origin = match self.origin {
            Origin::Local => "local",
            Origin::Remote => "remote",
        };
        write!(f, "{}:{} {}", origin, kind, self.path)
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
