// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Items known in the baseline

use crate::hash::HashKind;
use crate::path::SyncPath;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Opaque remote identifier for an item. Stable across renames.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(String);

impl ItemId {
    /// Sentinel parent id for the drive root.
    pub const ROOT: &'static str = "root";

    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn root() -> Self {
        Self(Self::ROOT.to_string())
    }

    pub fn is_root(&self) -> bool {
        self.0 == Self::ROOT
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ItemId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for ItemId {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// Opaque remote drive identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DriveId(String);

impl DriveId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for DriveId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for DriveId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// A file or folder known in the baseline.
///
/// `path` is materialized from the parent chain and is empty ("orphaned")
/// while an ancestor is not yet known. `deleted` items are tombstones kept
/// so late delta pages still match; they are purged on checkpoint after the
/// retention window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub item_id: ItemId,
    pub parent_id: ItemId,
    pub name: String,
    pub is_folder: bool,
    #[serde(default)]
    pub size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mtime_remote: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mtime_local: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
    /// Absent only for folders, zero-byte files, or metadata-fallback entries.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_hash: Option<String>,
    /// Which algorithm produced `content_hash`. Committed durably so a later
    /// run compares like-for-like without re-deriving the fallback chain.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash_kind: Option<HashKind>,
    #[serde(default)]
    pub path: SyncPath,
    #[serde(default)]
    pub deleted: bool,
    /// Epoch ms when the tombstone was written. Drives retention purging.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at_ms: Option<u64>,
}

impl Item {
    /// True while an ancestor of this item is not yet known.
    pub fn is_orphaned(&self) -> bool {
        self.path.is_root() && !self.parent_id.is_root()
    }
}

#[cfg(test)]
#[path = "item_tests.rs"]
mod tests;
