// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wire-level DTOs for the remote drive

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use skiff_core::{DriveId, ItemId};

/// Raw item as the delta feed or metadata endpoints return it.
///
/// This is a transport DTO, not a baseline item; the remote observer
/// normalizes these into change events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteItem {
    pub id: ItemId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<ItemId>,
    pub name: String,
    #[serde(default)]
    pub is_folder: bool,
    /// Opaque "package" items (notebooks etc.) the local side does not
    /// materialize.
    #[serde(default)]
    pub is_package: bool,
    #[serde(default)]
    pub deleted: bool,
    #[serde(default)]
    pub size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mtime: Option<DateTime<Utc>>,
    /// QuickXorHash digest, base64. The feed is known to return bogus
    /// hashes on deleted items; the observer zeroes them.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quickxor_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha256_hash: Option<String>,
}

/// One page of the delta feed.
#[derive(Debug, Clone, Default)]
pub struct DeltaPage {
    pub items: Vec<RemoteItem>,
    /// Present on every page but the last.
    pub next_cursor: Option<String>,
    /// Present only on the last page; the cursor to persist.
    pub delta_cursor: Option<String>,
}

/// Drive metadata for identity verification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriveInfo {
    pub id: DriveId,
    pub drive_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_email: Option<String>,
    #[serde(default)]
    pub quota_total: u64,
    #[serde(default)]
    pub quota_used: u64,
}

/// The authenticated principal, for identity verification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    pub id: String,
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// Pre-authorized upload session URL. Treated as a secret: both `Debug`
/// and `Display` redact it so it can never reach a log line.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionUrl(String);

impl SessionUrl {
    pub fn new(url: impl Into<String>) -> Self {
        Self(url.into())
    }

    /// The actual URL, for the transport only.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for SessionUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SessionUrl(<redacted>)")
    }
}

impl std::fmt::Display for SessionUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("<redacted>")
    }
}

/// A resumable upload context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadSession {
    pub url: SessionUrl,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

/// Byte range for one chunk PUT.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentRange {
    pub start: u64,
    /// Inclusive end offset.
    pub end: u64,
    pub total: u64,
}

impl ContentRange {
    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    pub fn is_empty(&self) -> bool {
        self.end < self.start
    }
}

impl std::fmt::Display for ContentRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "bytes {}-{}/{}", self.start, self.end, self.total)
    }
}

/// Server response to one chunk PUT.
#[derive(Debug, Clone)]
pub enum UploadChunkResult {
    /// 202: more chunks expected. The body's next-expected-ranges list is
    /// drained and discarded; resume uses the session status query instead.
    Accepted,
    /// 200/201: upload complete, body is the final item.
    Complete(Box<RemoteItem>),
}

#[cfg(test)]
#[path = "types_tests.rs"]
mod tests;
