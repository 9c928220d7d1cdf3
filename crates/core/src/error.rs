// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error taxonomy for the sync engine
//!
//! One variant per kind; callers pattern-match, never inspect strings.

use crate::path::SyncPath;
use std::time::Duration;
use thiserror::Error;

/// Errors surfaced by the engine and its subsystems.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("delta cursor expired; full rescan required")]
    CursorExpired,

    #[error("authentication expired; re-login required")]
    AuthExpired,

    #[error("remote throttled; retry after {retry_after:?}")]
    Throttled { retry_after: Option<Duration> },

    #[error("transient network failure: {0}")]
    TransientNetwork(String),

    #[error("permanent remote failure: {0}")]
    PermanentRemote(String),

    #[error("content hash mismatch at {path}: expected {expected}, got {actual}")]
    HashMismatch {
        path: SyncPath,
        expected: String,
        actual: String,
    },

    #[error("requested range not satisfiable")]
    RangeNotSatisfiable,

    #[error("upload session expired")]
    UploadSessionExpired,

    #[error("upload session no longer matches the local file")]
    UploadSessionInvalid,

    #[error("conflict detected at {path}")]
    ConflictDetected { path: SyncPath },

    #[error("plan would delete {planned} of {baseline} baseline items; refusing without force")]
    BigDelete { planned: usize, baseline: usize },

    #[error("change buffer overflowed (cap {cap}); full rescan required")]
    BufferOverflow { cap: usize },

    #[error("sync root contains a .nosync guard file; refusing to sync")]
    NosyncGuard,

    #[error("sync root was deleted")]
    SyncRootDeleted,

    #[error("configured drive {configured} does not match remote drive {actual}")]
    DriveIdentityMismatch { configured: String, actual: String },

    /// Non-fatal: the item is kept orphaned until its parent arrives.
    #[error("item {item} has unknown parent {parent}")]
    OrphanedItem { item: String, parent: String },

    #[error("local I/O error at {path}: {source}")]
    LocalIo {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("operation canceled")]
    ContextCanceled,

    #[error("ambiguous id prefix {query}: matches {}", .candidates.join(", "))]
    AmbiguousId {
        query: String,
        candidates: Vec<String>,
    },

    #[error("storage error: {0}")]
    Storage(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl SyncError {
    /// Fatal errors abort the cycle outright.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            SyncError::BigDelete { .. }
                | SyncError::DriveIdentityMismatch { .. }
                | SyncError::NosyncGuard
                | SyncError::SyncRootDeleted
        )
    }

    /// Retryable at the request layer with bounded backoff.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SyncError::Throttled { .. } | SyncError::TransientNetwork(_)
        )
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
