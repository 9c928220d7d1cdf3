// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Remote error classification
//!
//! The transport classifies failures before they reach the engine; the
//! engine pattern-matches these variants and never inspects status codes.

use skiff_core::SyncError;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("item not found")]
    NotFound,

    #[error("remote conflict: {0}")]
    Conflict(String),

    #[error("range not satisfiable")]
    RangeNotSatisfiable,

    #[error("upload session expired")]
    UploadSessionExpired,

    #[error("throttled; retry after {retry_after:?}")]
    Throttled { retry_after: Option<Duration> },

    #[error("transient failure: {0}")]
    Transient(String),

    #[error("permanent failure: {0}")]
    Permanent(String),

    #[error("not logged in")]
    NotLoggedIn,

    #[error("delta cursor expired")]
    CursorExpired,
}

impl RemoteError {
    /// Retryable by the lightweight wrapper; everything else surfaces.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            RemoteError::Throttled { .. } | RemoteError::Transient(_)
        )
    }
}

impl From<RemoteError> for SyncError {
    fn from(err: RemoteError) -> Self {
        match err {
            RemoteError::CursorExpired => SyncError::CursorExpired,
            RemoteError::NotLoggedIn => SyncError::AuthExpired,
            RemoteError::Throttled { retry_after } => SyncError::Throttled { retry_after },
            RemoteError::Transient(msg) => SyncError::TransientNetwork(msg),
            RemoteError::RangeNotSatisfiable => SyncError::RangeNotSatisfiable,
            RemoteError::UploadSessionExpired => SyncError::UploadSessionExpired,
            RemoteError::NotFound => SyncError::PermanentRemote("not found".to_string()),
            RemoteError::Conflict(msg) => {
                SyncError::PermanentRemote(format!("conflict: {}", msg))
            }
            RemoteError::Permanent(msg) => SyncError::PermanentRemote(msg),
        }
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
