// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Custom error type that carries a process exit code.
//!
//! Commands return `ExitError` instead of calling `std::process::exit()`
//! directly, allowing `main()` to handle process termination.

use skiff_core::SyncError;
use std::fmt;

/// Exit codes of the command surface.
pub const EXIT_OK: i32 = 0;
/// Verify mismatch or non-zero failed actions.
pub const EXIT_DIRTY: i32 = 1;
/// Plan rejected by the big-delete gate.
pub const EXIT_PLAN_REJECTED: i32 = 2;
/// Configuration or resource error.
pub const EXIT_CONFIG: i32 = 3;

#[derive(Debug)]
pub struct ExitError {
    pub code: i32,
    pub message: String,
}

impl ExitError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for ExitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ExitError {}

impl From<SyncError> for ExitError {
    fn from(err: SyncError) -> Self {
        let code = match &err {
            SyncError::BigDelete { .. } => EXIT_PLAN_REJECTED,
            SyncError::Config(_)
            | SyncError::DriveIdentityMismatch { .. }
            | SyncError::NosyncGuard
            | SyncError::SyncRootDeleted
            | SyncError::AuthExpired
            | SyncError::Storage(_)
            | SyncError::LocalIo { .. } => EXIT_CONFIG,
            _ => EXIT_DIRTY,
        };
        Self::new(code, err.to_string())
    }
}

#[cfg(test)]
#[path = "exit_error_tests.rs"]
mod tests;
