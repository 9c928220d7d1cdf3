// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-cycle sync report

use crate::action::ActionKind;
use crate::path::SyncPath;
use serde::{Deserialize, Serialize};

/// Maximum per-action errors carried in a report.
pub const ERROR_LIST_CAP: usize = 100;

/// One failed action, as surfaced to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionError {
    pub kind: ActionKind,
    pub path: SyncPath,
    pub error: String,
}

/// Counters and capped errors for one completed cycle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SyncReport {
    pub downloads: u64,
    pub uploads: u64,
    pub local_deletes: u64,
    pub remote_deletes: u64,
    pub folders_created: u64,
    /// Paths where both sides converged; baseline updated, no transfer.
    pub converged: u64,
    pub conflicts_detected: u64,
    pub conflicts_resolved: u64,
    pub failed: u64,
    /// Observer events dropped on the bounded channel this cycle.
    pub dropped_events: u64,
    /// Paths skipped because their failure backoff window is open.
    pub skipped_backoff: u64,
    /// The cursor was discarded and a full rescan performed.
    pub delta_reset: bool,
    pub duration_ms: u64,
    /// Capped at [`ERROR_LIST_CAP`]; `errors_truncated` counts the rest.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<ActionError>,
    #[serde(default)]
    pub errors_truncated: u64,
}

impl SyncReport {
    pub fn record_success(&mut self, kind: ActionKind) {
        match kind {
            ActionKind::Download => self.downloads += 1,
            ActionKind::Upload => self.uploads += 1,
            ActionKind::LocalDelete => self.local_deletes += 1,
            ActionKind::RemoteDelete => self.remote_deletes += 1,
            ActionKind::CreateLocalFolder | ActionKind::CreateRemoteFolder => {
                self.folders_created += 1
            }
            ActionKind::ResolveConflict => self.conflicts_resolved += 1,
        }
    }

    pub fn record_error(&mut self, kind: ActionKind, path: SyncPath, error: String) {
        self.failed += 1;
        if self.errors.len() < ERROR_LIST_CAP {
            self.errors.push(ActionError { kind, path, error });
        } else {
            self.errors_truncated += 1;
        }
    }

    /// Total transferred (downloads + uploads).
    pub fn transferred(&self) -> u64 {
        self.downloads + self.uploads
    }
}

#[cfg(test)]
#[path = "report_tests.rs"]
mod tests;
