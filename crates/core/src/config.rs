// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Engine configuration
//!
//! Every subsystem receives its handle through the engine constructor;
//! there is no package-level configuration state.

use crate::error::SyncError;
use crate::item::DriveId;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Server quantum for chunked uploads. Chunk sizes must be a multiple.
pub const UPLOAD_QUANTUM: u64 = 320 * 1024;

/// Files at or below this size use the simple single-PUT upload.
pub const SIMPLE_UPLOAD_LIMIT: u64 = 4 * 1024 * 1024;

const DEFAULT_CHUNK_SIZE: u64 = 10 * 1024 * 1024;
const DEFAULT_BIG_DELETE_FRACTION: f64 = 0.25;
const DEFAULT_EVENT_CHANNEL_CAP: usize = 100_000;
const DEFAULT_BUFFER_CAP: usize = 200_000;
const DEFAULT_DEBOUNCE_MS: u64 = 500;
const MIN_SAFETY_SCAN_SECS: u64 = 30;

/// Direction and execution mode for one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SyncMode {
    Bidirectional,
    DownloadOnly,
    UploadOnly,
    DryRun,
}

impl Default for SyncMode {
    fn default() -> Self {
        SyncMode::Bidirectional
    }
}

/// Explicit engine configuration, passed to the constructor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Drive this engine instance serves.
    pub drive_id: DriveId,
    /// Local directory mirroring the drive.
    pub sync_root: PathBuf,
    /// Per-drive state directory (baseline, sessions, trash, pause marker).
    pub state_dir: PathBuf,

    /// Transfer worker count. Defaults to the CPU count.
    #[serde(default = "default_transfer_workers")]
    pub transfer_workers: usize,
    /// Metadata/check worker count. Defaults to 2x the CPU count.
    #[serde(default = "default_check_workers")]
    pub check_workers: usize,

    /// Target chunk size for upload sessions; must be a 320 KiB multiple.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: u64,

    /// Fraction of the baseline a plan may delete before being rejected.
    #[serde(default = "default_big_delete_fraction")]
    pub big_delete_fraction: f64,
    /// Allow plans over the big-delete gate.
    #[serde(default)]
    pub force_big_delete: bool,

    /// Local watcher debounce window.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    /// Safety-scan interval in watch mode (clamped to a 30 s minimum).
    #[serde(default = "default_safety_scan_secs")]
    pub safety_scan_secs: u64,

    /// Bound on the observer event channels.
    #[serde(default = "default_event_channel_cap")]
    pub event_channel_cap: usize,
    /// Bound on the change buffer; overflow forces a rescan.
    #[serde(default = "default_buffer_cap")]
    pub buffer_cap: usize,

    /// Route deletions through the remote permanent-delete endpoint.
    #[serde(default)]
    pub permanent_delete: bool,
    /// Move local deletions into the state-dir trash instead of unlinking.
    #[serde(default)]
    pub local_trash: bool,

    /// Personal-account "show remote item alias" preference, applied as a
    /// header preference on every delta request.
    #[serde(default)]
    pub prefer_remote_alias: bool,

    /// User exclusion patterns (glob-like).
    #[serde(default)]
    pub exclusions: Vec<String>,
    /// Case sensitivity for exclusion matching; platform default when None.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub case_sensitive_excludes: Option<bool>,

    /// Tombstone retention before checkpoint purging.
    #[serde(default = "default_tombstone_retention_secs")]
    pub tombstone_retention_secs: u64,
}

fn cpu_count() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

fn default_transfer_workers() -> usize {
    cpu_count()
}

fn default_check_workers() -> usize {
    cpu_count() * 2
}

fn default_chunk_size() -> u64 {
    DEFAULT_CHUNK_SIZE
}

fn default_big_delete_fraction() -> f64 {
    DEFAULT_BIG_DELETE_FRACTION
}

fn default_debounce_ms() -> u64 {
    DEFAULT_DEBOUNCE_MS
}

fn default_safety_scan_secs() -> u64 {
    300
}

fn default_event_channel_cap() -> usize {
    DEFAULT_EVENT_CHANNEL_CAP
}

fn default_buffer_cap() -> usize {
    DEFAULT_BUFFER_CAP
}

fn default_tombstone_retention_secs() -> u64 {
    30 * 24 * 3600
}

impl EngineConfig {
    /// Minimal config with defaults for everything tunable.
    pub fn new(drive_id: DriveId, sync_root: PathBuf, state_dir: PathBuf) -> Self {
        Self {
            drive_id,
            sync_root,
            state_dir,
            transfer_workers: default_transfer_workers(),
            check_workers: default_check_workers(),
            chunk_size: default_chunk_size(),
            big_delete_fraction: default_big_delete_fraction(),
            force_big_delete: false,
            debounce_ms: default_debounce_ms(),
            safety_scan_secs: default_safety_scan_secs(),
            event_channel_cap: default_event_channel_cap(),
            buffer_cap: default_buffer_cap(),
            permanent_delete: false,
            local_trash: false,
            prefer_remote_alias: false,
            exclusions: Vec::new(),
            case_sensitive_excludes: None,
            tombstone_retention_secs: default_tombstone_retention_secs(),
        }
    }

    /// Load from a TOML file.
    pub fn load(path: &Path) -> Result<Self, SyncError> {
        let raw = std::fs::read_to_string(path).map_err(|e| SyncError::LocalIo {
            path: path.to_path_buf(),
            source: e,
        })?;
        let config: Self =
            toml::from_str(&raw).map_err(|e| SyncError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check tunables that have hard constraints.
    pub fn validate(&self) -> Result<(), SyncError> {
        if self.chunk_size == 0 || self.chunk_size % UPLOAD_QUANTUM != 0 {
            return Err(SyncError::Config(format!(
                "chunk_size {} is not a multiple of the {} byte upload quantum",
                self.chunk_size, UPLOAD_QUANTUM
            )));
        }
        if !(0.0..=1.0).contains(&self.big_delete_fraction) {
            return Err(SyncError::Config(format!(
                "big_delete_fraction {} is not within 0..=1",
                self.big_delete_fraction
            )));
        }
        if self.transfer_workers == 0 || self.check_workers == 0 {
            return Err(SyncError::Config("worker counts must be non-zero".into()));
        }
        Ok(())
    }

    /// Safety-scan interval with the minimum applied.
    pub fn safety_scan_interval(&self) -> Duration {
        Duration::from_secs(self.safety_scan_secs.max(MIN_SAFETY_SCAN_SECS))
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// Resolved case sensitivity for exclusion matching.
    pub fn excludes_case_sensitive(&self) -> bool {
        self.case_sensitive_excludes
            .unwrap_or_else(crate::exclude::ExclusionSet::platform_case_sensitive)
    }

    pub fn sessions_dir(&self) -> PathBuf {
        self.state_dir.join("sessions")
    }

    pub fn trash_dir(&self) -> PathBuf {
        self.state_dir.join("trash")
    }

    pub fn pause_marker(&self) -> PathBuf {
        self.state_dir.join("pause")
    }

    pub fn baseline_snapshot_path(&self) -> PathBuf {
        self.state_dir.join("baseline.snapshot.zst")
    }

    pub fn baseline_wal_path(&self) -> PathBuf {
        self.state_dir.join("baseline.wal")
    }

    pub fn baseline_lock_path(&self) -> PathBuf {
        self.state_dir.join("baseline.lock")
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
