// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Versioned zstd-compressed baseline snapshots

use crate::baseline::Baseline;
use crate::migration::{migrate, MigrationError, CURRENT_SNAPSHOT_VERSION};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

const ZSTD_LEVEL: i32 = 3;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("snapshot io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("snapshot serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error(transparent)]
    Migration(#[from] MigrationError),
}

/// On-disk snapshot envelope.
#[derive(Debug, Serialize, Deserialize)]
pub struct Snapshot {
    pub version: u32,
    /// WAL sequence the snapshot subsumes; replay skips entries at or
    /// below it.
    pub last_wal_seq: u64,
    pub baseline: Baseline,
}

/// Read, migrate forward if needed, and rebuild derived indexes.
///
/// Returns `None` when no snapshot exists yet (first run).
pub fn read_snapshot(path: &Path) -> Result<Option<Snapshot>, SnapshotError> {
    let compressed = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let raw = zstd::decode_all(compressed.as_slice())?;
    let value: serde_json::Value = serde_json::from_slice(&raw)?;
    let value = migrate(value)?;
    let mut snapshot: Snapshot = serde_json::from_value(value)?;
    snapshot.baseline.rebuild_paths();
    Ok(Some(snapshot))
}

/// Write atomically: temp sibling, fsync, rename.
pub fn write_snapshot(path: &Path, snapshot: &Snapshot) -> Result<(), SnapshotError> {
    debug_assert_eq!(snapshot.version, CURRENT_SNAPSHOT_VERSION);
    let raw = serde_json::to_vec(snapshot)?;
    let compressed = zstd::encode_all(raw.as_slice(), ZSTD_LEVEL)?;
    let tmp = path.with_extension("zst.tmp");
    {
        use std::io::Write;
        let mut f = std::fs::File::create(&tmp)?;
        f.write_all(&compressed)?;
        f.sync_all()?;
    }
    std::fs::rename(&tmp, path)?;
    Ok(())
}

#[cfg(test)]
#[path = "snapshot_tests.rs"]
mod tests;
