// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Persisted upload sessions for resume
//!
//! One JSON record per (drive, path), mode 0600, keyed by the local file
//! hash so a content change invalidates the resume.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use skiff_core::{DriveId, SyncPath};
use skiff_remote::UploadSession;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Persisted pre-authorized upload session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub drive_id: DriveId,
    pub remote_path: SyncPath,
    pub session: UploadSession,
    /// Hash of the local file when the session was created; a later
    /// attempt with a different hash must discard the session.
    pub local_file_hash: String,
    pub file_size: u64,
    pub created_at_ms: u64,
}

/// Directory of session records.
pub struct SessionStore {
    dir: PathBuf,
}

impl SessionStore {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    /// Persist before the first chunk goes out.
    pub fn save(&self, record: &SessionRecord) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.record_path(&record.drive_id, &record.remote_path);
        let json = serde_json::to_vec_pretty(record)?;
        write_private(&path, &json)?;
        Ok(())
    }

    /// Load the record for (drive, path). Unreadable records are deleted
    /// and reported absent rather than failing the upload.
    pub fn load(&self, drive: &DriveId, path: &SyncPath) -> Option<SessionRecord> {
        let file = self.record_path(drive, path);
        let raw = std::fs::read(&file).ok()?;
        match serde_json::from_slice::<SessionRecord>(&raw) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!(path = %path, error = %e, "discarding corrupt session record");
                let _ = std::fs::remove_file(&file);
                None
            }
        }
    }

    /// Remove on success or permanent failure.
    pub fn delete(&self, drive: &DriveId, path: &SyncPath) {
        let file = self.record_path(drive, path);
        if let Err(e) = std::fs::remove_file(&file) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(path = %path, error = %e, "failed to remove session record");
            }
        }
    }

    fn record_path(&self, drive: &DriveId, path: &SyncPath) -> PathBuf {
        let mut hasher = Sha256::new();
        hasher.update(drive.as_str().as_bytes());
        hasher.update(b"\n");
        hasher.update(path.as_str().as_bytes());
        let digest = hasher.finalize();
        let mut name = String::with_capacity(64 + 5);
        for b in digest {
            use std::fmt::Write as _;
            let _ = write!(name, "{:02x}", b);
        }
        name.push_str(".json");
        self.dir.join(name)
    }
}

#[cfg(unix)]
fn write_private(path: &Path, data: &[u8]) -> std::io::Result<()> {
    use std::io::Write;
    use std::os::unix::fs::OpenOptionsExt;
    let mut f = std::fs::OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?;
    f.write_all(data)?;
    f.sync_all()
}

#[cfg(not(unix))]
fn write_private(path: &Path, data: &[u8]) -> std::io::Result<()> {
    std::fs::write(path, data)
}

#[cfg(test)]
#[path = "sessions_tests.rs"]
mod tests;
