// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The durable baseline store
//!
//! Single-writer: an exclusive file lock is taken on open and held for the
//! store's lifetime. Readers take cheap snapshots of the cached baseline;
//! a writer commits by appending to the WAL (append + fsync), then
//! applying to the cache. A failed append leaves the cache untouched, so
//! the next cycle still sees consistent state.

use crate::baseline::{Baseline, CommitRecord, DriveIdentity};
use crate::migration::{MigrationError, CURRENT_SNAPSHOT_VERSION};
use crate::snapshot::{read_snapshot, write_snapshot, Snapshot, SnapshotError};
use crate::wal::{Wal, WalError};
use fs2::FileExt;
use parking_lot::{Mutex, RwLock};
use skiff_core::{
    Clock, ConflictId, ConflictRecord, DeltaCursor, Outcome, PrefixLookup, Resolution, SyncError,
};
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("state directory error: {0}")]
    Io(#[from] std::io::Error),
    #[error("another process holds the baseline lock at {0}")]
    Locked(PathBuf),
    #[error(transparent)]
    Wal(#[from] WalError),
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
    #[error(transparent)]
    Migration(#[from] MigrationError),
    #[error("ambiguous conflict id {query}: matches {}", .candidates.join(", "))]
    AmbiguousConflict {
        query: String,
        candidates: Vec<String>,
    },
    #[error("conflict {0} not found")]
    ConflictNotFound(String),
}

impl From<StoreError> for SyncError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::AmbiguousConflict { query, candidates } => {
                SyncError::AmbiguousId { query, candidates }
            }
            other => SyncError::Storage(other.to_string()),
        }
    }
}

/// Durable per-drive baseline, WAL-backed with snapshot checkpoints.
pub struct BaselineStore<C: Clock> {
    snapshot_path: PathBuf,
    wal: Mutex<Wal>,
    cache: RwLock<Baseline>,
    clock: C,
    // NOTE(lifetime): held to maintain the exclusive lock; released on drop
    #[allow(dead_code)]
    lock_file: File,
}

impl<C: Clock> BaselineStore<C> {
    /// Open the store: take the writer lock, load + migrate the snapshot,
    /// replay the WAL tail over it.
    pub fn open(
        snapshot_path: &Path,
        wal_path: &Path,
        lock_path: &Path,
        clock: C,
    ) -> Result<Self, StoreError> {
        if let Some(dir) = snapshot_path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let lock_file = OpenOptions::new()
            .create(true)
            .write(true)
            .open(lock_path)?;
        lock_file
            .try_lock_exclusive()
            .map_err(|_| StoreError::Locked(lock_path.to_path_buf()))?;

        let snapshot = read_snapshot(snapshot_path)?;
        let (mut baseline, last_seq) = match snapshot {
            Some(s) => (s.baseline, s.last_wal_seq),
            None => (Baseline::default(), 0),
        };
        let replayed = Wal::replay(wal_path)?;
        let mut applied = 0usize;
        for entry in &replayed {
            if entry.seq > last_seq {
                baseline.apply(&entry.record);
                applied += 1;
            }
        }
        baseline.rebuild_paths();
        if applied > 0 {
            tracing::info!(
                applied,
                last_snapshot_seq = last_seq,
                "replayed wal entries over snapshot"
            );
        }
        let wal = Wal::open(wal_path, last_seq)?;
        Ok(Self {
            snapshot_path: snapshot_path.to_path_buf(),
            wal: Mutex::new(wal),
            cache: RwLock::new(baseline),
            clock,
            lock_file,
        })
    }

    /// Cycle-long snapshot of the baseline. Stale while a writer commits;
    /// the next cycle loads fresh state.
    pub fn load(&self) -> Baseline {
        self.cache.read().clone()
    }

    /// Read-only access without cloning.
    pub fn with_baseline<T>(&self, f: impl FnOnce(&Baseline) -> T) -> T {
        f(&self.cache.read())
    }

    /// Atomically commit one outcome, optionally advancing the cursor
    /// (only the final outcome of a cycle carries it).
    pub fn commit_outcome(
        &self,
        outcome: Outcome,
        cursor: Option<DeltaCursor>,
    ) -> Result<(), StoreError> {
        let record = CommitRecord::Outcome {
            outcome,
            cursor,
            at_ms: self.clock.epoch_ms(),
        };
        self.commit(record)
    }

    /// Set or clear the cursor without an outcome (empty cycle, expiry).
    pub fn set_cursor(&self, cursor: Option<DeltaCursor>) -> Result<(), StoreError> {
        self.commit(CommitRecord::Cursor { cursor })
    }

    /// Record the drive identity on first open.
    pub fn record_identity(&self, identity: DriveIdentity) -> Result<(), StoreError> {
        self.commit(CommitRecord::IdentityRecorded { identity })
    }

    pub fn identity(&self) -> Option<DriveIdentity> {
        self.cache.read().identity.clone()
    }

    pub fn cursor(&self) -> Option<DeltaCursor> {
        self.cache.read().cursor.clone()
    }

    /// Record a freshly detected conflict.
    pub fn record_conflict(&self, record: ConflictRecord) -> Result<(), StoreError> {
        self.commit(CommitRecord::ConflictRecorded { record })
    }

    /// Resolve by exact id or unique prefix.
    pub fn resolve_conflict(
        &self,
        query: &str,
        resolution: Resolution,
        resolved_by: &str,
    ) -> Result<ConflictRecord, StoreError> {
        let id = {
            let cache = self.cache.read();
            match cache.find_conflict(query) {
                PrefixLookup::One(c) => c.id.clone(),
                PrefixLookup::None => {
                    return Err(StoreError::ConflictNotFound(query.to_string()))
                }
                PrefixLookup::Ambiguous(candidates) => {
                    return Err(StoreError::AmbiguousConflict {
                        query: query.to_string(),
                        candidates,
                    })
                }
            }
        };
        self.commit(CommitRecord::ConflictResolved {
            id: id.clone(),
            resolution,
            resolved_by: resolved_by.to_string(),
            at_ms: self.clock.epoch_ms(),
        })?;
        let cache = self.cache.read();
        cache
            .conflicts
            .get(id.as_str())
            .cloned()
            .ok_or_else(|| StoreError::ConflictNotFound(query.to_string()))
    }

    pub fn list_conflicts(&self, include_resolved: bool) -> Vec<ConflictRecord> {
        self.cache
            .read()
            .list_conflicts(include_resolved)
            .into_iter()
            .cloned()
            .collect()
    }

    /// Find a conflict by id or prefix, cloned out of the cache.
    pub fn find_conflict(&self, query: &str) -> Result<ConflictRecord, StoreError> {
        let cache = self.cache.read();
        match cache.find_conflict(query) {
            PrefixLookup::One(c) => Ok(c.clone()),
            PrefixLookup::None => Err(StoreError::ConflictNotFound(query.to_string())),
            PrefixLookup::Ambiguous(candidates) => Err(StoreError::AmbiguousConflict {
                query: query.to_string(),
                candidates,
            }),
        }
    }

    /// Write a checkpoint snapshot, purge expired tombstones, truncate the
    /// WAL it subsumes.
    pub fn checkpoint(&self, tombstone_retention_ms: u64) -> Result<(), StoreError> {
        let mut wal = self.wal.lock();
        wal.flush()?;
        let last_seq = wal.write_seq();
        let baseline = {
            let mut cache = self.cache.write();
            let purged =
                cache.purge_tombstones(self.clock.epoch_ms(), tombstone_retention_ms);
            if purged > 0 {
                tracing::debug!(purged, "purged expired tombstones");
            }
            cache.clone()
        };
        write_snapshot(
            &self.snapshot_path,
            &Snapshot {
                version: CURRENT_SNAPSHOT_VERSION,
                last_wal_seq: last_seq,
                baseline,
            },
        )?;
        wal.truncate()?;
        Ok(())
    }

    /// Append + fsync, then apply to the cache. The cache is only touched
    /// after the record is durable.
    fn commit(&self, record: CommitRecord) -> Result<(), StoreError> {
        {
            let mut wal = self.wal.lock();
            wal.append(&record)?;
            wal.flush()?;
        }
        self.cache.write().apply(&record);
        Ok(())
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
