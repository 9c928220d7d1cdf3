// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! skiff-store: durable per-drive state
//!
//! The baseline is a zstd-compressed JSON snapshot plus a JSON-lines WAL
//! of commit records; replaying the WAL over the snapshot is idempotent.
//! Upload sessions live as one JSON record per (drive, path).

mod baseline;
mod migration;
mod sessions;
mod snapshot;
mod store;
mod wal;

pub use baseline::{Baseline, CommitRecord, DriveIdentity};
pub use migration::{migrate, MigrationError, CURRENT_SNAPSHOT_VERSION};
pub use sessions::{SessionRecord, SessionStore};
pub use snapshot::{read_snapshot, write_snapshot, Snapshot, SnapshotError};
pub use store::{BaselineStore, StoreError};
pub use wal::{Wal, WalEntry, WalError};
