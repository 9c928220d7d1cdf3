// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use skiff_remote::SessionUrl;
use tempfile::tempdir;

fn record(path: &str) -> SessionRecord {
    SessionRecord {
        drive_id: DriveId::new("drv1"),
        remote_path: SyncPath::new(path),
        session: UploadSession {
            url: SessionUrl::new("https://host/upload?sig=SECRET"),
            expires_at: None,
        },
        local_file_hash: "aGFzaA==".to_string(),
        file_size: 20 * 1024 * 1024,
        created_at_ms: 1_000,
    }
}

#[test]
fn save_load_round_trip() {
    let dir = tempdir().unwrap();
    let store = SessionStore::new(dir.path().join("sessions"));
    let rec = record("docs/big.bin");
    store.save(&rec).unwrap();

    let loaded = store
        .load(&DriveId::new("drv1"), &SyncPath::new("docs/big.bin"))
        .unwrap();
    assert_eq!(loaded, rec);
}

#[test]
fn load_missing_is_none() {
    let dir = tempdir().unwrap();
    let store = SessionStore::new(dir.path().join("sessions"));
    assert!(store
        .load(&DriveId::new("drv1"), &SyncPath::new("none.bin"))
        .is_none());
}

#[test]
fn keys_are_per_drive_and_path() {
    let dir = tempdir().unwrap();
    let store = SessionStore::new(dir.path().join("sessions"));
    store.save(&record("a.bin")).unwrap();

    assert!(store
        .load(&DriveId::new("drv2"), &SyncPath::new("a.bin"))
        .is_none());
    assert!(store
        .load(&DriveId::new("drv1"), &SyncPath::new("b.bin"))
        .is_none());
}

#[test]
fn delete_removes_record() {
    let dir = tempdir().unwrap();
    let store = SessionStore::new(dir.path().join("sessions"));
    let rec = record("a.bin");
    store.save(&rec).unwrap();
    store.delete(&rec.drive_id, &rec.remote_path);
    assert!(store.load(&rec.drive_id, &rec.remote_path).is_none());
}

#[test]
fn corrupt_record_is_discarded() {
    let dir = tempdir().unwrap();
    let sessions_dir = dir.path().join("sessions");
    let store = SessionStore::new(sessions_dir.clone());
    let rec = record("a.bin");
    store.save(&rec).unwrap();

    // Corrupt the single record on disk
    let entry = std::fs::read_dir(&sessions_dir)
        .unwrap()
        .next()
        .unwrap()
        .unwrap();
    std::fs::write(entry.path(), b"{not json").unwrap();

    assert!(store.load(&rec.drive_id, &rec.remote_path).is_none());
    // and the file is gone
    assert_eq!(std::fs::read_dir(&sessions_dir).unwrap().count(), 0);
}

#[cfg(unix)]
#[test]
fn records_are_private() {
    use std::os::unix::fs::PermissionsExt;
    let dir = tempdir().unwrap();
    let sessions_dir = dir.path().join("sessions");
    let store = SessionStore::new(sessions_dir.clone());
    store.save(&record("a.bin")).unwrap();
    let entry = std::fs::read_dir(&sessions_dir)
        .unwrap()
        .next()
        .unwrap()
        .unwrap();
    let mode = entry.metadata().unwrap().permissions().mode();
    assert_eq!(mode & 0o777, 0o600);
}
