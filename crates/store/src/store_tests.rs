// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use skiff_core::{ActionKind, ConflictKind, FakeClock, HashKind, ItemId, SyncPath};
use tempfile::{tempdir, TempDir};

struct Fixture {
    _dir: TempDir,
    snapshot: PathBuf,
    wal: PathBuf,
    lock: PathBuf,
    clock: FakeClock,
}

impl Fixture {
    fn new() -> Self {
        let dir = tempdir().unwrap();
        let snapshot = dir.path().join("baseline.snapshot.zst");
        let wal = dir.path().join("baseline.wal");
        let lock = dir.path().join("baseline.lock");
        Self {
            _dir: dir,
            snapshot,
            wal,
            lock,
            clock: FakeClock::new(),
        }
    }

    fn open(&self) -> BaselineStore<FakeClock> {
        BaselineStore::open(&self.snapshot, &self.wal, &self.lock, self.clock.clone()).unwrap()
    }
}

fn outcome(kind: ActionKind, path: &str, id: &str) -> Outcome {
    Outcome {
        kind,
        path: SyncPath::new(path),
        item_id: Some(ItemId::new(id)),
        parent_id: Some(ItemId::root()),
        name: SyncPath::new(path).name().to_string(),
        is_folder: false,
        size: 5,
        content_hash: Some("aGFzaA==".to_string()),
        hash_kind: Some(HashKind::QuickXor),
        hash_verified: true,
        mtime_local: None,
        mtime_remote: None,
        etag: Some("e1".to_string()),
        resolved_conflict: None,
    }
}

fn conflict(path: &str) -> ConflictRecord {
    ConflictRecord {
        id: ConflictId::new(),
        path: SyncPath::new(path),
        kind: ConflictKind::EditEdit,
        detected_at: chrono::Utc::now(),
        local_hash: None,
        remote_hash: None,
        resolution: Resolution::Unresolved,
        resolved_at: None,
        resolved_by: None,
        applied: false,
    }
}

#[test]
fn commit_survives_reopen() {
    let fx = Fixture::new();
    {
        let store = fx.open();
        store
            .commit_outcome(
                outcome(ActionKind::Download, "a.txt", "i1"),
                Some(DeltaCursor::new("c1")),
            )
            .unwrap();
    }
    let store = fx.open();
    let baseline = store.load();
    assert_eq!(baseline.items.len(), 1);
    assert_eq!(baseline.cursor.unwrap().as_str(), "c1");
}

#[test]
fn second_open_is_refused_while_locked() {
    let fx = Fixture::new();
    let _store = fx.open();
    let err = BaselineStore::open(&fx.snapshot, &fx.wal, &fx.lock, fx.clock.clone());
    assert!(matches!(err, Err(StoreError::Locked(_))));
}

#[test]
fn cursor_never_runs_ahead_of_outcomes() {
    let fx = Fixture::new();
    let store = fx.open();
    store
        .commit_outcome(outcome(ActionKind::Download, "a.txt", "i1"), None)
        .unwrap();
    // No cursor attached yet
    assert!(store.cursor().is_none());
    store
        .commit_outcome(
            outcome(ActionKind::Download, "b.txt", "i2"),
            Some(DeltaCursor::new("c2")),
        )
        .unwrap();
    assert_eq!(store.cursor().unwrap().as_str(), "c2");
}

#[test]
fn checkpoint_then_reopen_is_identical() {
    let fx = Fixture::new();
    {
        let store = fx.open();
        store
            .commit_outcome(outcome(ActionKind::Download, "a.txt", "i1"), None)
            .unwrap();
        store
            .commit_outcome(
                outcome(ActionKind::Upload, "b.txt", "i2"),
                Some(DeltaCursor::new("c2")),
            )
            .unwrap();
        store.checkpoint(u64::MAX).unwrap();
        // WAL is empty after checkpoint
        assert!(Wal::replay(&fx.wal).unwrap().is_empty());
    }
    let store = fx.open();
    let baseline = store.load();
    assert_eq!(baseline.items.len(), 2);
    assert_eq!(baseline.cursor.unwrap().as_str(), "c2");
}

#[test]
fn post_checkpoint_commits_replay_over_snapshot() {
    let fx = Fixture::new();
    {
        let store = fx.open();
        store
            .commit_outcome(outcome(ActionKind::Download, "a.txt", "i1"), None)
            .unwrap();
        store.checkpoint(u64::MAX).unwrap();
        store
            .commit_outcome(outcome(ActionKind::Download, "b.txt", "i2"), None)
            .unwrap();
    }
    let store = fx.open();
    assert_eq!(store.load().items.len(), 2);
}

#[test]
fn conflict_lifecycle_through_store() {
    let fx = Fixture::new();
    let store = fx.open();
    let c = conflict("a.txt");
    store.record_conflict(c.clone()).unwrap();

    let listed = store.list_conflicts(false);
    assert_eq!(listed.len(), 1);

    let resolved = store
        .resolve_conflict(c.id.as_str(), Resolution::KeepLocal, "cli")
        .unwrap();
    assert_eq!(resolved.resolution, Resolution::KeepLocal);
    assert!(store.list_conflicts(false).is_empty());
    assert_eq!(store.list_conflicts(true).len(), 1);
}

#[test]
fn conflict_prefix_resolution_and_ambiguity() {
    let fx = Fixture::new();
    let store = fx.open();
    let a = conflict("a.txt");
    let b = conflict("b.txt");
    store.record_conflict(a.clone()).unwrap();
    store.record_conflict(b.clone()).unwrap();

    // "cfl-" matches both
    let err = store.resolve_conflict("cfl-", Resolution::KeepLocal, "cli");
    assert!(matches!(err, Err(StoreError::AmbiguousConflict { .. })));

    // A long unique prefix resolves
    let prefix = &a.id.as_str()[..a.id.as_str().len() - 2];
    let resolved = store
        .resolve_conflict(prefix, Resolution::KeepRemote, "cli")
        .unwrap();
    assert_eq!(resolved.id, a.id);
}

#[test]
fn missing_conflict_is_not_found() {
    let fx = Fixture::new();
    let store = fx.open();
    let err = store.resolve_conflict("cfl-nothing", Resolution::KeepLocal, "cli");
    assert!(matches!(err, Err(StoreError::ConflictNotFound(_))));
}

#[test]
fn identity_round_trip() {
    let fx = Fixture::new();
    {
        let store = fx.open();
        store
            .record_identity(DriveIdentity {
                drive_id: "drv1".to_string(),
                drive_type: "personal".to_string(),
                owner_email: Some("t@example.com".to_string()),
                created_at_ms: 1,
            })
            .unwrap();
    }
    let store = fx.open();
    assert_eq!(store.identity().unwrap().drive_id, "drv1");
}

#[test]
fn checkpoint_purges_expired_tombstones() {
    let fx = Fixture::new();
    let store = fx.open();
    store
        .commit_outcome(outcome(ActionKind::Download, "a.txt", "i1"), None)
        .unwrap();
    store
        .commit_outcome(outcome(ActionKind::LocalDelete, "a.txt", "i1"), None)
        .unwrap();
    fx.clock.advance(std::time::Duration::from_secs(100));
    store.checkpoint(1_000).unwrap();
    assert!(store.load().items.is_empty());
}

#[test]
fn cursor_identity_through_store() {
    // Opaque cursor round-trips byte-for-byte
    let fx = Fixture::new();
    let token = "https://remote.example/delta?token=opaque%2Fdata==";
    {
        let store = fx.open();
        store.set_cursor(Some(DeltaCursor::new(token))).unwrap();
    }
    let store = fx.open();
    assert_eq!(store.cursor().unwrap().as_str(), token);
}
