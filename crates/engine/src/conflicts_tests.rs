// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use skiff_core::{ConflictId, ConflictKind, FakeClock, SyncPath};
use tempfile::tempdir;

fn store() -> (Arc<BaselineStore<FakeClock>>, tempfile::TempDir) {
    let dir = tempdir().unwrap();
    let store = BaselineStore::open(
        &dir.path().join("baseline.snapshot.zst"),
        &dir.path().join("baseline.wal"),
        &dir.path().join("baseline.lock"),
        FakeClock::new(),
    )
    .unwrap();
    (Arc::new(store), dir)
}

fn seed_conflict(store: &Arc<BaselineStore<FakeClock>>, path: &str) -> ConflictRecord {
    let record = ConflictRecord {
        id: ConflictId::new(),
        path: SyncPath::new(path),
        kind: ConflictKind::EditEdit,
        detected_at: chrono::Utc::now(),
        local_hash: Some("bA==".to_string()),
        remote_hash: Some("cg==".to_string()),
        resolution: Resolution::Unresolved,
        resolved_at: None,
        resolved_by: None,
        applied: false,
    };
    store.record_conflict(record.clone()).unwrap();
    record
}

#[test]
fn resolve_all_marks_everything() {
    let (store, _dir) = store();
    seed_conflict(&store, "a.txt");
    seed_conflict(&store, "b.txt");

    let resolved = resolve_batch(&store, &Selector::All, Resolution::KeepLocal, "cli", false)
        .unwrap();
    assert_eq!(resolved.len(), 2);
    assert!(store.list_conflicts(false).is_empty());
    // Still pending apply until an action commits
    assert!(store
        .list_conflicts(true)
        .iter()
        .all(|c| c.is_pending_apply()));
}

#[test]
fn dry_run_changes_nothing() {
    let (store, _dir) = store();
    seed_conflict(&store, "a.txt");

    let would = resolve_batch(&store, &Selector::All, Resolution::KeepRemote, "cli", true)
        .unwrap();
    assert_eq!(would.len(), 1);
    assert_eq!(store.list_conflicts(false).len(), 1);
}

#[test]
fn resolve_by_path() {
    let (store, _dir) = store();
    seed_conflict(&store, "docs/a.txt");
    seed_conflict(&store, "docs/b.txt");

    let resolved = resolve_batch(
        &store,
        &Selector::One("docs/a.txt".to_string()),
        Resolution::KeepBoth,
        "cli",
        false,
    )
    .unwrap();
    assert_eq!(resolved.len(), 1);
    assert_eq!(resolved[0].path.as_str(), "docs/a.txt");
    assert_eq!(store.list_conflicts(false).len(), 1);
}

#[test]
fn resolve_by_unique_id_prefix() {
    let (store, _dir) = store();
    let record = seed_conflict(&store, "a.txt");
    let prefix = &record.id.as_str()[..record.id.as_str().len() - 3];

    let resolved = resolve_batch(
        &store,
        &Selector::One(prefix.to_string()),
        Resolution::KeepLocal,
        "cli",
        false,
    )
    .unwrap();
    assert_eq!(resolved[0].id, record.id);
}

#[test]
fn ambiguous_prefix_is_an_error() {
    let (store, _dir) = store();
    seed_conflict(&store, "a.txt");
    seed_conflict(&store, "b.txt");

    let err = resolve_batch(
        &store,
        &Selector::One("cfl-".to_string()),
        Resolution::KeepLocal,
        "cli",
        false,
    );
    assert!(matches!(err, Err(SyncError::AmbiguousId { .. })));
    // nothing was partially resolved
    assert_eq!(store.list_conflicts(false).len(), 2);
}

#[test]
fn missing_selector_is_an_error() {
    let (store, _dir) = store();
    let err = resolve_batch(
        &store,
        &Selector::One("cfl-zzz".to_string()),
        Resolution::KeepLocal,
        "cli",
        false,
    );
    assert!(matches!(err, Err(SyncError::Storage(_))));
}
