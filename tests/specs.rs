// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workspace end-to-end scenarios against the in-memory remote.

use skiff_core::{
    hash_bytes, quickxor_factory, DriveId, EngineConfig, FakeClock, ItemId, Resolution, SyncMode,
    SyncPath, UPLOAD_QUANTUM,
};
use skiff_engine::{resolve_batch, Engine, Selector};
use skiff_remote::{ContentRange, FakeRemote, Fault, RemoteClient, UploadChunkResult};
use skiff_store::{SessionRecord, SessionStore};
use std::sync::Arc;
use tempfile::{tempdir, TempDir};

struct Setup {
    remote: Arc<FakeRemote>,
    engine: Engine<FakeRemote, FakeClock>,
    config: EngineConfig,
    root: TempDir,
    _state: TempDir,
}

fn setup() -> Setup {
    setup_with(|_| {})
}

fn setup_with(tweak: impl FnOnce(&mut EngineConfig)) -> Setup {
    let root = tempdir().unwrap();
    let state = tempdir().unwrap();
    let remote = Arc::new(FakeRemote::new("drv1"));
    let mut config = EngineConfig::new(
        DriveId::new("drv1"),
        root.path().to_path_buf(),
        state.path().to_path_buf(),
    );
    config.transfer_workers = 2;
    config.check_workers = 2;
    tweak(&mut config);
    let engine = Engine::open(
        Arc::clone(&remote),
        config.clone(),
        quickxor_factory(),
        FakeClock::new(),
    )
    .unwrap();
    Setup {
        remote,
        engine,
        config,
        root,
        _state: state,
    }
}

/// Scenario 1: add on remote, empty locally.
#[tokio::test]
async fn remote_add_into_empty_local_tree() {
    let s = setup();
    s.remote.seed_file("a.txt", b"hello");

    let report = s.engine.run_once(SyncMode::Bidirectional).await.unwrap();

    assert_eq!(report.downloads, 1);
    assert_eq!(report.uploads, 0);
    assert_eq!(report.failed, 0);
    assert_eq!(std::fs::read(s.root.path().join("a.txt")).unwrap(), b"hello");
    let baseline = s.engine.store().load();
    let item = baseline.item_by_path(&SyncPath::new("a.txt")).unwrap();
    assert_eq!(
        item.content_hash.as_deref().unwrap(),
        hash_bytes(&quickxor_factory(), b"hello")
    );
    assert!(baseline.cursor.is_some());
}

/// Scenario 2: large-file upload canceled after the first chunk resumes
/// from the persisted session and completes.
#[tokio::test]
async fn large_upload_resumes_from_persisted_session() {
    let s = setup();
    let size = 20 * 1024 * 1024u64;
    let chunk = 10 * 1024 * 1024u64;
    assert_eq!(chunk % UPLOAD_QUANTUM, 0);
    let data: Vec<u8> = (0..size).map(|i| (i % 251) as u8).collect();
    std::fs::write(s.root.path().join("big.bin"), &data).unwrap();
    let local_hash = hash_bytes(&quickxor_factory(), &data);

    // First run got through exactly one chunk before dying: reproduce its
    // durable traces (session record + one accepted chunk).
    let session = s
        .remote
        .create_upload_session(
            &s.config.drive_id,
            &ItemId::root(),
            "big.bin",
            size,
            None,
        )
        .await
        .unwrap();
    let sessions = SessionStore::new(s.config.sessions_dir());
    sessions
        .save(&SessionRecord {
            drive_id: s.config.drive_id.clone(),
            remote_path: SyncPath::new("big.bin"),
            session: session.clone(),
            local_file_hash: local_hash.clone(),
            file_size: size,
            created_at_ms: 1,
        })
        .unwrap();
    let first = s
        .remote
        .upload_chunk(
            &session,
            data[..chunk as usize].to_vec(),
            ContentRange {
                start: 0,
                end: chunk - 1,
                total: size,
            },
        )
        .await
        .unwrap();
    assert!(matches!(first, UploadChunkResult::Accepted));

    // The re-run loads the session and only sends the second chunk.
    let report = s.engine.run_once(SyncMode::Bidirectional).await.unwrap();
    assert_eq!(report.uploads, 1);
    assert_eq!(report.failed, 0);

    let item = s.remote.item_by_path("big.bin").unwrap();
    assert_eq!(item.size, size);
    assert_eq!(item.quickxor_hash.as_deref().unwrap(), local_hash);
    assert_eq!(s.remote.live_item_count(), 1);
    // Session record removed on success; no sessions left open remotely.
    assert!(sessions
        .load(&s.config.drive_id, &SyncPath::new("big.bin"))
        .is_none());
    assert_eq!(s.remote.open_session_count(), 0);
}

/// Scenario 3: divergent edits conflict, keep-local resolves.
#[tokio::test]
async fn edit_edit_conflict_then_keep_local() {
    let s = setup();
    s.remote.seed_file("doc.txt", b"base line");
    s.engine.run_once(SyncMode::Bidirectional).await.unwrap();

    std::fs::write(s.root.path().join("doc.txt"), b"local 10b").unwrap();
    s.remote.seed_file("doc.txt", b"remote 12byte");

    let report = s.engine.run_once(SyncMode::Bidirectional).await.unwrap();
    assert_eq!(report.transferred(), 0);
    assert_eq!(report.conflicts_detected, 1);
    // Neither side changed.
    assert_eq!(
        std::fs::read(s.root.path().join("doc.txt")).unwrap(),
        b"local 10b"
    );
    assert_eq!(s.remote.file_content("doc.txt").unwrap(), b"remote 12byte");
    let conflicts = s.engine.store().list_conflicts(false);
    assert_eq!(conflicts.len(), 1);
    assert_eq!(conflicts[0].kind.as_str(), "edit-edit");

    // resolve --keep-local --all
    resolve_batch(
        s.engine.store(),
        &Selector::All,
        Resolution::KeepLocal,
        "cli",
        false,
    )
    .unwrap();

    let report = s.engine.run_once(SyncMode::Bidirectional).await.unwrap();
    assert_eq!(report.conflicts_resolved, 1);
    assert_eq!(s.remote.file_content("doc.txt").unwrap(), b"local 10b");
    let baseline = s.engine.store().load();
    assert_eq!(
        baseline
            .item_by_path(&SyncPath::new("doc.txt"))
            .unwrap()
            .content_hash
            .as_deref()
            .unwrap(),
        hash_bytes(&quickxor_factory(), b"local 10b")
    );
}

/// Scenario 4: cursor expiry falls back to a full listing.
#[tokio::test]
async fn cursor_expiry_resets_and_rescans() {
    let s = setup();
    s.remote.seed_file("a.txt", b"1");
    s.engine.run_once(SyncMode::Bidirectional).await.unwrap();

    s.remote.seed_file("b.txt", b"2");
    s.remote.seed_file("c.txt", b"3");
    s.remote.inject(Fault::CursorExpired);

    let report = s.engine.run_once(SyncMode::Bidirectional).await.unwrap();
    assert!(report.delta_reset);
    assert_eq!(report.failed, 0);
    for name in ["a.txt", "b.txt", "c.txt"] {
        assert!(s.root.path().join(name).exists());
    }
    assert_eq!(s.engine.store().load().live_item_count(), 3);
}

/// Scenario 5: the big-delete gate blocks, force applies.
#[tokio::test]
async fn big_delete_gate() {
    let s = setup();
    for i in 0..100 {
        s.remote.seed_file(&format!("x/f{:03}.txt", i), b"d");
    }
    s.engine.run_once(SyncMode::Bidirectional).await.unwrap();
    assert_eq!(s.engine.store().load().live_item_count(), 101);

    s.remote.seed_delete("x");
    let err = s.engine.run_once(SyncMode::Bidirectional).await;
    assert!(matches!(err, Err(skiff_core::SyncError::BigDelete { .. })));
    // Nothing was deleted locally.
    assert!(s.root.path().join("x/f000.txt").exists());

    // Re-open with force and the deletions apply.
    drop(s.engine);
    let mut config = s.config.clone();
    config.force_big_delete = true;
    let engine = Engine::open(
        Arc::clone(&s.remote),
        config,
        quickxor_factory(),
        FakeClock::new(),
    )
    .unwrap();
    let report = engine.run_once(SyncMode::Bidirectional).await.unwrap();
    assert_eq!(report.local_deletes, 101);
    assert!(!s.root.path().join("x").exists());
    assert_eq!(engine.store().load().live_item_count(), 0);
}

/// Scenario 6: three concurrent uploads through a pool of two.
#[tokio::test]
async fn concurrent_uploads_through_small_pool() {
    let s = setup();
    for name in ["a.bin", "b.bin", "c.bin"] {
        std::fs::write(s.root.path().join(name), vec![7u8; 1024 * 1024]).unwrap();
    }

    let report = s.engine.run_once(SyncMode::Bidirectional).await.unwrap();
    assert_eq!(report.uploads, 3);
    assert_eq!(report.failed, 0);

    let baseline = s.engine.store().load();
    assert_eq!(baseline.live_item_count(), 3);
    for name in ["a.bin", "b.bin", "c.bin"] {
        let committed = baseline.item_by_path(&SyncPath::new(name)).unwrap();
        let remote = s.remote.item_by_path(name).unwrap();
        assert_eq!(committed.content_hash, remote.quickxor_hash);
    }
}

/// Invariant 1: local hashes equal remote hashes for every
/// non-conflicted path after convergence.
#[tokio::test]
async fn convergence_from_empty_local() {
    let s = setup();
    s.remote.seed_folder("docs/nested");
    s.remote.seed_file("docs/nested/deep.txt", b"deep");
    s.remote.seed_file("docs/top.txt", b"top");
    s.remote.seed_file("root.txt", b"root");

    let report = s.engine.run_once(SyncMode::Bidirectional).await.unwrap();
    assert_eq!(report.failed, 0);

    let factory = quickxor_factory();
    for path in ["docs/nested/deep.txt", "docs/top.txt", "root.txt"] {
        let local = std::fs::read(SyncPath::new(path).to_fs(s.root.path())).unwrap();
        let remote = s.remote.item_by_path(path).unwrap();
        assert_eq!(
            hash_bytes(&factory, &local),
            remote.quickxor_hash.unwrap(),
            "hash drift at {path}"
        );
    }
}

/// Invariant 2: a failed cycle re-run converges to the same state an
/// uninterrupted run reaches.
#[tokio::test]
async fn interrupted_cycle_rerun_converges() {
    let s = setup();
    s.remote.seed_file("a.txt", b"alpha");
    s.remote.seed_file("b.txt", b"beta");
    // Exhaust the delta retry budget so the first cycle fails outright.
    for _ in 0..4 {
        s.remote.inject(Fault::TransientDelta);
    }
    assert!(s.engine.run_once(SyncMode::Bidirectional).await.is_err());
    let report = s.engine.run_once(SyncMode::Bidirectional).await.unwrap();
    assert_eq!(report.downloads, 2);
    assert_eq!(report.failed, 0);
    assert!(s.root.path().join("a.txt").exists());
    assert!(s.root.path().join("b.txt").exists());
}

/// Invariant 3/idempotence: reopening the store between cycles loses
/// nothing (an open, close, reopen sequence is identity).
#[tokio::test]
async fn state_survives_engine_restart() {
    let s = setup();
    s.remote.seed_file("keep.txt", b"kept");
    s.engine.run_once(SyncMode::Bidirectional).await.unwrap();
    let before = s.engine.store().load();
    drop(s.engine);

    let engine = Engine::open(
        Arc::clone(&s.remote),
        s.config.clone(),
        quickxor_factory(),
        FakeClock::new(),
    )
    .unwrap();
    let after = engine.store().load();
    assert_eq!(before.cursor, after.cursor);
    assert_eq!(before.items.len(), after.items.len());
    let report = engine.run_once(SyncMode::Bidirectional).await.unwrap();
    assert_eq!(report.transferred(), 0);
}

/// Local deletions propagate to the remote recycle path.
#[tokio::test]
async fn local_delete_propagates() {
    let s = setup();
    s.remote.seed_file("gone.txt", b"bye");
    s.engine.run_once(SyncMode::Bidirectional).await.unwrap();

    std::fs::remove_file(s.root.path().join("gone.txt")).unwrap();
    let report = s.engine.run_once(SyncMode::Bidirectional).await.unwrap();
    assert_eq!(report.remote_deletes, 1);
    assert_eq!(s.remote.live_item_count(), 0);
}

/// keep-both renames the local copy; both versions survive the next
/// cycles.
#[tokio::test]
async fn keep_both_preserves_both_versions() {
    let s = setup();
    s.remote.seed_file("doc.txt", b"base");
    s.engine.run_once(SyncMode::Bidirectional).await.unwrap();

    std::fs::write(s.root.path().join("doc.txt"), b"mine").unwrap();
    s.remote.seed_file("doc.txt", b"theirs");
    s.engine.run_once(SyncMode::Bidirectional).await.unwrap();

    resolve_batch(
        s.engine.store(),
        &Selector::All,
        Resolution::KeepBoth,
        "cli",
        false,
    )
    .unwrap();

    // Cycle 1 renames the local copy; following cycles restore the remote
    // original and upload the renamed copy.
    for _ in 0..3 {
        s.engine.run_once(SyncMode::Bidirectional).await.unwrap();
    }

    assert_eq!(
        std::fs::read(s.root.path().join("doc.txt")).unwrap(),
        b"theirs"
    );
    let renamed: Vec<String> = std::fs::read_dir(s.root.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .filter(|n| n.contains("conflict"))
        .collect();
    assert_eq!(renamed.len(), 1);
    assert_eq!(
        std::fs::read(s.root.path().join(&renamed[0])).unwrap(),
        b"mine"
    );
    // Both versions also live remotely now.
    assert!(s.remote.file_content("doc.txt").is_some());
    assert!(s.remote.file_content(&renamed[0]).is_some());
}
