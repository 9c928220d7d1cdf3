// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use skiff_core::quickxor_factory;
use std::sync::atomic::AtomicU64;
use tempfile::tempdir;

struct Fixture {
    root: PathBuf,
    _dir: tempfile::TempDir,
    events: mpsc::Receiver<ChangeEvent>,
    errors: mpsc::Receiver<SyncError>,
    state: Arc<Mutex<ObserverState>>,
    cancel: CancellationToken,
    watcher: LocalWatcher,
}

fn spawn_fixture() -> Fixture {
    let dir = tempdir().unwrap();
    let root = dir.path().to_path_buf();
    let (event_tx, events) = mpsc::channel(64);
    let (error_tx, errors) = mpsc::channel(4);
    let state = Arc::new(Mutex::new(ObserverState::Idle));
    let cancel = CancellationToken::new();
    let watcher = LocalWatcher::spawn(
        root.clone(),
        Arc::new(ExclusionSet::new(&[], true).unwrap()),
        quickxor_factory(),
        Duration::from_millis(50),
        event_tx,
        error_tx,
        Arc::clone(&state),
        Arc::new(AtomicU64::new(0)),
        cancel.clone(),
    );
    Fixture {
        root,
        _dir: dir,
        events,
        errors,
        state,
        cancel,
        watcher,
    }
}

async fn wait_for_watching(fx: &Fixture) {
    for _ in 0..100 {
        if *fx.state.lock() == ObserverState::Watching {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("watcher never reached Watching state");
}

#[tokio::test]
async fn emits_debounced_update_for_written_file() {
    let mut fx = spawn_fixture();
    wait_for_watching(&fx).await;

    std::fs::write(fx.root.join("a.txt"), b"hello").unwrap();

    let event = tokio::time::timeout(Duration::from_secs(5), fx.events.recv())
        .await
        .expect("timed out waiting for event")
        .expect("channel closed");
    assert_eq!(event.path.as_str(), "a.txt");
    assert!(!event.is_folder);
    assert_eq!(event.size, 5);
    assert!(event.hash.is_some());

    fx.cancel.cancel();
}

#[tokio::test]
async fn emits_delete_for_removed_file() {
    let mut fx = spawn_fixture();
    std::fs::write(fx.root.join("a.txt"), b"hello").unwrap();
    wait_for_watching(&fx).await;
    // Drain the create burst
    while tokio::time::timeout(Duration::from_millis(300), fx.events.recv())
        .await
        .ok()
        .flatten()
        .is_some()
    {}

    std::fs::remove_file(fx.root.join("a.txt")).unwrap();
    let mut saw_delete = false;
    for _ in 0..10 {
        if let Ok(Some(event)) =
            tokio::time::timeout(Duration::from_secs(1), fx.events.recv()).await
        {
            if event.kind == ChangeKind::Delete && event.path.as_str() == "a.txt" {
                saw_delete = true;
                break;
            }
        }
    }
    assert!(saw_delete);
    fx.cancel.cancel();
}

#[tokio::test]
async fn excluded_paths_are_not_reported() {
    let mut fx = spawn_fixture();
    wait_for_watching(&fx).await;

    std::fs::write(fx.root.join("skip.tmp"), b"x").unwrap();
    std::fs::write(fx.root.join("keep.txt"), b"x").unwrap();

    let event = tokio::time::timeout(Duration::from_secs(5), fx.events.recv())
        .await
        .expect("timed out")
        .expect("closed");
    assert_eq!(event.path.as_str(), "keep.txt");
    fx.cancel.cancel();
}

#[tokio::test]
async fn root_deletion_raises_distinguished_error() {
    let mut fx = spawn_fixture();
    wait_for_watching(&fx).await;

    std::fs::remove_dir_all(&fx.root).unwrap();

    let err = tokio::time::timeout(Duration::from_secs(5), fx.errors.recv())
        .await
        .expect("timed out waiting for error")
        .expect("channel closed");
    assert!(matches!(err, SyncError::SyncRootDeleted));
    fx.watcher.abort();
}

#[tokio::test]
async fn cancel_stops_the_loop() {
    let fx = spawn_fixture();
    wait_for_watching(&fx).await;
    fx.cancel.cancel();
    for _ in 0..100 {
        if *fx.state.lock() == ObserverState::Stopped {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("watcher did not stop after cancel");
}
