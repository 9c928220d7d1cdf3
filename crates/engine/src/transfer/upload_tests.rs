// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use skiff_core::{hash_bytes, quickxor_factory, FakeClock, UPLOAD_QUANTUM};
use skiff_remote::{FakeRemote, Fault};
use tempfile::{tempdir, TempDir};

struct Fixture {
    remote: FakeRemote,
    drive: DriveId,
    root: TempDir,
    sessions_dir: TempDir,
    factory: skiff_core::HasherFactory,
    clock: FakeClock,
    cancel: CancellationToken,
}

impl Fixture {
    fn new() -> Self {
        Self {
            remote: FakeRemote::new("drv1"),
            drive: DriveId::new("drv1"),
            root: tempdir().unwrap(),
            sessions_dir: tempdir().unwrap(),
            factory: quickxor_factory(),
            clock: FakeClock::new(),
            cancel: CancellationToken::new(),
        }
    }

    fn sessions(&self) -> SessionStore {
        SessionStore::new(self.sessions_dir.path().join("sessions"))
    }

    fn write_local(&self, name: &str, data: &[u8]) -> Action {
        std::fs::write(self.root.path().join(name), data).unwrap();
        Action {
            id: 1,
            kind: ActionKind::Upload,
            path: SyncPath::new(name),
            item_id: None,
            parent_id: Some(ItemId::root()),
            size: data.len() as u64,
            remote_hash: None,
            remote_hash_kind: None,
            mtime: None,
            etag: None,
            resolution: None,
            depends_on: Vec::new(),
        }
    }

    fn uploader<'a>(&'a self, sessions: &'a SessionStore, chunk_size: u64) -> Uploader<'a, FakeRemote, FakeClock> {
        Uploader {
            remote: &self.remote,
            drive: &self.drive,
            sync_root: self.root.path(),
            hasher: &self.factory,
            sessions,
            chunk_size,
            clock: &self.clock,
            cancel: &self.cancel,
        }
    }
}

#[tokio::test]
async fn small_file_single_put() {
    let fx = Fixture::new();
    let sessions = fx.sessions();
    let action = fx.write_local("small.txt", b"tiny");

    let outcome = fx
        .uploader(&sessions, UPLOAD_QUANTUM)
        .upload(&action, ItemId::root())
        .await
        .unwrap();

    assert_eq!(outcome.kind, ActionKind::Upload);
    assert_eq!(fx.remote.file_content("small.txt").unwrap(), b"tiny");
    assert_eq!(
        outcome.content_hash.as_deref().unwrap(),
        hash_bytes(&fx.factory, b"tiny")
    );
    // No session was needed
    assert_eq!(fx.remote.open_session_count(), 0);
}

#[tokio::test]
async fn large_file_chunks_to_completion() {
    let fx = Fixture::new();
    let sessions = fx.sessions();
    let size = SIMPLE_UPLOAD_LIMIT + 3 * UPLOAD_QUANTUM;
    let data = vec![0xabu8; size as usize];
    let action = fx.write_local("big.bin", &data);

    let outcome = fx
        .uploader(&sessions, UPLOAD_QUANTUM)
        .upload(&action, ItemId::root())
        .await
        .unwrap();

    assert_eq!(outcome.size, size);
    assert_eq!(fx.remote.file_content("big.bin").unwrap(), data);
    // Session record is removed on success
    assert!(sessions.load(&fx.drive, &SyncPath::new("big.bin")).is_none());
    assert_eq!(fx.remote.open_session_count(), 0);
}

#[tokio::test]
async fn session_persists_before_first_chunk_and_resumes() {
    let fx = Fixture::new();
    let sessions = fx.sessions();
    let size = SIMPLE_UPLOAD_LIMIT + 2 * UPLOAD_QUANTUM;
    let data = vec![0x5au8; size as usize];
    let action = fx.write_local("big.bin", &data);

    // Cancel after the session is created: simulate by canceling now and
    // letting the loop observe it before the first chunk.
    fx.cancel.cancel();
    let err = fx
        .uploader(&sessions, UPLOAD_QUANTUM)
        .upload(&action, ItemId::root())
        .await;
    assert!(matches!(err, Err(SyncError::ContextCanceled)));
    // The record survived for resume
    let record = sessions.load(&fx.drive, &SyncPath::new("big.bin")).unwrap();
    assert_eq!(record.file_size, size);
    assert_eq!(record.local_file_hash, hash_bytes(&fx.factory, &data));

    // A fresh run (new cancel token) resumes the persisted session
    let fx2 = Uploader {
        remote: &fx.remote,
        drive: &fx.drive,
        sync_root: fx.root.path(),
        hasher: &fx.factory,
        sessions: &sessions,
        chunk_size: UPLOAD_QUANTUM,
        clock: &fx.clock,
        cancel: &CancellationToken::new(),
    };
    let outcome = fx2.upload(&action, ItemId::root()).await.unwrap();
    assert_eq!(outcome.size, size);
    assert_eq!(fx.remote.file_content("big.bin").unwrap(), data);
    assert!(sessions.load(&fx.drive, &SyncPath::new("big.bin")).is_none());
}

#[tokio::test]
async fn stale_session_with_changed_content_is_discarded() {
    let fx = Fixture::new();
    let sessions = fx.sessions();
    let size = SIMPLE_UPLOAD_LIMIT + UPLOAD_QUANTUM;
    let old = vec![1u8; size as usize];
    let action = fx.write_local("big.bin", &old);

    // Persist a session keyed to different content
    let created = remote_session(&fx, size).await;
    sessions
        .save(&SessionRecord {
            drive_id: fx.drive.clone(),
            remote_path: SyncPath::new("big.bin"),
            session: created,
            local_file_hash: "ZGlmZmVyZW50".to_string(),
            file_size: size,
            created_at_ms: 1,
        })
        .unwrap();

    let outcome = fx
        .uploader(&sessions, UPLOAD_QUANTUM)
        .upload(&action, ItemId::root())
        .await
        .unwrap();
    assert_eq!(fx.remote.file_content("big.bin").unwrap(), old);
    assert!(outcome.hash_verified);
    // The mismatched session was canceled remotely
    assert_eq!(fx.remote.open_session_count(), 0);
}

#[tokio::test]
async fn session_expiry_recreates_once() {
    let fx = Fixture::new();
    let sessions = fx.sessions();
    let size = SIMPLE_UPLOAD_LIMIT + 2 * UPLOAD_QUANTUM;
    let data = vec![9u8; size as usize];
    let action = fx.write_local("big.bin", &data);

    fx.remote.inject(Fault::SessionExpired);
    let outcome = fx
        .uploader(&sessions, UPLOAD_QUANTUM)
        .upload(&action, ItemId::root())
        .await
        .unwrap();
    assert_eq!(outcome.size, size);
    assert_eq!(fx.remote.file_content("big.bin").unwrap(), data);
}

async fn remote_session(fx: &Fixture, size: u64) -> UploadSession {
    fx.remote
        .create_upload_session(&fx.drive, &ItemId::root(), "big.bin", size, None)
        .await
        .unwrap()
}
