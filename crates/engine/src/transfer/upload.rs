// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Simple and chunked uploads
//!
//! Files at or under 4 MiB go up in a single PUT. Larger files use a
//! resumable session: chunks are multiples of the 320 KiB server quantum,
//! the session URL and local file hash persist in the session store
//! before the first chunk, and a 416 resumes from the server's next
//! expected range instead of restarting. Cancellation between chunks
//! leaves a valid session behind for the next run.

use chrono::{DateTime, Utc};
use skiff_core::{
    Action, ActionKind, Clock, DriveId, HasherFactory, ItemId, Outcome, SyncError, SyncPath,
    SIMPLE_UPLOAD_LIMIT,
};
use skiff_remote::{
    with_retry, ContentRange, RemoteClient, RemoteError, RetryPolicy, UploadChunkResult,
    UploadSession,
};
use skiff_store::{SessionRecord, SessionStore};
use std::io::SeekFrom;
use std::path::Path;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio_util::sync::CancellationToken;

pub struct Uploader<'a, R, C: Clock> {
    pub remote: &'a R,
    pub drive: &'a DriveId,
    pub sync_root: &'a Path,
    pub hasher: &'a HasherFactory,
    pub sessions: &'a SessionStore,
    pub chunk_size: u64,
    pub clock: &'a C,
    pub cancel: &'a CancellationToken,
}

impl<'a, R: RemoteClient, C: Clock> Uploader<'a, R, C> {
    /// Execute one upload action: hash, pick simple vs chunked, verify.
    pub async fn upload(&self, action: &Action, parent: ItemId) -> Result<Outcome, SyncError> {
        let local = action.path.to_fs(self.sync_root);
        let meta = tokio::fs::metadata(&local)
            .await
            .map_err(|e| SyncError::LocalIo {
                path: local.clone(),
                source: e,
            })?;
        let size = meta.len();
        let mtime_local: Option<DateTime<Utc>> =
            meta.modified().ok().map(DateTime::<Utc>::from);
        let local_hash = self.hash_file(&local).await?;
        let hash_kind = (self.hasher)().kind();

        let item = if size <= SIMPLE_UPLOAD_LIMIT {
            let data = tokio::fs::read(&local)
                .await
                .map_err(|e| SyncError::LocalIo {
                    path: local.clone(),
                    source: e,
                })?;
            let name = action.path.name().to_string();
            with_retry(RetryPolicy::default(), "upload_small", || {
                let data = data.clone();
                let name = name.clone();
                let parent = parent.clone();
                async move {
                    self.remote
                        .upload_small(self.drive, &parent, &name, data, mtime_local)
                        .await
                }
            })
            .await
            .map_err(SyncError::from)?
        } else {
            self.upload_chunked(action, &parent, &local, size, &local_hash, mtime_local)
                .await?
        };

        // Verify against the server's recorded hash when comparable.
        if let Some(remote_hash) = &item.quickxor_hash {
            if hash_kind == skiff_core::HashKind::QuickXor && remote_hash != &local_hash {
                return Err(SyncError::HashMismatch {
                    path: action.path.clone(),
                    expected: local_hash,
                    actual: remote_hash.clone(),
                });
            }
        }

        Ok(Outcome {
            kind: ActionKind::Upload,
            path: action.path.clone(),
            item_id: Some(item.id.clone()),
            parent_id: Some(parent),
            name: action.path.name().to_string(),
            is_folder: false,
            size,
            content_hash: Some(local_hash),
            hash_kind: Some(hash_kind),
            hash_verified: true,
            mtime_local,
            mtime_remote: item.mtime,
            etag: item.etag.clone(),
            resolved_conflict: None,
        })
    }

    async fn upload_chunked(
        &self,
        action: &Action,
        parent: &ItemId,
        local: &Path,
        size: u64,
        local_hash: &str,
        mtime: Option<DateTime<Utc>>,
    ) -> Result<skiff_remote::RemoteItem, SyncError> {
        let (session, mut offset) = self
            .resume_or_create_session(&action.path, parent, action.path.name(), size, local_hash, mtime)
            .await?;

        let mut file = tokio::fs::File::open(local)
            .await
            .map_err(|e| SyncError::LocalIo {
                path: local.to_path_buf(),
                source: e,
            })?;
        let mut session = session;
        let mut recreated = false;

        loop {
            if self.cancel.is_cancelled() {
                // The chunk loop checks between chunks; the persisted
                // session stays valid for resume.
                return Err(SyncError::ContextCanceled);
            }
            if offset >= size {
                // Chunk accounting drifted; ask the server where we are.
                offset = self.query_resume_point(&session, size).await?;
            }
            let len = self.chunk_size.min(size - offset);
            let mut buf = vec![0u8; len as usize];
            file.seek(SeekFrom::Start(offset))
                .await
                .map_err(|e| SyncError::LocalIo {
                    path: local.to_path_buf(),
                    source: e,
                })?;
            file.read_exact(&mut buf)
                .await
                .map_err(|e| SyncError::LocalIo {
                    path: local.to_path_buf(),
                    source: e,
                })?;
            let range = ContentRange {
                start: offset,
                end: offset + len - 1,
                total: size,
            };

            let put = with_retry(RetryPolicy::default(), "upload_chunk", || {
                let buf = buf.clone();
                let session = session.clone();
                async move { self.remote.upload_chunk(&session, buf, range).await }
            })
            .await;

            match put {
                Ok(UploadChunkResult::Accepted) => {
                    tracing::debug!(path = %action.path, sent = range.end + 1, total = size, "chunk accepted");
                    offset = range.end + 1;
                }
                Ok(UploadChunkResult::Complete(item)) => {
                    self.sessions.delete(self.drive, &action.path);
                    return Ok(*item);
                }
                Err(RemoteError::RangeNotSatisfiable) => {
                    // Query the status URL and resume from what the
                    // server actually has, never from zero.
                    offset = self.query_resume_point(&session, size).await?;
                    tracing::debug!(path = %action.path, offset, "resuming after 416");
                }
                Err(RemoteError::UploadSessionExpired) if !recreated => {
                    tracing::info!(path = %action.path, "upload session expired; recreating");
                    self.sessions.delete(self.drive, &action.path);
                    let fresh = self
                        .create_session(&action.path, parent, action.path.name(), size, local_hash, mtime)
                        .await?;
                    session = fresh;
                    offset = 0;
                    recreated = true;
                }
                Err(e) => {
                    if matches!(e, RemoteError::UploadSessionExpired) {
                        self.sessions.delete(self.drive, &action.path);
                    }
                    return Err(e.into());
                }
            }
        }
    }

    /// Load a persisted session if it still matches the local file,
    /// otherwise cancel the stale one and start fresh.
    async fn resume_or_create_session(
        &self,
        path: &SyncPath,
        parent: &ItemId,
        name: &str,
        size: u64,
        local_hash: &str,
        mtime: Option<DateTime<Utc>>,
    ) -> Result<(UploadSession, u64), SyncError> {
        if let Some(record) = self.sessions.load(self.drive, path) {
            if record.local_file_hash == local_hash && record.file_size == size {
                match self.query_resume_point(&record.session, size).await {
                    Ok(offset) => {
                        tracing::info!(path = %path, offset, "resuming persisted upload session");
                        return Ok((record.session, offset));
                    }
                    Err(SyncError::UploadSessionExpired) => {
                        self.sessions.delete(self.drive, path);
                    }
                    Err(e) => return Err(e),
                }
            } else {
                // Content changed since the session was created.
                tracing::debug!(path = %path, "persisted session no longer matches; discarding");
                let _ = self.remote.cancel_upload_session(&record.session).await;
                self.sessions.delete(self.drive, path);
            }
        }
        let session = self
            .create_session(path, parent, name, size, local_hash, mtime)
            .await?;
        Ok((session, 0))
    }

    async fn create_session(
        &self,
        path: &SyncPath,
        parent: &ItemId,
        name: &str,
        size: u64,
        local_hash: &str,
        mtime: Option<DateTime<Utc>>,
    ) -> Result<UploadSession, SyncError> {
        let session = with_retry(RetryPolicy::default(), "create_upload_session", || async {
            self.remote
                .create_upload_session(self.drive, parent, name, size, mtime)
                .await
        })
        .await
        .map_err(SyncError::from)?;

        // Persist before the first chunk so a crash can resume.
        let record = SessionRecord {
            drive_id: self.drive.clone(),
            remote_path: path.clone(),
            session: session.clone(),
            local_file_hash: local_hash.to_string(),
            file_size: size,
            created_at_ms: self.clock.epoch_ms(),
        };
        self.sessions
            .save(&record)
            .map_err(|e| SyncError::Storage(format!("session save failed: {e}")))?;
        Ok(session)
    }

    async fn query_resume_point(
        &self,
        session: &UploadSession,
        size: u64,
    ) -> Result<u64, SyncError> {
        let ranges = self
            .remote
            .query_upload_session(session)
            .await
            .map_err(SyncError::from)?;
        Ok(ranges.first().map(|r| r.start).unwrap_or(size))
    }

    async fn hash_file(&self, path: &Path) -> Result<String, SyncError> {
        let factory = Arc::clone(self.hasher);
        let path_buf = path.to_path_buf();
        tokio::task::spawn_blocking(move || -> std::io::Result<String> {
            use std::io::Read;
            let mut hasher = factory();
            let mut file = std::fs::File::open(&path_buf)?;
            let mut buf = vec![0u8; 64 * 1024];
            loop {
                let n = file.read(&mut buf)?;
                if n == 0 {
                    break;
                }
                hasher.update(&buf[..n]);
            }
            Ok(hasher.finalize())
        })
        .await
        .map_err(|e| SyncError::TransientNetwork(e.to_string()))?
        .map_err(|e| SyncError::LocalIo {
            path: path.to_path_buf(),
            source: e,
        })
    }
}

#[cfg(test)]
#[path = "upload_tests.rs"]
mod tests;
