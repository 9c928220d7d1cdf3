// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The remote drive client trait

use crate::error::RemoteError;
use crate::types::{
    ContentRange, DeltaPage, DriveInfo, Identity, RemoteItem, UploadChunkResult, UploadSession,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use skiff_core::{DriveId, ItemId, SyncPath};

/// Operations the engine consumes from an authenticated remote.
///
/// Implementations classify failures into [`RemoteError`] variants; the
/// engine never sees transport detail. All methods take `&self`; the
/// transport owns its own connection pooling. Metadata calls carry a
/// 30 s request timeout; content transfers carry none.
#[async_trait]
pub trait RemoteClient: Send + Sync + 'static {
    // --- identity (read-only) ---
    async fn me(&self) -> Result<Identity, RemoteError>;
    async fn primary_drive(&self) -> Result<DriveInfo, RemoteError>;
    async fn drives(&self) -> Result<Vec<DriveInfo>, RemoteError>;
    async fn organization(&self) -> Result<Option<String>, RemoteError>;

    // --- metadata ---
    async fn get_item(&self, drive: &DriveId, id: &ItemId) -> Result<RemoteItem, RemoteError>;
    async fn get_item_by_path(
        &self,
        drive: &DriveId,
        path: &SyncPath,
    ) -> Result<RemoteItem, RemoteError>;
    async fn list_children(
        &self,
        drive: &DriveId,
        id: &ItemId,
    ) -> Result<Vec<RemoteItem>, RemoteError>;
    async fn create_folder(
        &self,
        drive: &DriveId,
        parent: &ItemId,
        name: &str,
    ) -> Result<RemoteItem, RemoteError>;
    async fn delete_item(
        &self,
        drive: &DriveId,
        id: &ItemId,
        permanent: bool,
    ) -> Result<(), RemoteError>;

    // --- downloads ---
    /// Stream the full content into `writer`.
    async fn download(
        &self,
        drive: &DriveId,
        id: &ItemId,
        writer: &mut (dyn tokio::io::AsyncWrite + Send + Unpin),
    ) -> Result<u64, RemoteError>;

    /// Stream content from `offset` to the end into `writer` (range resume).
    async fn download_range(
        &self,
        drive: &DriveId,
        id: &ItemId,
        writer: &mut (dyn tokio::io::AsyncWrite + Send + Unpin),
        offset: u64,
    ) -> Result<u64, RemoteError>;

    // --- uploads ---
    /// Simple single-PUT upload for small files.
    async fn upload_small(
        &self,
        drive: &DriveId,
        parent: &ItemId,
        name: &str,
        data: Vec<u8>,
        mtime: Option<DateTime<Utc>>,
    ) -> Result<RemoteItem, RemoteError>;

    /// Create a resumable upload session. `mtime` rides along in the
    /// session's fileSystemInfo so the server does not double-version.
    async fn create_upload_session(
        &self,
        drive: &DriveId,
        parent: &ItemId,
        name: &str,
        size: u64,
        mtime: Option<DateTime<Utc>>,
    ) -> Result<UploadSession, RemoteError>;

    /// PUT one chunk with its Content-Range.
    async fn upload_chunk(
        &self,
        session: &UploadSession,
        data: Vec<u8>,
        range: ContentRange,
    ) -> Result<UploadChunkResult, RemoteError>;

    /// Query next expected ranges (resume discovery after a 416).
    async fn query_upload_session(
        &self,
        session: &UploadSession,
    ) -> Result<Vec<std::ops::Range<u64>>, RemoteError>;

    /// Abandon a session. Callers treat this as fire-and-forget.
    async fn cancel_upload_session(&self, session: &UploadSession) -> Result<(), RemoteError>;

    // --- delta ---
    /// One page of the change feed. `cursor` is `None` for an initial sync;
    /// `prefer_alias` is the personal-account header toggle, applied to
    /// every request.
    async fn delta(
        &self,
        drive: &DriveId,
        cursor: Option<&str>,
        prefer_alias: bool,
    ) -> Result<DeltaPage, RemoteError>;

    /// Whether this remote supports the delta feed at all (national clouds
    /// do not; the observer falls back to recursive children traversal).
    fn supports_delta(&self) -> bool {
        true
    }
}
