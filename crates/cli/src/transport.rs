// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Remote transport acquisition
//!
//! Token acquisition and the HTTP client live in the auth component, not
//! here. A build without one is simply not logged in: every remote call
//! answers `NotLoggedIn`, which surfaces as a configuration error with a
//! pointer at the missing piece.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use skiff_core::{DriveId, ItemId, SyncPath};
use skiff_remote::{
    ContentRange, DeltaPage, DriveInfo, Identity, RemoteClient, RemoteError, RemoteItem,
    UploadChunkResult, UploadSession,
};

/// Placeholder client used when no authenticated transport is wired in.
pub struct UnauthenticatedRemote;

impl UnauthenticatedRemote {
    fn refuse<T>() -> Result<T, RemoteError> {
        Err(RemoteError::NotLoggedIn)
    }
}

#[async_trait]
impl RemoteClient for UnauthenticatedRemote {
    async fn me(&self) -> Result<Identity, RemoteError> {
        Self::refuse()
    }
    async fn primary_drive(&self) -> Result<DriveInfo, RemoteError> {
        Self::refuse()
    }
    async fn drives(&self) -> Result<Vec<DriveInfo>, RemoteError> {
        Self::refuse()
    }
    async fn organization(&self) -> Result<Option<String>, RemoteError> {
        Self::refuse()
    }
    async fn get_item(&self, _: &DriveId, _: &ItemId) -> Result<RemoteItem, RemoteError> {
        Self::refuse()
    }
    async fn get_item_by_path(
        &self,
        _: &DriveId,
        _: &SyncPath,
    ) -> Result<RemoteItem, RemoteError> {
        Self::refuse()
    }
    async fn list_children(
        &self,
        _: &DriveId,
        _: &ItemId,
    ) -> Result<Vec<RemoteItem>, RemoteError> {
        Self::refuse()
    }
    async fn create_folder(
        &self,
        _: &DriveId,
        _: &ItemId,
        _: &str,
    ) -> Result<RemoteItem, RemoteError> {
        Self::refuse()
    }
    async fn delete_item(&self, _: &DriveId, _: &ItemId, _: bool) -> Result<(), RemoteError> {
        Self::refuse()
    }
    async fn download(
        &self,
        _: &DriveId,
        _: &ItemId,
        _: &mut (dyn tokio::io::AsyncWrite + Send + Unpin),
    ) -> Result<u64, RemoteError> {
        Self::refuse()
    }
    async fn download_range(
        &self,
        _: &DriveId,
        _: &ItemId,
        _: &mut (dyn tokio::io::AsyncWrite + Send + Unpin),
        _: u64,
    ) -> Result<u64, RemoteError> {
        Self::refuse()
    }
    async fn upload_small(
        &self,
        _: &DriveId,
        _: &ItemId,
        _: &str,
        _: Vec<u8>,
        _: Option<DateTime<Utc>>,
    ) -> Result<RemoteItem, RemoteError> {
        Self::refuse()
    }
    async fn create_upload_session(
        &self,
        _: &DriveId,
        _: &ItemId,
        _: &str,
        _: u64,
        _: Option<DateTime<Utc>>,
    ) -> Result<UploadSession, RemoteError> {
        Self::refuse()
    }
    async fn upload_chunk(
        &self,
        _: &UploadSession,
        _: Vec<u8>,
        _: ContentRange,
    ) -> Result<UploadChunkResult, RemoteError> {
        Self::refuse()
    }
    async fn query_upload_session(
        &self,
        _: &UploadSession,
    ) -> Result<Vec<std::ops::Range<u64>>, RemoteError> {
        Self::refuse()
    }
    async fn cancel_upload_session(&self, _: &UploadSession) -> Result<(), RemoteError> {
        Self::refuse()
    }
    async fn delta(
        &self,
        _: &DriveId,
        _: Option<&str>,
        _: bool,
    ) -> Result<DeltaPage, RemoteError> {
        Self::refuse()
    }
}
