// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Resumable downloads
//!
//! Bytes stream into a sibling `.partial` file (mode 0600). A non-empty
//! partial resumes with a byte-range request; any range failure truncates
//! and restarts. The partial is renamed over the target (same directory)
//! only after hash verification; a canceled cycle leaves the partial in
//! place for the next run.

use chrono::{DateTime, Utc};
use skiff_core::{
    Action, ActionKind, DriveId, HasherFactory, Outcome, SyncError, PARTIAL_SUFFIX,
};
use skiff_remote::{RemoteClient, RemoteError};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

const HASH_RETRIES: u32 = 3;

pub struct Downloader<'a, R> {
    pub remote: &'a R,
    pub drive: &'a DriveId,
    pub sync_root: &'a Path,
    pub hasher: &'a HasherFactory,
    pub cancel: &'a CancellationToken,
}

/// Partial sibling path for a target file.
pub fn partial_path(target: &Path) -> PathBuf {
    let mut name = target
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(PARTIAL_SUFFIX);
    target.with_file_name(name)
}

impl<'a, R: RemoteClient> Downloader<'a, R> {
    /// Execute one download action to completion.
    pub async fn download(&self, action: &Action) -> Result<Outcome, SyncError> {
        let item_id = action
            .item_id
            .clone()
            .ok_or_else(|| SyncError::PermanentRemote("download without item id".into()))?;
        let target = action.path.to_fs(self.sync_root);
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| SyncError::LocalIo {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
        }
        let partial = partial_path(&target);

        let mut verified = false;
        let mut actual_hash = String::new();
        for attempt in 1..=HASH_RETRIES {
            if self.cancel.is_cancelled() {
                return Err(SyncError::ContextCanceled);
            }
            self.fetch_into_partial(&item_id, &partial).await?;
            actual_hash = self.hash_file(&partial).await?;

            match &action.remote_hash {
                Some(expected) if expected != &actual_hash => {
                    tracing::warn!(
                        path = %action.path,
                        attempt,
                        "download hash mismatch; discarding partial"
                    );
                    if attempt < HASH_RETRIES {
                        // Preserve the partial on cancel for later resume.
                        if !self.cancel.is_cancelled() {
                            let _ = tokio::fs::remove_file(&partial).await;
                        }
                        continue;
                    }
                    // Last attempt: surface a verified-failure outcome.
                }
                _ => verified = true,
            }
            break;
        }

        // Atomic same-directory rename after (attempted) verification.
        tokio::fs::rename(&partial, &target)
            .await
            .map_err(|e| SyncError::LocalIo {
                path: target.clone(),
                source: e,
            })?;
        restrict_permissions(&target).await;

        let meta = tokio::fs::metadata(&target)
            .await
            .map_err(|e| SyncError::LocalIo {
                path: target.clone(),
                source: e,
            })?;
        let mtime_local: Option<DateTime<Utc>> =
            meta.modified().ok().map(DateTime::<Utc>::from);

        if !verified {
            tracing::error!(path = %action.path, "download failed hash verification");
        }
        Ok(Outcome {
            kind: ActionKind::Download,
            path: action.path.clone(),
            item_id: Some(item_id),
            parent_id: action.parent_id.clone(),
            name: action.path.name().to_string(),
            is_folder: false,
            size: meta.len(),
            content_hash: Some(actual_hash),
            hash_kind: action
                .remote_hash_kind
                .or(Some(self.hasher_kind())),
            hash_verified: verified,
            mtime_local,
            mtime_remote: action.mtime,
            etag: action.etag.clone(),
            resolved_conflict: None,
        })
    }

    fn hasher_kind(&self) -> skiff_core::HashKind {
        (self.hasher)().kind()
    }

    /// Fill the partial from the remote, resuming from its current size.
    async fn fetch_into_partial(
        &self,
        item_id: &skiff_core::ItemId,
        partial: &Path,
    ) -> Result<(), SyncError> {
        let existing = tokio::fs::metadata(partial).await.map(|m| m.len()).unwrap_or(0);

        if existing > 0 {
            tracing::debug!(offset = existing, partial = %partial.display(), "resuming download");
            let mut file = open_partial(partial, true).await?;
            match self
                .remote
                .download_range(self.drive, item_id, &mut file, existing)
                .await
            {
                Ok(_) => return Ok(()),
                Err(RemoteError::RangeNotSatisfiable) | Err(RemoteError::Transient(_)) => {
                    // Truncate and restart below.
                    tracing::debug!(partial = %partial.display(), "range resume failed; restarting");
                }
                Err(e) => return Err(e.into()),
            }
        }

        let mut file = open_partial(partial, false).await?;
        self.remote
            .download(self.drive, item_id, &mut file)
            .await
            .map_err(SyncError::from)?;
        Ok(())
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

async fn open_partial(path: &Path, append: bool) -> Result<tokio::fs::File, SyncError> {
    let mut options = tokio::fs::OpenOptions::new();
    options.create(true).write(true);
    if append {
        options.append(true);
    } else {
        options.truncate(true);
    }
    #[cfg(unix)]
    options.mode(0o600);
    options.open(path).await.map_err(|e| SyncError::LocalIo {
        path: path.to_path_buf(),
        source: e,
    })
}

#[cfg(unix)]
async fn restrict_permissions(path: &Path) {
    use std::os::unix::fs::PermissionsExt;
    let _ = tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600)).await;
}

#[cfg(not(unix))]
async fn restrict_permissions(_path: &Path) {}

#[cfg(test)]
#[path = "download_tests.rs"]
mod tests;
