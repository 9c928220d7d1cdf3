// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory remote drive for tests
//!
//! Implements [`RemoteClient`] over a mutex-guarded tree with a change log
//! driving the delta feed. Fault injection covers the failure modes the
//! engine must survive: cursor expiry, throttling, transient network
//! errors, 416 on chunk upload, and session expiry.

use crate::client::RemoteClient;
use crate::error::RemoteError;
use crate::types::{
    ContentRange, DeltaPage, DriveInfo, Identity, RemoteItem, SessionUrl, UploadChunkResult,
    UploadSession,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use skiff_core::{hash_bytes, quickxor_factory, DriveId, ItemId, SyncPath};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::time::Duration;
use tokio::io::AsyncWriteExt;

/// Injectable failures, consumed one per matching operation.
#[derive(Debug, Clone)]
pub enum Fault {
    /// Next delta call with a cursor reports expiry.
    CursorExpired,
    /// Next delta call is throttled with the given hint.
    Throttled(Option<Duration>),
    /// Next delta call fails transiently.
    TransientDelta,
    /// Next chunk PUT returns 416.
    ChunkRangeNotSatisfiable,
    /// Next chunk PUT reports an expired session.
    SessionExpired,
    /// Next download fails transiently mid-stream after `n` bytes.
    DownloadInterrupt(u64),
}

#[derive(Debug, Clone)]
struct FakeItem {
    item: RemoteItem,
}

#[derive(Debug)]
struct SessionState {
    parent: ItemId,
    name: String,
    size: u64,
    mtime: Option<DateTime<Utc>>,
    /// Next expected offset; chunks must arrive in order.
    received: u64,
    buffer: Vec<u8>,
}

struct Inner {
    drive: DriveInfo,
    identity: Identity,
    items: HashMap<ItemId, FakeItem>,
    /// Children by parent id, keyed by name so listings are stable.
    children: HashMap<ItemId, BTreeMap<String, ItemId>>,
    contents: HashMap<ItemId, Vec<u8>>,
    /// Change log; a cursor is an index into this log.
    log: Vec<RemoteItem>,
    sessions: HashMap<String, SessionState>,
    faults: VecDeque<Fault>,
    next_id: u64,
    next_session: u64,
    supports_delta: bool,
    page_size: usize,
}

/// Shared in-memory drive.
pub struct FakeRemote {
    inner: Mutex<Inner>,
}

impl FakeRemote {
    pub fn new(drive_id: &str) -> Self {
        let drive = DriveInfo {
            id: DriveId::new(drive_id),
            drive_type: "personal".to_string(),
            owner_email: Some("tester@example.com".to_string()),
            quota_total: 1 << 40,
            quota_used: 0,
        };
        let identity = Identity {
            id: "user-1".to_string(),
            display_name: "Tester".to_string(),
            email: Some("tester@example.com".to_string()),
        };
        let mut children = HashMap::new();
        children.insert(ItemId::root(), BTreeMap::new());
        Self {
            inner: Mutex::new(Inner {
                drive,
                identity,
                items: HashMap::new(),
                children,
                contents: HashMap::new(),
                log: Vec::new(),
                sessions: HashMap::new(),
                faults: VecDeque::new(),
                next_id: 0,
                next_session: 0,
                supports_delta: true,
                page_size: 200,
            }),
        }
    }

    /// Queue a fault for the next matching operation.
    pub fn inject(&self, fault: Fault) {
        self.inner.lock().faults.push_back(fault);
    }

    pub fn set_supports_delta(&self, supported: bool) {
        self.inner.lock().supports_delta = supported;
    }

    pub fn set_page_size(&self, n: usize) {
        self.inner.lock().page_size = n;
    }

    /// Seed or replace a file by path, creating parent folders.
    pub fn seed_file(&self, path: &str, data: &[u8]) -> ItemId {
        let mut inner = self.inner.lock();
        let path = SyncPath::new(path);
        let parent = inner.ensure_folders(&path.parent().unwrap_or_default());
        inner.put_file(&parent, path.name(), data.to_vec(), Some(Utc::now()))
    }

    /// Seed a folder by path.
    pub fn seed_folder(&self, path: &str) -> ItemId {
        let mut inner = self.inner.lock();
        let path = SyncPath::new(path);
        inner.ensure_folders(&path)
    }

    /// Delete by path (recursive, with tombstones for every descendant).
    pub fn seed_delete(&self, path: &str) {
        let mut inner = self.inner.lock();
        if let Some(id) = inner.resolve(&SyncPath::new(path)) {
            inner.delete_recursive(&id);
        }
    }

    /// Current content of a file by path, for assertions.
    pub fn file_content(&self, path: &str) -> Option<Vec<u8>> {
        let inner = self.inner.lock();
        let id = inner.resolve(&SyncPath::new(path))?;
        inner.contents.get(&id).cloned()
    }

    /// Current item by path, for assertions.
    pub fn item_by_path(&self, path: &str) -> Option<RemoteItem> {
        let inner = self.inner.lock();
        let id = inner.resolve(&SyncPath::new(path))?;
        inner.items.get(&id).map(|f| f.item.clone())
    }

    /// Count of live (non-deleted) items.
    pub fn live_item_count(&self) -> usize {
        self.inner
            .lock()
            .items
            .values()
            .filter(|f| !f.item.deleted)
            .count()
    }

    /// Number of open upload sessions.
    pub fn open_session_count(&self) -> usize {
        self.inner.lock().sessions.len()
    }

    fn take_fault(&self, matches: impl Fn(&Fault) -> bool) -> Option<Fault> {
        let mut inner = self.inner.lock();
        if let Some(front) = inner.faults.front() {
            if matches(front) {
                return inner.faults.pop_front();
            }
        }
        None
    }
}

impl Inner {
    fn alloc_id(&mut self) -> ItemId {
        self.next_id += 1;
        ItemId::new(format!("fid-{}", self.next_id))
    }

    fn resolve(&self, path: &SyncPath) -> Option<ItemId> {
        if path.is_root() {
            return Some(ItemId::root());
        }
        let mut current = ItemId::root();
        for seg in path.as_str().split('/') {
            current = self.children.get(&current)?.get(seg)?.clone();
        }
        Some(current)
    }

    fn ensure_folders(&mut self, path: &SyncPath) -> ItemId {
        if path.is_root() {
            return ItemId::root();
        }
        let mut current = ItemId::root();
        for seg in path.as_str().split('/') {
            let existing = self
                .children
                .get(&current)
                .and_then(|m| m.get(seg))
                .cloned();
            current = match existing {
                Some(id) => id,
                None => {
                    let id = self.alloc_id();
                    let item = RemoteItem {
                        id: id.clone(),
                        parent_id: Some(current.clone()),
                        name: seg.to_string(),
                        is_folder: true,
                        is_package: false,
                        deleted: false,
                        size: 0,
                        etag: Some(format!("etag-{}", self.next_id)),
                        mtime: Some(Utc::now()),
                        quickxor_hash: None,
                        sha256_hash: None,
                    };
                    self.items.insert(id.clone(), FakeItem { item: item.clone() });
                    self.children
                        .entry(current.clone())
                        .or_default()
                        .insert(seg.to_string(), id.clone());
                    self.children.entry(id.clone()).or_default();
                    self.log.push(item);
                    id
                }
            };
        }
        current
    }

    fn put_file(
        &mut self,
        parent: &ItemId,
        name: &str,
        data: Vec<u8>,
        mtime: Option<DateTime<Utc>>,
    ) -> ItemId {
        let hash = hash_bytes(&quickxor_factory(), &data);
        let existing = self
            .children
            .get(parent)
            .and_then(|m| m.get(name))
            .cloned();
        let id = existing.unwrap_or_else(|| self.alloc_id());
        let etag_seq = self.log.len() + 1;
        let item = RemoteItem {
            id: id.clone(),
            parent_id: Some(parent.clone()),
            name: name.to_string(),
            is_folder: false,
            is_package: false,
            deleted: false,
            size: data.len() as u64,
            etag: Some(format!("etag-{}", etag_seq)),
            mtime: mtime.or_else(|| Some(Utc::now())),
            quickxor_hash: Some(hash),
            sha256_hash: None,
        };
        self.items.insert(id.clone(), FakeItem { item: item.clone() });
        self.contents.insert(id.clone(), data);
        self.children
            .entry(parent.clone())
            .or_default()
            .insert(name.to_string(), id.clone());
        self.log.push(item);
        id
    }

    fn delete_recursive(&mut self, id: &ItemId) {
        // Children first so deletions appear bottom-up in the log.
        let child_ids: Vec<ItemId> = self
            .children
            .get(id)
            .map(|m| m.values().cloned().collect())
            .unwrap_or_default();
        for child in child_ids {
            self.delete_recursive(&child);
        }
        if let Some(fake) = self.items.get_mut(id) {
            if fake.item.deleted {
                return;
            }
            fake.item.deleted = true;
            // The feed is known to return bogus hashes on tombstones.
            let mut tombstone = fake.item.clone();
            tombstone.quickxor_hash = Some("Ym9ndXM=".to_string());
            if let Some(parent) = tombstone.parent_id.clone() {
                if let Some(m) = self.children.get_mut(&parent) {
                    m.retain(|_, v| v != id);
                }
            }
            self.contents.remove(id);
            self.log.push(tombstone);
        }
    }

    /// All live items in path order, for initial syncs and children walks.
    fn live_items_sorted(&self) -> Vec<RemoteItem> {
        let mut out = Vec::new();
        let mut stack = vec![ItemId::root()];
        while let Some(id) = stack.pop() {
            if let Some(children) = self.children.get(&id) {
                // Reverse so the BTreeMap order is preserved through the stack.
                for child_id in children.values().rev() {
                    if let Some(fake) = self.items.get(child_id) {
                        if !fake.item.deleted {
                            out.push(fake.item.clone());
                            if fake.item.is_folder {
                                stack.push(child_id.clone());
                            }
                        }
                    }
                }
            }
        }
        out
    }
}

fn parse_cursor(cursor: &str) -> Result<usize, RemoteError> {
    cursor
        .strip_prefix('c')
        .and_then(|s| s.parse::<usize>().ok())
        .ok_or_else(|| RemoteError::Permanent(format!("malformed cursor {cursor}")))
}

#[async_trait]
impl RemoteClient for FakeRemote {
    async fn me(&self) -> Result<Identity, RemoteError> {
        Ok(self.inner.lock().identity.clone())
    }

    async fn primary_drive(&self) -> Result<DriveInfo, RemoteError> {
        Ok(self.inner.lock().drive.clone())
    }

    async fn drives(&self) -> Result<Vec<DriveInfo>, RemoteError> {
        Ok(vec![self.inner.lock().drive.clone()])
    }

    async fn organization(&self) -> Result<Option<String>, RemoteError> {
        Ok(None)
    }

    async fn get_item(&self, _drive: &DriveId, id: &ItemId) -> Result<RemoteItem, RemoteError> {
        self.inner
            .lock()
            .items
            .get(id)
            .map(|f| f.item.clone())
            .ok_or(RemoteError::NotFound)
    }

    async fn get_item_by_path(
        &self,
        _drive: &DriveId,
        path: &SyncPath,
    ) -> Result<RemoteItem, RemoteError> {
        let inner = self.inner.lock();
        let id = inner.resolve(path).ok_or(RemoteError::NotFound)?;
        inner
            .items
            .get(&id)
            .map(|f| f.item.clone())
            .ok_or(RemoteError::NotFound)
    }

    async fn list_children(
        &self,
        _drive: &DriveId,
        id: &ItemId,
    ) -> Result<Vec<RemoteItem>, RemoteError> {
        let inner = self.inner.lock();
        let children = inner.children.get(id).ok_or(RemoteError::NotFound)?;
        Ok(children
            .values()
            .filter_map(|cid| inner.items.get(cid))
            .filter(|f| !f.item.deleted)
            .map(|f| f.item.clone())
            .collect())
    }

    async fn create_folder(
        &self,
        _drive: &DriveId,
        parent: &ItemId,
        name: &str,
    ) -> Result<RemoteItem, RemoteError> {
        let mut inner = self.inner.lock();
        if let Some(existing) = inner.children.get(parent).and_then(|m| m.get(name)).cloned() {
            let item = inner
                .items
                .get(&existing)
                .map(|f| f.item.clone())
                .ok_or(RemoteError::NotFound)?;
            if item.is_folder {
                return Ok(item);
            }
            return Err(RemoteError::Conflict(format!(
                "{name} exists and is not a folder"
            )));
        }
        if !inner.children.contains_key(parent) {
            return Err(RemoteError::NotFound);
        }
        let id = inner.alloc_id();
        let item = RemoteItem {
            id: id.clone(),
            parent_id: Some(parent.clone()),
            name: name.to_string(),
            is_folder: true,
            is_package: false,
            deleted: false,
            size: 0,
            etag: Some(format!("etag-{}", inner.next_id)),
            mtime: Some(Utc::now()),
            quickxor_hash: None,
            sha256_hash: None,
        };
        inner.items.insert(id.clone(), FakeItem { item: item.clone() });
        inner
            .children
            .entry(parent.clone())
            .or_default()
            .insert(name.to_string(), id.clone());
        inner.children.entry(id.clone()).or_default();
        inner.log.push(item.clone());
        Ok(item)
    }

    async fn delete_item(
        &self,
        _drive: &DriveId,
        id: &ItemId,
        _permanent: bool,
    ) -> Result<(), RemoteError> {
        let mut inner = self.inner.lock();
        if !inner.items.contains_key(id) {
            return Err(RemoteError::NotFound);
        }
        inner.delete_recursive(id);
        Ok(())
    }

    async fn download(
        &self,
        drive: &DriveId,
        id: &ItemId,
        writer: &mut (dyn tokio::io::AsyncWrite + Send + Unpin),
    ) -> Result<u64, RemoteError> {
        self.download_range(drive, id, writer, 0).await
    }

    async fn download_range(
        &self,
        _drive: &DriveId,
        id: &ItemId,
        writer: &mut (dyn tokio::io::AsyncWrite + Send + Unpin),
        offset: u64,
    ) -> Result<u64, RemoteError> {
        let data = {
            let inner = self.inner.lock();
            inner.contents.get(id).cloned().ok_or(RemoteError::NotFound)?
        };
        if offset > data.len() as u64 {
            return Err(RemoteError::RangeNotSatisfiable);
        }
        let mut slice = &data[offset as usize..];
        if let Some(Fault::DownloadInterrupt(n)) =
            self.take_fault(|f| matches!(f, Fault::DownloadInterrupt(_)))
        {
            let n = (n as usize).min(slice.len());
            slice = &slice[..n];
            writer
                .write_all(slice)
                .await
                .map_err(|e| RemoteError::Transient(e.to_string()))?;
            return Err(RemoteError::Transient("connection interrupted".to_string()));
        }
        writer
            .write_all(slice)
            .await
            .map_err(|e| RemoteError::Transient(e.to_string()))?;
        Ok(slice.len() as u64)
    }

    async fn upload_small(
        &self,
        _drive: &DriveId,
        parent: &ItemId,
        name: &str,
        data: Vec<u8>,
        mtime: Option<DateTime<Utc>>,
    ) -> Result<RemoteItem, RemoteError> {
        let mut inner = self.inner.lock();
        if !inner.children.contains_key(parent) {
            return Err(RemoteError::NotFound);
        }
        let id = inner.put_file(parent, name, data, mtime);
        inner
            .items
            .get(&id)
            .map(|f| f.item.clone())
            .ok_or(RemoteError::NotFound)
    }

    async fn create_upload_session(
        &self,
        _drive: &DriveId,
        parent: &ItemId,
        name: &str,
        size: u64,
        mtime: Option<DateTime<Utc>>,
    ) -> Result<UploadSession, RemoteError> {
        let mut inner = self.inner.lock();
        if !inner.children.contains_key(parent) {
            return Err(RemoteError::NotFound);
        }
        inner.next_session += 1;
        let url = format!("https://fake.invalid/sessions/{}", inner.next_session);
        inner.sessions.insert(
            url.clone(),
            SessionState {
                parent: parent.clone(),
                name: name.to_string(),
                size,
                mtime,
                received: 0,
                buffer: Vec::with_capacity(size as usize),
            },
        );
        Ok(UploadSession {
            url: SessionUrl::new(url),
            expires_at: Some(Utc::now() + chrono::Duration::hours(1)),
        })
    }

    async fn upload_chunk(
        &self,
        session: &UploadSession,
        data: Vec<u8>,
        range: ContentRange,
    ) -> Result<UploadChunkResult, RemoteError> {
        if let Some(fault) =
            self.take_fault(|f| matches!(f, Fault::ChunkRangeNotSatisfiable | Fault::SessionExpired))
        {
            match fault {
                Fault::ChunkRangeNotSatisfiable => return Err(RemoteError::RangeNotSatisfiable),
                Fault::SessionExpired => {
                    self.inner.lock().sessions.remove(session.url.expose());
                    return Err(RemoteError::UploadSessionExpired);
                }
                _ => {}
            }
        }
        let mut inner = self.inner.lock();
        let key = session.url.expose().to_string();
        let state = inner
            .sessions
            .get_mut(&key)
            .ok_or(RemoteError::UploadSessionExpired)?;
        if range.start != state.received || range.total != state.size {
            return Err(RemoteError::RangeNotSatisfiable);
        }
        if data.len() as u64 != range.len() {
            return Err(RemoteError::Permanent(format!(
                "chunk body {} bytes does not match range {}",
                data.len(),
                range
            )));
        }
        state.buffer.extend_from_slice(&data);
        state.received = range.end + 1;
        if state.received < state.size {
            return Ok(UploadChunkResult::Accepted);
        }
        let SessionState {
            parent,
            name,
            mtime,
            buffer,
            ..
        } = inner
            .sessions
            .remove(&key)
            .ok_or(RemoteError::UploadSessionExpired)?;
        let id = inner.put_file(&parent, &name, buffer, mtime);
        let item = inner
            .items
            .get(&id)
            .map(|f| f.item.clone())
            .ok_or(RemoteError::NotFound)?;
        Ok(UploadChunkResult::Complete(Box::new(item)))
    }

    async fn query_upload_session(
        &self,
        session: &UploadSession,
    ) -> Result<Vec<std::ops::Range<u64>>, RemoteError> {
        let inner = self.inner.lock();
        let state = inner
            .sessions
            .get(session.url.expose())
            .ok_or(RemoteError::UploadSessionExpired)?;
        Ok(vec![state.received..state.size])
    }

    async fn cancel_upload_session(&self, session: &UploadSession) -> Result<(), RemoteError> {
        self.inner.lock().sessions.remove(session.url.expose());
        Ok(())
    }

    async fn delta(
        &self,
        _drive: &DriveId,
        cursor: Option<&str>,
        _prefer_alias: bool,
    ) -> Result<DeltaPage, RemoteError> {
        if let Some(fault) = self.take_fault(|f| {
            matches!(
                f,
                Fault::CursorExpired | Fault::Throttled(_) | Fault::TransientDelta
            )
        }) {
            match fault {
                Fault::CursorExpired if cursor.is_some() => {
                    return Err(RemoteError::CursorExpired)
                }
                Fault::CursorExpired => {}
                Fault::Throttled(retry_after) => {
                    return Err(RemoteError::Throttled { retry_after })
                }
                Fault::TransientDelta => {
                    return Err(RemoteError::Transient("connection reset".to_string()))
                }
                _ => {}
            }
        }
        let inner = self.inner.lock();
        if !inner.supports_delta {
            return Err(RemoteError::Permanent(
                "delta not supported on this cloud".to_string(),
            ));
        }
        let log_len = inner.log.len();
        let (items, start): (Vec<RemoteItem>, usize) = match cursor {
            None => (inner.live_items_sorted(), log_len),
            Some(c) => {
                let idx = parse_cursor(c)?;
                if idx > log_len {
                    return Err(RemoteError::CursorExpired);
                }
                (inner.log[idx..].to_vec(), idx)
            }
        };
        // Page the result; cursor math only applies to log-backed reads.
        let page_size = inner.page_size;
        if cursor.is_some() && items.len() > page_size {
            let page: Vec<RemoteItem> = items[..page_size].to_vec();
            return Ok(DeltaPage {
                items: page,
                next_cursor: Some(format!("c{}", start + page_size)),
                delta_cursor: None,
            });
        }
        Ok(DeltaPage {
            items,
            next_cursor: None,
            delta_cursor: Some(format!("c{}", log_len)),
        })
    }

    fn supports_delta(&self) -> bool {
        self.inner.lock().supports_delta
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
