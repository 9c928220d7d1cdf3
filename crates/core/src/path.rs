// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Drive-relative sync paths
//!
//! A [`SyncPath`] is the path of an item relative to the sync root, with
//! forward slashes, no leading or trailing slash, and every segment in
//! Unicode NFC. The empty path is the sync root itself. Orphaned items
//! (parent not yet known) also carry the empty path until reconciled.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use unicode_normalization::UnicodeNormalization;

/// Normalized drive-relative path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SyncPath(String);

impl SyncPath {
    /// The sync root.
    pub const fn root() -> Self {
        Self(String::new())
    }

    /// Build from an already-relative string, normalizing each segment to NFC.
    pub fn new(raw: impl AsRef<str>) -> Self {
        let raw = raw.as_ref();
        let mut out = String::with_capacity(raw.len());
        for seg in raw.split('/').filter(|s| !s.is_empty() && *s != ".") {
            if !out.is_empty() {
                out.push('/');
            }
            out.extend(seg.nfc());
        }
        Self(out)
    }

    /// Build from a filesystem path relative to `root`.
    ///
    /// Returns `None` when `path` is not under `root`.
    pub fn from_fs(root: &Path, path: &Path) -> Option<Self> {
        let rel = path.strip_prefix(root).ok()?;
        let mut out = String::new();
        for comp in rel.components() {
            let seg = comp.as_os_str().to_string_lossy();
            if !out.is_empty() {
                out.push('/');
            }
            out.extend(seg.nfc());
        }
        Some(Self(out))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Last path segment; empty for the root.
    pub fn name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or("")
    }

    /// Parent path; `None` for the root.
    pub fn parent(&self) -> Option<SyncPath> {
        if self.0.is_empty() {
            return None;
        }
        match self.0.rfind('/') {
            Some(i) => Some(SyncPath(self.0[..i].to_string())),
            None => Some(SyncPath::root()),
        }
    }

    /// Append a (single) child segment.
    pub fn join(&self, name: &str) -> SyncPath {
        let name: String = name.nfc().collect();
        if self.0.is_empty() {
            SyncPath(name)
        } else {
            SyncPath(format!("{}/{}", self.0, name))
        }
    }

    /// Number of segments; 0 for the root.
    pub fn depth(&self) -> usize {
        if self.0.is_empty() {
            0
        } else {
            self.0.matches('/').count() + 1
        }
    }

    /// True when `self` is a strict ancestor of `other`.
    pub fn is_ancestor_of(&self, other: &SyncPath) -> bool {
        if self.0.is_empty() {
            return !other.0.is_empty();
        }
        other.0.len() > self.0.len()
            && other.0.starts_with(&self.0)
            && other.0.as_bytes()[self.0.len()] == b'/'
    }

    /// Resolve to an absolute filesystem path under `root`.
    pub fn to_fs(&self, root: &Path) -> PathBuf {
        if self.0.is_empty() {
            return root.to_path_buf();
        }
        let mut out = root.to_path_buf();
        for seg in self.0.split('/') {
            out.push(seg);
        }
        out
    }
}

impl Default for SyncPath {
    fn default() -> Self {
        SyncPath::root()
    }
}

impl std::fmt::Display for SyncPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.0.is_empty() {
            write!(f, "/")
        } else {
            write!(f, "/{}", self.0)
        }
    }
}

impl From<&str> for SyncPath {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for SyncPath {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

#[cfg(test)]
#[path = "path_tests.rs"]
mod tests;
