// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Stable content hashing
//!
//! A file is stat'd, hashed, then stat'd again; if the size or mtime
//! moved underneath us the attempt retries, up to a bound. After the last
//! attempt the result carries no hash and the consumer may defer the path.

use chrono::{DateTime, Utc};
use skiff_core::{HashKind, HasherFactory};
use std::fs::File;
use std::io::Read;
use std::path::Path;

const READ_BUF: usize = 64 * 1024;
pub const DEFAULT_ATTEMPTS: u32 = 3;

#[derive(Debug, Clone)]
pub struct StableHash {
    /// `None` when the file would not hold still.
    pub hash: Option<String>,
    pub kind: HashKind,
    pub size: u64,
    pub mtime: Option<DateTime<Utc>>,
}

#[derive(PartialEq)]
struct Fingerprint {
    size: u64,
    mtime: Option<std::time::SystemTime>,
}

fn fingerprint(path: &Path) -> std::io::Result<Fingerprint> {
    let meta = std::fs::metadata(path)?;
    Ok(Fingerprint {
        size: meta.len(),
        mtime: meta.modified().ok(),
    })
}

/// Hash a file, retrying while it keeps changing underneath.
pub fn stable_hash_file(
    path: &Path,
    factory: &HasherFactory,
    max_attempts: u32,
) -> std::io::Result<StableHash> {
    let mut last = fingerprint(path)?;
    for attempt in 1..=max_attempts.max(1) {
        let mut hasher = factory();
        let kind = hasher.kind();
        let mut file = File::open(path)?;
        let mut buf = vec![0u8; READ_BUF];
        loop {
            let n = file.read(&mut buf)?;
            if n == 0 {
                break;
            }
            hasher.update(&buf[..n]);
        }
        let after = fingerprint(path)?;
        if after == last {
            return Ok(StableHash {
                hash: Some(hasher.finalize()),
                kind,
                size: after.size,
                mtime: after.mtime.map(DateTime::<Utc>::from),
            });
        }
        tracing::debug!(
            path = %path.display(),
            attempt,
            "file changed while hashing; retrying"
        );
        last = after;
    }
    // Emitted with an empty hash; the planner may defer the path.
    let kind = factory().kind();
    Ok(StableHash {
        hash: None,
        kind,
        size: last.size,
        mtime: last.mtime.map(DateTime::<Utc>::from),
    })
}

#[cfg(test)]
#[path = "stable_hash_tests.rs"]
mod tests;
