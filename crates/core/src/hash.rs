// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Streaming content hashing
//!
//! The remote's native algorithm is QuickXorHash; SHA-256 is the fallback
//! when the remote only exposes `sha256Hash` (national clouds). Digests are
//! base64-encoded strings in both cases, matching what the delta feed
//! carries. The metadata kind exists for items where no content hash is
//! available at all (size + etag + mtime comparison only).

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::Arc;

/// Which algorithm produced a digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HashKind {
    #[serde(rename = "quickxor")]
    QuickXor,
    Sha256,
    /// No content hash; comparison falls back to size + etag + mtime.
    Metadata,
}

impl HashKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            HashKind::QuickXor => "quickxor",
            HashKind::Sha256 => "sha256",
            HashKind::Metadata => "metadata",
        }
    }
}

/// A streaming hasher producing a base64-encoded digest.
pub trait ContentHasher: Send {
    fn update(&mut self, buf: &[u8]);
    fn finalize(self: Box<Self>) -> String;
    fn kind(&self) -> HashKind;
}

/// Factory for hashers; injected into the engine so the algorithm is
/// pluggable (QuickXor by default, SHA-256 as the fallback).
pub type HasherFactory = Arc<dyn Fn() -> Box<dyn ContentHasher> + Send + Sync>;

/// Factory for the default QuickXorHash.
pub fn quickxor_factory() -> HasherFactory {
    Arc::new(|| Box::new(QuickXorHasher::new()))
}

/// Factory for the SHA-256 fallback.
pub fn sha256_factory() -> HasherFactory {
    Arc::new(|| Box::new(Sha256Hasher::new()))
}

/// Convenience: hash a whole byte slice with the given factory.
pub fn hash_bytes(factory: &HasherFactory, data: &[u8]) -> String {
    let mut hasher = factory();
    hasher.update(data);
    hasher.finalize()
}

const QX_WIDTH_BITS: usize = 160;
const QX_WIDTH_BYTES: usize = QX_WIDTH_BITS / 8;
const QX_SHIFT: usize = 11;

/// The drive's native rolling-XOR hash.
///
/// Each input byte is XORed into a 160-bit accumulator at a bit position
/// that advances 11 bits per byte, wrapping at 160; the total length
/// (little-endian u64) is XORed into the last 8 bytes on finalize.
pub struct QuickXorHasher {
    acc: [u8; QX_WIDTH_BYTES],
    bit_pos: usize,
    length: u64,
}

impl QuickXorHasher {
    pub fn new() -> Self {
        Self {
            acc: [0; QX_WIDTH_BYTES],
            bit_pos: 0,
            length: 0,
        }
    }
}

impl Default for QuickXorHasher {
    fn default() -> Self {
        Self::new()
    }
}

impl ContentHasher for QuickXorHasher {
    fn update(&mut self, buf: &[u8]) {
        for &b in buf {
            let byte_i = self.bit_pos / 8;
            let bit_off = self.bit_pos % 8;
            self.acc[byte_i] ^= (b << bit_off) & 0xff;
            if bit_off > 0 {
                let next = (byte_i + 1) % QX_WIDTH_BYTES;
                self.acc[next] ^= b >> (8 - bit_off);
            }
            self.bit_pos = (self.bit_pos + QX_SHIFT) % QX_WIDTH_BITS;
        }
        self.length = self.length.wrapping_add(buf.len() as u64);
    }

    fn finalize(mut self: Box<Self>) -> String {
        let len_bytes = self.length.to_le_bytes();
        for (i, &lb) in len_bytes.iter().enumerate() {
            self.acc[QX_WIDTH_BYTES - 8 + i] ^= lb;
        }
        BASE64.encode(self.acc)
    }

    fn kind(&self) -> HashKind {
        HashKind::QuickXor
    }
}

/// SHA-256 fallback hasher (base64 digest, as the delta feed carries it).
pub struct Sha256Hasher {
    inner: Sha256,
}

impl Sha256Hasher {
    pub fn new() -> Self {
        Self {
            inner: Sha256::new(),
        }
    }
}

impl Default for Sha256Hasher {
    fn default() -> Self {
        Self::new()
    }
}

impl ContentHasher for Sha256Hasher {
    fn update(&mut self, buf: &[u8]) {
        self.inner.update(buf);
    }

    fn finalize(self: Box<Self>) -> String {
        BASE64.encode(self.inner.finalize())
    }

    fn kind(&self) -> HashKind {
        HashKind::Sha256
    }
}

#[cfg(test)]
#[path = "hash_tests.rs"]
mod tests;
