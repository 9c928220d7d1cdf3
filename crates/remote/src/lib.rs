// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! skiff-remote: the remote drive boundary
//!
//! The engine consumes an authenticated [`RemoteClient`]; token acquisition
//! and the HTTP transport live behind this trait and are out of scope here.

pub mod client;
pub mod error;
pub mod retry;
pub mod types;

#[cfg(any(test, feature = "test-support"))]
pub mod fake;

pub use client::RemoteClient;
pub use error::RemoteError;
pub use retry::{with_retry, RetryPolicy};
pub use types::{
    ContentRange, DeltaPage, DriveInfo, Identity, RemoteItem, SessionUrl, UploadChunkResult,
    UploadSession,
};

#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeRemote, Fault};
