// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Opaque per-drive delta cursor

use serde::{Deserialize, Serialize};

/// Opaque token from the remote identifying a point in its change stream.
///
/// Treated as a black box: stored and echoed back verbatim. Persisted
/// atomically with the outcomes whose application it reflects.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeltaCursor(String);

impl DeltaCursor {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for DeltaCursor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for DeltaCursor {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for DeltaCursor {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}
