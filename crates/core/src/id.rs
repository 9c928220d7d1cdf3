// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Generated identifiers and prefix lookup

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Identifier for a recorded conflict: `cfl-` + 19-char nanoid.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConflictId(String);

impl ConflictId {
    pub const PREFIX: &'static str = "cfl-";

    /// Generate a new random ID with the type prefix
    pub fn new() -> Self {
        Self(format!("{}{}", Self::PREFIX, nanoid::nanoid!(19)))
    }

    /// Create ID from existing string (for parsing/deserialization)
    pub fn from_string(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ConflictId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConflictId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::borrow::Borrow<str> for ConflictId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Result of a by-prefix lookup.
#[derive(Debug, PartialEq, Eq)]
pub enum PrefixLookup<T> {
    None,
    One(T),
    /// Prefix matched more than one key. Never silently pick a winner.
    Ambiguous(Vec<String>),
}

/// Find a value by exact key or unique key prefix (like git commit hashes).
///
/// An ambiguous prefix is reported, never resolved arbitrarily.
pub fn find_by_prefix<'a, V>(map: &'a HashMap<String, V>, query: &str) -> PrefixLookup<&'a V> {
    if let Some(v) = map.get(query) {
        return PrefixLookup::One(v);
    }
    let mut hits: Vec<&str> = map
        .keys()
        .filter(|k| k.starts_with(query))
        .map(|k| k.as_str())
        .collect();
    match hits.len() {
        0 => PrefixLookup::None,
        1 => match map.get(hits[0]) {
            Some(v) => PrefixLookup::One(v),
            None => PrefixLookup::None,
        },
        _ => {
            hits.sort_unstable();
            PrefixLookup::Ambiguous(hits.into_iter().map(String::from).collect())
        }
    }
}

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;
