// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Path exclusion rules for scan and watch

use crate::path::SyncPath;
use crate::{NOSYNC_GUARD, PARTIAL_SUFFIX};
use glob::{MatchOptions, Pattern};

/// Names skipped regardless of user patterns.
const BUILTIN_NAMES: &[&str] = &[NOSYNC_GUARD, ".DS_Store", "Thumbs.db", "desktop.ini"];

/// Name patterns skipped regardless of user patterns: dotfiles and
/// editor/platform temp droppings.
const BUILTIN_PATTERNS: &[&str] = &[".*", "*.tmp", "*.swp", "~$*"];

/// Compiled exclusion set applied to both the scanner and the watcher.
///
/// Patterns containing a `/` match against the drive-relative path,
/// otherwise against the last segment only.
pub struct ExclusionSet {
    name_patterns: Vec<Pattern>,
    path_patterns: Vec<Pattern>,
    options: MatchOptions,
}

impl ExclusionSet {
    /// Compile builtin plus user patterns. Invalid user patterns are
    /// rejected so a typo never silently syncs everything.
    pub fn new(user_patterns: &[String], case_sensitive: bool) -> Result<Self, glob::PatternError> {
        let mut name_patterns = Vec::new();
        let mut path_patterns = Vec::new();
        for raw in BUILTIN_PATTERNS.iter().copied() {
            name_patterns.push(Pattern::new(raw)?);
        }
        for raw in BUILTIN_NAMES.iter().copied() {
            name_patterns.push(Pattern::new(&Pattern::escape(raw))?);
        }
        for raw in user_patterns {
            if raw.contains('/') {
                path_patterns.push(Pattern::new(raw.trim_start_matches('/'))?);
            } else {
                name_patterns.push(Pattern::new(raw)?);
            }
        }
        Ok(Self {
            name_patterns,
            path_patterns,
            options: MatchOptions {
                case_sensitive,
                require_literal_separator: false,
                require_literal_leading_dot: false,
            },
        })
    }

    /// Platform default case sensitivity: insensitive on macOS/Windows.
    pub fn platform_case_sensitive() -> bool {
        !cfg!(any(target_os = "macos", target_os = "windows"))
    }

    /// True when this path must not be synced.
    pub fn is_excluded(&self, path: &SyncPath) -> bool {
        if path.is_root() {
            return false;
        }
        // Reserved partial-download siblings are never synced.
        if path.name().ends_with(PARTIAL_SUFFIX) {
            return true;
        }
        for seg in path.as_str().split('/') {
            if self
                .name_patterns
                .iter()
                .any(|p| p.matches_with(seg, self.options))
            {
                return true;
            }
        }
        self.path_patterns
            .iter()
            .any(|p| p.matches_with(path.as_str(), self.options))
    }
}

#[cfg(test)]
#[path = "exclude_tests.rs"]
mod tests;
