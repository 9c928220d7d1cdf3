// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Conflict resolution
//!
//! Detection happens in the planner; records live in the baseline store.
//! Resolution here only marks the choice; the enforcing transfer or
//! rename runs as a `ResolveConflict` action in the next cycle.

use skiff_core::{Clock, ConflictRecord, Resolution, SyncError};
use skiff_store::BaselineStore;
use std::sync::Arc;

/// What to resolve: everything, or one conflict by id prefix or path.
#[derive(Debug, Clone)]
pub enum Selector {
    All,
    One(String),
}

/// Batch resolution. With `dry_run` the records that would change are
/// returned and nothing is written.
pub fn resolve_batch<C: Clock>(
    store: &Arc<BaselineStore<C>>,
    selector: &Selector,
    resolution: Resolution,
    resolved_by: &str,
    dry_run: bool,
) -> Result<Vec<ConflictRecord>, SyncError> {
    let targets = select(store, selector)?;
    if dry_run {
        return Ok(targets);
    }
    let mut resolved = Vec::with_capacity(targets.len());
    for record in targets {
        let updated = store
            .resolve_conflict(record.id.as_str(), resolution, resolved_by)
            .map_err(SyncError::from)?;
        tracing::info!(
            conflict = %updated.id,
            path = %updated.path,
            resolution = resolution.as_str(),
            "conflict resolved"
        );
        resolved.push(updated);
    }
    Ok(resolved)
}

/// Resolve the selector to unresolved conflict records. Ambiguous id
/// prefixes are an error, never a silent choice.
fn select<C: Clock>(
    store: &Arc<BaselineStore<C>>,
    selector: &Selector,
) -> Result<Vec<ConflictRecord>, SyncError> {
    match selector {
        Selector::All => Ok(store.list_conflicts(false)),
        Selector::One(query) => {
            // Paths are also accepted: exact match on an unresolved record.
            let by_path: Vec<ConflictRecord> = store
                .list_conflicts(false)
                .into_iter()
                .filter(|c| c.path.as_str() == query.trim_start_matches('/'))
                .collect();
            if by_path.len() == 1 {
                return Ok(by_path);
            }
            let record = store.find_conflict(query).map_err(SyncError::from)?;
            if record.is_resolved() {
                return Err(SyncError::Storage(format!(
                    "conflict {} is already resolved",
                    record.id
                )));
            }
            Ok(vec![record])
        }
    }
}

#[cfg(test)]
#[path = "conflicts_tests.rs"]
mod tests;
