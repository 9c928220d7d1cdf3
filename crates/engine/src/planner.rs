// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Three-way diff planner
//!
//! Classifies every changed path against (baseline, local, remote) and
//! emits a deterministic action plan: identical inputs produce identical
//! plans byte-for-byte. All iteration is over sorted maps.

use chrono::Utc;
use skiff_core::{
    Action, ActionId, ActionKind, ChangeEvent, ChangeKind, ConflictId, ConflictKind,
    ConflictRecord, EngineConfig, Item, Outcome, Plan, Resolution, SyncError, SyncMode, SyncPath,
};
use skiff_store::Baseline;
use std::collections::BTreeMap;

/// Everything the planner reads. The planner itself is pure.
pub struct PlannerInput<'a> {
    pub baseline: &'a Baseline,
    pub local: &'a [ChangeEvent],
    pub remote: &'a [ChangeEvent],
    pub mode: SyncMode,
    pub config: &'a EngineConfig,
}

/// Plan plus the conflicts freshly detected while planning.
#[derive(Debug, Default)]
pub struct PlannerOutput {
    pub plan: Plan,
    pub new_conflicts: Vec<ConflictRecord>,
    /// Remote events left unapplied this cycle (conflicted paths). A
    /// non-zero count pins the cursor so the next observation still
    /// returns them.
    pub deferred: usize,
}

#[derive(Default)]
struct PathState<'a> {
    local: Option<&'a ChangeEvent>,
    remote: Option<&'a ChangeEvent>,
}

/// Side state derived from an event batch, against the baseline.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Side<'a> {
    /// No event: the side equals the baseline.
    Unchanged,
    /// Present with content (create or update).
    Present(&'a ChangeEvent),
    /// Deleted on this side.
    Absent,
}

/// Build the action plan for one cycle.
pub fn plan(input: PlannerInput<'_>) -> Result<PlannerOutput, SyncError> {
    let mut states: BTreeMap<SyncPath, PathState<'_>> = BTreeMap::new();
    let mut orphans: Vec<&ChangeEvent> = Vec::new();

    for event in input.local {
        states.entry(event.path.clone()).or_default().local = Some(event);
    }
    for event in input.remote {
        if event.path.is_root() {
            // Parent not yet known: committed as an orphaned baseline row
            // and reconciled when the parent arrives.
            orphans.push(event);
            continue;
        }
        states.entry(event.path.clone()).or_default().remote = Some(event);
    }

    let mut out = PlannerOutput::default();
    let mut next_id: ActionId = 0;
    // folder-create action id by path, for child dependencies
    let mut folder_creates: BTreeMap<SyncPath, ActionId> = BTreeMap::new();
    // delete action ids by path, for bottom-up delete dependencies
    let mut deletes: BTreeMap<SyncPath, ActionId> = BTreeMap::new();

    // Conflict enforcement first: those paths are excluded from other
    // actions this cycle.
    let mut conflicted_paths: Vec<SyncPath> = Vec::new();
    let mut pending: Vec<&ConflictRecord> = input
        .baseline
        .conflicts
        .values()
        .filter(|c| c.is_pending_apply() || !c.is_resolved())
        .collect();
    pending.sort_by(|a, b| a.path.cmp(&b.path));
    for conflict in pending {
        conflicted_paths.push(conflict.path.clone());
        if conflict.is_pending_apply() {
            next_id += 1;
            out.plan.actions.push(Action {
                id: next_id,
                kind: ActionKind::ResolveConflict,
                path: conflict.path.clone(),
                item_id: input
                    .baseline
                    .item_by_path(&conflict.path)
                    .map(|i| i.item_id.clone()),
                parent_id: None,
                size: 0,
                remote_hash: conflict.remote_hash.clone(),
                remote_hash_kind: None,
                mtime: None,
                etag: None,
                resolution: Some((conflict.id.clone(), conflict.resolution)),
                depends_on: Vec::new(),
            });
        }
    }

    for (path, state) in &states {
        if conflicted_paths.contains(path) {
            if state.remote.is_some() {
                out.deferred += 1;
            }
            continue;
        }
        let conflicts_before = out.new_conflicts.len();
        let baseline_item = input.baseline.item_by_path(path);
        let local = side_of(state.local, baseline_item);
        let remote = side_of(state.remote, baseline_item);

        match (local, remote) {
            (Side::Unchanged, Side::Unchanged) => {}

            // Pull changes
            (Side::Unchanged, Side::Present(ev)) => {
                if ev.is_folder {
                    if baseline_item.map(|b| b.is_folder).unwrap_or(false) {
                        continue;
                    }
                    if baseline_item.map(|b| !b.is_folder).unwrap_or(false) {
                        record_conflict(&mut out, path, ConflictKind::TypeMismatch, None, None);
                        continue;
                    }
                    push_action(
                        &mut out.plan,
                        &mut next_id,
                        &mut folder_creates,
                        ActionKind::CreateLocalFolder,
                        path,
                        ev,
                    );
                } else {
                    if unchanged_from_baseline(ev, baseline_item) {
                        continue;
                    }
                    if baseline_item.map(|b| b.is_folder).unwrap_or(false) {
                        record_conflict(&mut out, path, ConflictKind::TypeMismatch, None, None);
                        continue;
                    }
                    push_action(
                        &mut out.plan,
                        &mut next_id,
                        &mut folder_creates,
                        ActionKind::Download,
                        path,
                        ev,
                    );
                }
            }
            (Side::Unchanged, Side::Absent) => {
                if baseline_item.is_some() {
                    push_delete(
                        &mut out.plan,
                        &mut next_id,
                        &mut deletes,
                        ActionKind::LocalDelete,
                        path,
                        state.remote,
                        baseline_item,
                    );
                }
            }

            // Push changes
            (Side::Present(ev), Side::Unchanged) => {
                if ev.is_folder {
                    if baseline_item.map(|b| b.is_folder).unwrap_or(false) {
                        continue;
                    }
                    if baseline_item.map(|b| !b.is_folder).unwrap_or(false) {
                        record_conflict(&mut out, path, ConflictKind::TypeMismatch, None, None);
                        continue;
                    }
                    push_action(
                        &mut out.plan,
                        &mut next_id,
                        &mut folder_creates,
                        ActionKind::CreateRemoteFolder,
                        path,
                        ev,
                    );
                } else {
                    if unchanged_from_baseline(ev, baseline_item) {
                        continue;
                    }
                    if baseline_item.map(|b| b.is_folder).unwrap_or(false) {
                        record_conflict(&mut out, path, ConflictKind::TypeMismatch, None, None);
                        continue;
                    }
                    push_action(
                        &mut out.plan,
                        &mut next_id,
                        &mut folder_creates,
                        ActionKind::Upload,
                        path,
                        ev,
                    );
                }
            }
            (Side::Absent, Side::Unchanged) => {
                if baseline_item.is_some() {
                    push_delete(
                        &mut out.plan,
                        &mut next_id,
                        &mut deletes,
                        ActionKind::RemoteDelete,
                        path,
                        state.local,
                        baseline_item,
                    );
                }
            }

            // Both sides changed
            (Side::Absent, Side::Absent) => {
                // Converged delete: baseline-only tombstone, no transfer.
                if let Some(item) = baseline_item {
                    out.plan.converged.push(Outcome {
                        kind: ActionKind::LocalDelete,
                        path: path.clone(),
                        item_id: Some(item.item_id.clone()),
                        parent_id: Some(item.parent_id.clone()),
                        name: item.name.clone(),
                        is_folder: item.is_folder,
                        size: 0,
                        content_hash: None,
                        hash_kind: None,
                        hash_verified: true,
                        mtime_local: None,
                        mtime_remote: None,
                        etag: None,
                        resolved_conflict: None,
                    });
                }
            }
            (Side::Present(local_ev), Side::Absent) => {
                // The surviving edit wins: re-push local content.
                push_action(
                    &mut out.plan,
                    &mut next_id,
                    &mut folder_creates,
                    if local_ev.is_folder {
                        ActionKind::CreateRemoteFolder
                    } else {
                        ActionKind::Upload
                    },
                    path,
                    local_ev,
                );
            }
            (Side::Absent, Side::Present(remote_ev)) => {
                // Mirror rule: the remote edit survives a local delete.
                push_action(
                    &mut out.plan,
                    &mut next_id,
                    &mut folder_creates,
                    if remote_ev.is_folder {
                        ActionKind::CreateLocalFolder
                    } else {
                        ActionKind::Download
                    },
                    path,
                    remote_ev,
                );
            }
            (Side::Present(local_ev), Side::Present(remote_ev)) => {
                if local_ev.is_folder != remote_ev.is_folder {
                    record_conflict(
                        &mut out,
                        path,
                        ConflictKind::TypeMismatch,
                        local_ev.hash.clone(),
                        remote_ev.hash.clone(),
                    );
                } else if local_ev.is_folder
                    || hashes_equal(local_ev, remote_ev)
                {
                    // Converged: update the baseline only.
                    out.plan.converged.push(converged_outcome(local_ev, remote_ev));
                } else {
                    record_conflict(
                        &mut out,
                        path,
                        ConflictKind::EditEdit,
                        local_ev.hash.clone(),
                        remote_ev.hash.clone(),
                    );
                }
            }
        }
        if out.new_conflicts.len() > conflicts_before && state.remote.is_some() {
            out.deferred += 1;
        }
    }

    // Orphaned remote rows: baseline-only upserts, reconciled later.
    for event in orphans {
        let Some(item_id) = event.item_id.clone() else {
            continue;
        };
        out.plan.converged.push(Outcome {
            kind: ActionKind::Download,
            path: SyncPath::root(),
            item_id: Some(item_id),
            parent_id: event.parent_id.clone(),
            name: event.name.clone(),
            is_folder: event.is_folder,
            size: event.size,
            content_hash: event.hash.clone(),
            hash_kind: event.hash_kind,
            hash_verified: true,
            mtime_local: None,
            mtime_remote: event.mtime,
            etag: event.etag.clone(),
            resolved_conflict: None,
        });
    }

    apply_mode_filter(&mut out.plan, input.mode);
    wire_dependencies(&mut out.plan, &folder_creates, &deletes);

    // Safety gate: refuse suspiciously large delete plans.
    let baseline_count = input.baseline.live_item_count();
    let planned_deletes = out.plan.delete_count();
    if baseline_count > 0 && !input.config.force_big_delete {
        let fraction = planned_deletes as f64 / baseline_count as f64;
        if fraction > input.config.big_delete_fraction {
            return Err(SyncError::BigDelete {
                planned: planned_deletes,
                baseline: baseline_count,
            });
        }
    }

    Ok(out)
}

fn side_of<'a>(event: Option<&'a ChangeEvent>, _baseline: Option<&Item>) -> Side<'a> {
    match event {
        None => Side::Unchanged,
        Some(ev) => match ev.kind {
            ChangeKind::Delete => Side::Absent,
            ChangeKind::Create | ChangeKind::Update => Side::Present(ev),
        },
    }
}

/// A watch event can be spurious (touch without content change).
fn unchanged_from_baseline(ev: &ChangeEvent, baseline: Option<&Item>) -> bool {
    let Some(item) = baseline else {
        return false;
    };
    if item.is_folder != ev.is_folder {
        return false;
    }
    match (&ev.hash, &item.content_hash) {
        (Some(a), Some(b)) => a == b,
        // Hashless events cannot be proven unchanged; plan the transfer
        // and let verification settle it.
        _ => ev.size == item.size && ev.etag.is_some() && ev.etag == item.etag,
    }
}

fn hashes_equal(a: &ChangeEvent, b: &ChangeEvent) -> bool {
    match (&a.hash, &b.hash) {
        (Some(x), Some(y)) => x == y,
        _ => false,
    }
}

fn push_action(
    plan: &mut Plan,
    next_id: &mut ActionId,
    folder_creates: &mut BTreeMap<SyncPath, ActionId>,
    kind: ActionKind,
    path: &SyncPath,
    event: &ChangeEvent,
) {
    *next_id += 1;
    if matches!(
        kind,
        ActionKind::CreateLocalFolder | ActionKind::CreateRemoteFolder
    ) {
        folder_creates.insert(path.clone(), *next_id);
    }
    plan.actions.push(Action {
        id: *next_id,
        kind,
        path: path.clone(),
        item_id: event.item_id.clone(),
        parent_id: event.parent_id.clone(),
        size: event.size,
        remote_hash: event.hash.clone(),
        remote_hash_kind: event.hash_kind,
        mtime: event.mtime,
        etag: event.etag.clone(),
        resolution: None,
        depends_on: Vec::new(),
    });
}

#[allow(clippy::too_many_arguments)]
fn push_delete(
    plan: &mut Plan,
    next_id: &mut ActionId,
    deletes: &mut BTreeMap<SyncPath, ActionId>,
    kind: ActionKind,
    path: &SyncPath,
    event: Option<&ChangeEvent>,
    baseline: Option<&Item>,
) {
    *next_id += 1;
    deletes.insert(path.clone(), *next_id);
    plan.actions.push(Action {
        id: *next_id,
        kind,
        path: path.clone(),
        item_id: baseline
            .map(|b| b.item_id.clone())
            .or_else(|| event.and_then(|e| e.item_id.clone())),
        parent_id: baseline.map(|b| b.parent_id.clone()),
        size: 0,
        remote_hash: None,
        remote_hash_kind: None,
        mtime: None,
        etag: None,
        resolution: None,
        depends_on: Vec::new(),
    });
}

fn record_conflict(
    out: &mut PlannerOutput,
    path: &SyncPath,
    kind: ConflictKind,
    local_hash: Option<String>,
    remote_hash: Option<String>,
) {
    out.new_conflicts.push(ConflictRecord {
        id: ConflictId::new(),
        path: path.clone(),
        kind,
        detected_at: Utc::now(),
        local_hash,
        remote_hash,
        resolution: Resolution::Unresolved,
        resolved_at: None,
        resolved_by: None,
        applied: false,
    });
}

fn converged_outcome(local: &ChangeEvent, remote: &ChangeEvent) -> Outcome {
    Outcome {
        kind: if remote.is_folder {
            ActionKind::CreateLocalFolder
        } else {
            ActionKind::Download
        },
        path: remote.path.clone(),
        item_id: remote.item_id.clone(),
        parent_id: remote.parent_id.clone(),
        name: remote.name.clone(),
        is_folder: remote.is_folder,
        size: remote.size,
        content_hash: remote.hash.clone().or_else(|| local.hash.clone()),
        hash_kind: remote.hash_kind.or(local.hash_kind),
        hash_verified: true,
        mtime_local: local.mtime,
        mtime_remote: remote.mtime,
        etag: remote.etag.clone(),
        resolved_conflict: None,
    }
}

fn apply_mode_filter(plan: &mut Plan, mode: SyncMode) {
    match mode {
        SyncMode::Bidirectional | SyncMode::DryRun => {}
        SyncMode::DownloadOnly => plan.actions.retain(|a| {
            !matches!(
                a.kind,
                ActionKind::Upload | ActionKind::CreateRemoteFolder | ActionKind::RemoteDelete
            )
        }),
        SyncMode::UploadOnly => plan.actions.retain(|a| {
            !matches!(
                a.kind,
                ActionKind::Download | ActionKind::CreateLocalFolder | ActionKind::LocalDelete
            )
        }),
    }
}

/// Wire the dependency DAG: creates after their parent's create, deletes
/// after their descendants' deletes.
fn wire_dependencies(
    plan: &mut Plan,
    folder_creates: &BTreeMap<SyncPath, ActionId>,
    deletes: &BTreeMap<SyncPath, ActionId>,
) {
    let live_ids: std::collections::BTreeSet<ActionId> =
        plan.actions.iter().map(|a| a.id).collect();
    for action in &mut plan.actions {
        match action.kind {
            ActionKind::Download
            | ActionKind::Upload
            | ActionKind::CreateLocalFolder
            | ActionKind::CreateRemoteFolder => {
                if let Some(parent) = action.path.parent() {
                    if let Some(&dep) = folder_creates.get(&parent) {
                        if dep != action.id && live_ids.contains(&dep) {
                            action.depends_on.push(dep);
                        }
                    }
                }
            }
            ActionKind::LocalDelete | ActionKind::RemoteDelete => {
                for (child_path, &dep) in deletes {
                    if action.path.is_ancestor_of(child_path) && live_ids.contains(&dep) {
                        action.depends_on.push(dep);
                    }
                }
            }
            ActionKind::ResolveConflict => {}
        }
    }
}

#[cfg(test)]
#[path = "planner_tests.rs"]
mod tests;
