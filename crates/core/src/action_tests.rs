// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn action(id: ActionId, kind: ActionKind, path: &str, deps: &[ActionId]) -> Action {
    Action {
        id,
        kind,
        path: SyncPath::new(path),
        item_id: None,
        parent_id: None,
        size: 0,
        remote_hash: None,
        remote_hash_kind: None,
        mtime: None,
        etag: None,
        resolution: None,
        depends_on: deps.to_vec(),
    }
}

#[test]
fn plan_counts() {
    let plan = Plan {
        actions: vec![
            action(1, ActionKind::CreateLocalFolder, "a", &[]),
            action(2, ActionKind::Download, "a/x.txt", &[1]),
            action(3, ActionKind::LocalDelete, "b.txt", &[]),
            action(4, ActionKind::RemoteDelete, "c.txt", &[]),
        ],
        converged: vec![],
    };
    assert_eq!(plan.len(), 4);
    assert_eq!(plan.count(ActionKind::Download), 1);
    assert_eq!(plan.delete_count(), 2);
    assert_eq!(plan.get(2).unwrap().path.as_str(), "a/x.txt");
    assert!(plan.get(9).is_none());
}

#[yare::parameterized(
    download = { ActionKind::Download, true },
    upload = { ActionKind::Upload, true },
    local_delete = { ActionKind::LocalDelete, false },
    create_remote = { ActionKind::CreateRemoteFolder, false },
)]
fn transfer_classification(kind: ActionKind, is_transfer: bool) {
    assert_eq!(kind.is_transfer(), is_transfer);
}

#[test]
fn empty_plan() {
    let plan = Plan::default();
    assert!(plan.is_empty());
    assert_eq!(plan.delete_count(), 0);
}

#[test]
fn outcome_hash_verified_defaults_true() {
    let json = r#"{"kind":"download","path":"a.txt"}"#;
    let outcome: Outcome = serde_json::from_str(json).unwrap();
    assert!(outcome.hash_verified);
}

#[test]
fn plan_serde_round_trip() {
    let plan = Plan {
        actions: vec![action(1, ActionKind::Upload, "x.bin", &[])],
        converged: vec![],
    };
    let json = serde_json::to_string(&plan).unwrap();
    let back: Plan = serde_json::from_str(&json).unwrap();
    assert_eq!(back, plan);
}
