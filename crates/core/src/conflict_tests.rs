// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn record(kind: ConflictKind) -> ConflictRecord {
    ConflictRecord {
        id: ConflictId::new(),
        path: SyncPath::new("docs/report.txt"),
        kind,
        detected_at: chrono::Utc::now(),
        local_hash: Some("bG9jYWw=".to_string()),
        remote_hash: Some("cmVtb3Rl".to_string()),
        resolution: Resolution::Unresolved,
        resolved_at: None,
        resolved_by: None,
        applied: false,
    }
}

#[yare::parameterized(
    edit_edit = { ConflictKind::EditEdit, "edit-edit" },
    edit_delete = { ConflictKind::EditDelete, "edit-delete" },
    delete_edit = { ConflictKind::DeleteEdit, "delete-edit" },
    type_mismatch = { ConflictKind::TypeMismatch, "type-mismatch" },
)]
fn kind_serde_matches_as_str(kind: ConflictKind, name: &str) {
    assert_eq!(kind.as_str(), name);
    assert_eq!(serde_json::to_string(&kind).unwrap(), format!("\"{}\"", name));
}

#[yare::parameterized(
    unresolved = { Resolution::Unresolved, false },
    keep_local = { Resolution::KeepLocal, true },
    keep_remote = { Resolution::KeepRemote, true },
    keep_both = { Resolution::KeepBoth, true },
)]
fn resolved_flag(resolution: Resolution, resolved: bool) {
    let mut r = record(ConflictKind::EditEdit);
    r.resolution = resolution;
    assert_eq!(r.is_resolved(), resolved);
}

#[test]
fn record_serde_round_trip() {
    let r = record(ConflictKind::TypeMismatch);
    let json = serde_json::to_string(&r).unwrap();
    let back: ConflictRecord = serde_json::from_str(&json).unwrap();
    assert_eq!(back, r);
}

#[test]
fn missing_resolution_defaults_to_unresolved() {
    let json = r#"{
        "id": "cfl-x",
        "path": "a.txt",
        "kind": "edit-edit",
        "detected_at": "2026-01-01T00:00:00Z"
    }"#;
    let r: ConflictRecord = serde_json::from_str(json).unwrap();
    assert_eq!(r.resolution, Resolution::Unresolved);
}
