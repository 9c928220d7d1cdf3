// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn success_counters() {
    let mut r = SyncReport::default();
    r.record_success(ActionKind::Download);
    r.record_success(ActionKind::Download);
    r.record_success(ActionKind::Upload);
    r.record_success(ActionKind::CreateLocalFolder);
    r.record_success(ActionKind::ResolveConflict);
    assert_eq!(r.downloads, 2);
    assert_eq!(r.uploads, 1);
    assert_eq!(r.folders_created, 1);
    assert_eq!(r.conflicts_resolved, 1);
    assert_eq!(r.transferred(), 3);
}

#[test]
fn error_list_caps() {
    let mut r = SyncReport::default();
    for i in 0..(ERROR_LIST_CAP + 10) {
        r.record_error(
            ActionKind::Upload,
            SyncPath::new(format!("f{}.bin", i)),
            "boom".to_string(),
        );
    }
    assert_eq!(r.failed, (ERROR_LIST_CAP + 10) as u64);
    assert_eq!(r.errors.len(), ERROR_LIST_CAP);
    assert_eq!(r.errors_truncated, 10);
}

#[test]
fn report_json_round_trip() {
    let mut r = SyncReport::default();
    r.record_success(ActionKind::Download);
    r.delta_reset = true;
    let json = serde_json::to_string(&r).unwrap();
    let back: SyncReport = serde_json::from_str(&json).unwrap();
    assert_eq!(back, r);
}
