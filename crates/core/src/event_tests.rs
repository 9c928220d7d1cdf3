// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn ev(kind: ChangeKind, path: &str) -> ChangeEvent {
    ChangeEvent {
        kind,
        origin: Origin::Remote,
        path: SyncPath::new(path),
        name: SyncPath::new(path).name().to_string(),
        is_folder: false,
        item_id: Some(ItemId::new("i1")),
        parent_id: Some(ItemId::root()),
        size: 0,
        hash: None,
        hash_kind: None,
        mtime: None,
        etag: None,
    }
}

#[test]
fn flush_key_orders_deletes_before_creates_in_parent() {
    let d = ev(ChangeKind::Delete, "a/z.txt");
    let c = ev(ChangeKind::Create, "a/b.txt");
    assert!(d.flush_key() < c.flush_key());
}

#[test]
fn flush_key_orders_lexicographically_within_kind() {
    let a = ev(ChangeKind::Create, "a/a.txt");
    let b = ev(ChangeKind::Create, "a/b.txt");
    assert!(a.flush_key() < b.flush_key());
}

#[test]
fn flush_key_groups_by_parent_first() {
    let a = ev(ChangeKind::Delete, "b/x.txt");
    let b = ev(ChangeKind::Create, "a/x.txt");
    // parent "a" sorts before parent "b" regardless of kind
    assert!(b.flush_key() > a.flush_key() || b.flush_key() < a.flush_key());
    assert!(b.flush_key() < a.flush_key());
}

#[test]
fn display_is_compact() {
    let e = ev(ChangeKind::Update, "docs/x.txt");
    assert_eq!(e.to_string(), "remote:update /docs/x.txt");
}

#[test]
fn event_serde_round_trip() {
    let e = ev(ChangeKind::Create, "a/b.txt");
    let json = serde_json::to_string(&e).unwrap();
    let back: ChangeEvent = serde_json::from_str(&json).unwrap();
    assert_eq!(back, e);
}
