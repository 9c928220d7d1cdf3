// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn file(id: &str, parent: &str, name: &str, path: &str) -> Item {
    Item {
        item_id: ItemId::new(id),
        parent_id: ItemId::new(parent),
        name: name.to_string(),
        is_folder: false,
        size: 5,
        mtime_remote: None,
        mtime_local: None,
        etag: Some("e1".to_string()),
        content_hash: Some("aGFzaA==".to_string()),
        hash_kind: Some(HashKind::QuickXor),
        path: SyncPath::new(path),
        deleted: false,
        deleted_at_ms: None,
    }
}

#[test]
fn root_sentinel() {
    assert!(ItemId::root().is_root());
    assert!(!ItemId::new("abc").is_root());
}

#[test]
fn orphan_detection() {
    let mut item = file("i1", "missing-parent", "a.txt", "");
    assert!(item.is_orphaned());
    item.path = SyncPath::new("docs/a.txt");
    assert!(!item.is_orphaned());
}

#[test]
fn root_folder_is_not_orphaned() {
    let mut item = file("i1", ItemId::ROOT, "a.txt", "a.txt");
    item.path = SyncPath::root();
    // direct child of root with empty path would be the root itself
    assert!(!item.is_orphaned());
}

#[test]
fn item_serde_round_trip() {
    let item = file("i1", ItemId::ROOT, "a.txt", "a.txt");
    let json = serde_json::to_string(&item).unwrap();
    let back: Item = serde_json::from_str(&json).unwrap();
    assert_eq!(back, item);
}

#[test]
fn optional_fields_are_omitted() {
    let mut item = file("i1", ItemId::ROOT, "a.txt", "a.txt");
    item.etag = None;
    item.content_hash = None;
    item.hash_kind = None;
    let json = serde_json::to_string(&item).unwrap();
    assert!(!json.contains("etag"));
    assert!(!json.contains("content_hash"));
}
