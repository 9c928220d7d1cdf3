// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use skiff_core::{ChangeKind, ItemId, Origin};

fn ev(kind: ChangeKind, path: &str) -> ChangeEvent {
    ChangeEvent {
        kind,
        origin: Origin::Local,
        path: SyncPath::new(path),
        name: SyncPath::new(path).name().to_string(),
        is_folder: false,
        item_id: Some(ItemId::new("i1")),
        parent_id: None,
        size: 1,
        hash: None,
        hash_kind: None,
        mtime: None,
        etag: None,
    }
}

#[test]
fn later_event_replaces_earlier() {
    let mut buf = ChangeBuffer::new(10);
    buf.push(ev(ChangeKind::Create, "a.txt")).unwrap();
    buf.push(ev(ChangeKind::Delete, "a.txt")).unwrap();
    assert_eq!(buf.len(), 1);
    let events = buf.flush();
    assert_eq!(events[0].kind, ChangeKind::Delete);
}

#[test]
fn overflow_is_an_error() {
    let mut buf = ChangeBuffer::new(2);
    buf.push(ev(ChangeKind::Create, "a.txt")).unwrap();
    buf.push(ev(ChangeKind::Create, "b.txt")).unwrap();
    let err = buf.push(ev(ChangeKind::Create, "c.txt"));
    assert!(matches!(err, Err(SyncError::BufferOverflow { cap: 2 })));
}

#[test]
fn replacing_at_cap_is_allowed() {
    let mut buf = ChangeBuffer::new(1);
    buf.push(ev(ChangeKind::Create, "a.txt")).unwrap();
    // Same path: coalesces, does not overflow
    buf.push(ev(ChangeKind::Update, "a.txt")).unwrap();
    assert_eq!(buf.len(), 1);
}

#[test]
fn flush_orders_deletes_first_within_parent() {
    let mut buf = ChangeBuffer::new(10);
    buf.push(ev(ChangeKind::Create, "a/new.txt")).unwrap();
    buf.push(ev(ChangeKind::Delete, "a/old.txt")).unwrap();
    buf.push(ev(ChangeKind::Create, "a/also.txt")).unwrap();

    let events = buf.flush();
    assert_eq!(events[0].kind, ChangeKind::Delete);
    assert_eq!(events[1].path.as_str(), "a/also.txt");
    assert_eq!(events[2].path.as_str(), "a/new.txt");
    assert!(buf.is_empty());
}

#[test]
fn flush_is_deterministic() {
    let paths = ["z.txt", "a/x.txt", "a/a.txt", "m.txt", "a/b/c.txt"];
    let mut first = ChangeBuffer::new(10);
    let mut second = ChangeBuffer::new(10);
    for p in paths {
        first.push(ev(ChangeKind::Create, p)).unwrap();
    }
    for p in paths.iter().rev() {
        second.push(ev(ChangeKind::Create, p)).unwrap();
    }
    let a: Vec<_> = first.flush().into_iter().map(|e| e.path).collect();
    let b: Vec<_> = second.flush().into_iter().map(|e| e.path).collect();
    assert_eq!(a, b);
}
