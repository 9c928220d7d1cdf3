// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn conflict_id_has_prefix_and_length() {
    let id = ConflictId::new();
    assert!(id.as_str().starts_with("cfl-"));
    assert_eq!(id.as_str().len(), 4 + 19);
}

#[test]
fn conflict_ids_are_unique() {
    let a = ConflictId::new();
    let b = ConflictId::new();
    assert_ne!(a, b);
}

#[test]
fn conflict_id_serde_is_transparent() {
    let id = ConflictId::from_string("cfl-abc");
    let json = serde_json::to_string(&id).unwrap();
    assert_eq!(json, "\"cfl-abc\"");
    let back: ConflictId = serde_json::from_str(&json).unwrap();
    assert_eq!(back, id);
}

fn sample() -> HashMap<String, u32> {
    let mut m = HashMap::new();
    m.insert("cfl-alpha".to_string(), 1);
    m.insert("cfl-beta".to_string(), 2);
    m.insert("cfl-bravo".to_string(), 3);
    m
}

#[test]
fn exact_match_wins() {
    let m = sample();
    assert_eq!(find_by_prefix(&m, "cfl-alpha"), PrefixLookup::One(&1));
}

#[test]
fn unique_prefix_resolves() {
    let m = sample();
    assert_eq!(find_by_prefix(&m, "cfl-a"), PrefixLookup::One(&1));
}

#[test]
fn ambiguous_prefix_lists_candidates() {
    let m = sample();
    match find_by_prefix(&m, "cfl-b") {
        PrefixLookup::Ambiguous(hits) => {
            assert_eq!(hits, vec!["cfl-beta".to_string(), "cfl-bravo".to_string()]);
        }
        other => panic!("expected ambiguous, got {:?}", other),
    }
}

#[test]
fn missing_prefix_is_none() {
    let m = sample();
    assert_eq!(find_by_prefix(&m, "zzz"), PrefixLookup::None);
}
