// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn session_url_debug_is_redacted() {
    let url = SessionUrl::new("https://host/upload?sig=SECRET");
    assert_eq!(format!("{:?}", url), "SessionUrl(<redacted>)");
    assert_eq!(format!("{}", url), "<redacted>");
}

#[test]
fn session_url_expose_returns_secret() {
    let url = SessionUrl::new("https://host/upload?sig=SECRET");
    assert_eq!(url.expose(), "https://host/upload?sig=SECRET");
}

#[test]
fn session_url_serde_round_trips_value() {
    // Persistence must keep the real URL; only logging is redacted.
    let url = SessionUrl::new("https://host/u");
    let json = serde_json::to_string(&url).unwrap();
    assert_eq!(json, "\"https://host/u\"");
    let back: SessionUrl = serde_json::from_str(&json).unwrap();
    assert_eq!(back, url);
}

#[test]
fn content_range_formats_like_the_header() {
    let r = ContentRange {
        start: 0,
        end: 10 * 1024 * 1024 - 1,
        total: 20 * 1024 * 1024,
    };
    assert_eq!(r.to_string(), "bytes 0-10485759/20971520");
    assert_eq!(r.len(), 10 * 1024 * 1024);
}

#[test]
fn remote_item_defaults() {
    let json = r#"{"id":"i1","name":"a.txt"}"#;
    let item: RemoteItem = serde_json::from_str(json).unwrap();
    assert!(!item.is_folder);
    assert!(!item.deleted);
    assert!(!item.is_package);
    assert_eq!(item.size, 0);
}
