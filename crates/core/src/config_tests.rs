// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::io::Write;

fn base() -> EngineConfig {
    EngineConfig::new(
        DriveId::new("drv1"),
        PathBuf::from("/tmp/sync"),
        PathBuf::from("/tmp/state"),
    )
}

#[test]
fn defaults_are_valid() {
    assert!(base().validate().is_ok());
}

#[yare::parameterized(
    zero = { 0 },
    not_a_multiple = { 320 * 1024 + 1 },
    one_byte = { 1 },
)]
fn invalid_chunk_sizes(chunk_size: u64) {
    let mut c = base();
    c.chunk_size = chunk_size;
    assert!(matches!(c.validate(), Err(SyncError::Config(_))));
}

#[test]
fn default_chunk_size_is_quantum_aligned() {
    let c = base();
    assert_eq!(c.chunk_size % UPLOAD_QUANTUM, 0);
    assert_eq!(c.chunk_size, 10 * 1024 * 1024);
}

#[test]
fn big_delete_fraction_bounds() {
    let mut c = base();
    c.big_delete_fraction = 1.5;
    assert!(c.validate().is_err());
    c.big_delete_fraction = 0.25;
    assert!(c.validate().is_ok());
}

#[test]
fn safety_scan_minimum_enforced() {
    let mut c = base();
    c.safety_scan_secs = 1;
    assert_eq!(c.safety_scan_interval(), Duration::from_secs(30));
    c.safety_scan_secs = 120;
    assert_eq!(c.safety_scan_interval(), Duration::from_secs(120));
}

#[test]
fn load_from_toml() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("skiff.toml");
    let mut f = std::fs::File::create(&path).unwrap();
    writeln!(
        f,
        r#"
drive_id = "drv1"
sync_root = "/tmp/sync"
state_dir = "/tmp/state"
chunk_size = 655360
exclusions = ["*.iso"]
"#
    )
    .unwrap();

    let c = EngineConfig::load(&path).unwrap();
    assert_eq!(c.drive_id.as_str(), "drv1");
    assert_eq!(c.chunk_size, 2 * UPLOAD_QUANTUM);
    assert_eq!(c.exclusions, vec!["*.iso".to_string()]);
}

#[test]
fn load_rejects_bad_chunk_size() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("skiff.toml");
    std::fs::write(
        &path,
        "drive_id = \"d\"\nsync_root = \"/a\"\nstate_dir = \"/b\"\nchunk_size = 12345\n",
    )
    .unwrap();
    assert!(EngineConfig::load(&path).is_err());
}

#[test]
fn state_paths_derive_from_state_dir() {
    let c = base();
    assert_eq!(c.pause_marker(), PathBuf::from("/tmp/state/pause"));
    assert_eq!(
        c.baseline_snapshot_path(),
        PathBuf::from("/tmp/state/baseline.snapshot.zst")
    );
    assert_eq!(c.sessions_dir(), PathBuf::from("/tmp/state/sessions"));
}
