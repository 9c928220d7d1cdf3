// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `skiff verify`
//!
//! Walks the sync root and checks every baseline item against the disk:
//! missing files, content-hash drift, and unsynced extras. Exit code 1
//! on any mismatch.

use crate::exit_error::{ExitError, EXIT_CONFIG, EXIT_DIRTY, EXIT_OK};
use crate::output::Status;
use serde::Serialize;
use skiff_core::{
    quickxor_factory, sha256_factory, Clock, EngineConfig, ExclusionSet, HashKind, SyncPath,
};
use skiff_store::Baseline;
use std::collections::HashSet;
use std::io::Read;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MismatchKind {
    Missing,
    HashDiffers,
    TypeDiffers,
    Unsynced,
}

#[derive(Debug, Serialize)]
pub struct Mismatch {
    pub kind: MismatchKind,
    pub path: SyncPath,
}

#[derive(Debug, Default, Serialize)]
pub struct VerifyReport {
    pub checked: u64,
    pub mismatches: Vec<Mismatch>,
}

pub fn run<C: Clock>(
    config: &EngineConfig,
    clock: C,
    json: bool,
    status: Status,
) -> Result<i32, ExitError> {
    let store = super::open_store(config, clock)?;
    let baseline = store.load();
    let excludes = ExclusionSet::new(&config.exclusions, config.excludes_case_sensitive())
        .map_err(|e| ExitError::new(EXIT_CONFIG, format!("bad exclusion pattern: {e}")))?;

    let report = verify_tree(&baseline, &config.sync_root, &excludes)
        .map_err(|e| ExitError::new(EXIT_CONFIG, e.to_string()))?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report)
                .map_err(|e| ExitError::new(EXIT_DIRTY, e.to_string()))?
        );
    } else {
        status.say(format!(
            "verified {} items, {} mismatches",
            report.checked,
            report.mismatches.len()
        ));
        for m in &report.mismatches {
            println!("{:?}: {}", m.kind, m.path);
        }
    }
    if report.mismatches.is_empty() {
        Ok(EXIT_OK)
    } else {
        Ok(EXIT_DIRTY)
    }
}

/// Compare the baseline with the on-disk tree.
pub fn verify_tree(
    baseline: &Baseline,
    sync_root: &Path,
    excludes: &ExclusionSet,
) -> std::io::Result<VerifyReport> {
    let mut report = VerifyReport::default();
    let mut known: HashSet<SyncPath> = HashSet::new();

    for item in baseline.items.values() {
        if item.deleted || item.is_orphaned() {
            continue;
        }
        known.insert(item.path.clone());
        report.checked += 1;
        let fs_path = item.path.to_fs(sync_root);
        let meta = match std::fs::symlink_metadata(&fs_path) {
            Ok(meta) => meta,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                report.mismatches.push(Mismatch {
                    kind: MismatchKind::Missing,
                    path: item.path.clone(),
                });
                continue;
            }
            Err(e) => return Err(e),
        };
        if item.is_folder != meta.is_dir() {
            report.mismatches.push(Mismatch {
                kind: MismatchKind::TypeDiffers,
                path: item.path.clone(),
            });
            continue;
        }
        if item.is_folder {
            continue;
        }
        let Some(expected) = &item.content_hash else {
            // Hashless entries (metadata fallback) compare by size only.
            if meta.len() != item.size {
                report.mismatches.push(Mismatch {
                    kind: MismatchKind::HashDiffers,
                    path: item.path.clone(),
                });
            }
            continue;
        };
        let actual = hash_with_kind(&fs_path, item.hash_kind.unwrap_or(HashKind::QuickXor))?;
        if &actual != expected {
            report.mismatches.push(Mismatch {
                kind: MismatchKind::HashDiffers,
                path: item.path.clone(),
            });
        }
    }

    // Files on disk the baseline does not know.
    let mut stack = vec![sync_root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        for entry in std::fs::read_dir(&dir)? {
            let entry = entry?;
            let fs_path = entry.path();
            let Some(path) = SyncPath::from_fs(sync_root, &fs_path) else {
                continue;
            };
            if excludes.is_excluded(&path) {
                continue;
            }
            if entry.file_type()?.is_dir() {
                stack.push(fs_path);
            }
            if !known.contains(&path) {
                report.mismatches.push(Mismatch {
                    kind: MismatchKind::Unsynced,
                    path,
                });
            }
        }
    }

    report.mismatches.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(report)
}

fn hash_with_kind(path: &Path, kind: HashKind) -> std::io::Result<String> {
    let factory = match kind {
        HashKind::Sha256 => sha256_factory(),
        _ => quickxor_factory(),
    };
    let mut hasher = factory();
    let mut file = std::fs::File::open(path)?;
    let mut buf = vec![0u8; 64 * 1024];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hasher.finalize())
}

#[cfg(test)]
#[path = "verify_tests.rs"]
mod tests;
