// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Command implementations

pub mod conflicts;
pub mod pause;
pub mod resolve;
pub mod sync;
pub mod verify;

use crate::exit_error::{ExitError, EXIT_CONFIG};
use skiff_core::{Clock, EngineConfig};
use skiff_store::BaselineStore;
use std::path::PathBuf;
use std::sync::Arc;

/// Locate and load the engine config.
pub fn load_config(explicit: Option<&PathBuf>) -> Result<EngineConfig, ExitError> {
    let path = match explicit {
        Some(path) => path.clone(),
        None => dirs::config_dir()
            .map(|d| d.join("skiff").join("config.toml"))
            .ok_or_else(|| ExitError::new(EXIT_CONFIG, "cannot determine config directory"))?,
    };
    EngineConfig::load(&path).map_err(|e| {
        ExitError::new(
            EXIT_CONFIG,
            format!("failed to load config {}: {}", path.display(), e),
        )
    })
}

/// Open the baseline store for read-mostly commands (conflicts, resolve,
/// verify). Refused while a sync holds the lock.
pub fn open_store<C: Clock>(
    config: &EngineConfig,
    clock: C,
) -> Result<Arc<BaselineStore<C>>, ExitError> {
    std::fs::create_dir_all(&config.state_dir)
        .map_err(|e| ExitError::new(EXIT_CONFIG, format!("state dir: {e}")))?;
    let store = BaselineStore::open(
        &config.baseline_snapshot_path(),
        &config.baseline_wal_path(),
        &config.baseline_lock_path(),
        clock,
    )
    .map_err(|e| ExitError::new(EXIT_CONFIG, e.to_string()))?;
    Ok(Arc::new(store))
}
