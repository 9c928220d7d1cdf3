// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `skiff pause` / `skiff resume`
//!
//! A marker file in the drive state directory; watch loops idle while it
//! exists. Both commands are idempotent.

use crate::exit_error::{ExitError, EXIT_CONFIG, EXIT_OK};
use crate::output::Status;
use skiff_core::EngineConfig;

pub fn pause(config: &EngineConfig, status: Status) -> Result<i32, ExitError> {
    std::fs::create_dir_all(&config.state_dir)
        .map_err(|e| ExitError::new(EXIT_CONFIG, format!("state dir: {e}")))?;
    let marker = config.pause_marker();
    std::fs::write(&marker, b"")
        .map_err(|e| ExitError::new(EXIT_CONFIG, format!("pause marker: {e}")))?;
    status.say("sync paused");
    Ok(EXIT_OK)
}

pub fn resume(config: &EngineConfig, status: Status) -> Result<i32, ExitError> {
    let marker = config.pause_marker();
    match std::fs::remove_file(&marker) {
        Ok(()) => status.say("sync resumed"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            status.say("sync was not paused");
        }
        Err(e) => {
            return Err(ExitError::new(
                EXIT_CONFIG,
                format!("pause marker: {e}"),
            ))
        }
    }
    Ok(EXIT_OK)
}

#[cfg(test)]
#[path = "pause_tests.rs"]
mod tests;
