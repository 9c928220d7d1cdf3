// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `skiff conflicts`

use crate::exit_error::{ExitError, EXIT_DIRTY, EXIT_OK};
use crate::output::{print_conflicts_human, print_conflicts_json};
use clap::Args;
use skiff_core::{Clock, EngineConfig};

#[derive(Debug, Args)]
pub struct ConflictsArgs {
    /// Include resolved conflicts.
    #[arg(long)]
    pub all: bool,
}

pub fn run<C: Clock>(
    config: &EngineConfig,
    clock: C,
    args: &ConflictsArgs,
    json: bool,
) -> Result<i32, ExitError> {
    let store = super::open_store(config, clock)?;
    let conflicts = store.list_conflicts(args.all);
    if json {
        print_conflicts_json(&conflicts)
            .map_err(|e| ExitError::new(EXIT_DIRTY, e.to_string()))?;
    } else {
        print_conflicts_human(&conflicts);
    }
    Ok(EXIT_OK)
}
