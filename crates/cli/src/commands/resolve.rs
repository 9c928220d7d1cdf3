// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `skiff resolve`
//!
//! Batch mode takes one of the `--keep-*` flags with `--all` or a single
//! id/path; without flags each unresolved conflict is prompted
//! interactively (L/R/B/S/Q). The enforcing transfer runs on the next
//! sync cycle.

use crate::exit_error::{ExitError, EXIT_CONFIG, EXIT_DIRTY, EXIT_OK};
use crate::output::Status;
use clap::Args;
use skiff_core::{Clock, ConflictRecord, EngineConfig, Resolution, SyncError};
use skiff_engine::{resolve_batch, Selector};
use skiff_store::BaselineStore;
use std::io::{BufRead, Write};
use std::sync::Arc;

const RESOLVED_BY_CLI: &str = "cli";

#[derive(Debug, Args)]
pub struct ResolveArgs {
    /// Conflict id (or unique prefix) or path. Mutually exclusive with --all.
    pub selector: Option<String>,
    /// Resolve every unresolved conflict.
    #[arg(long, conflicts_with = "selector")]
    pub all: bool,
    #[arg(long, group = "choice")]
    pub keep_local: bool,
    #[arg(long, group = "choice")]
    pub keep_remote: bool,
    #[arg(long, group = "choice")]
    pub keep_both: bool,
    /// Show what would be resolved without writing anything.
    #[arg(long)]
    pub dry_run: bool,
}

impl ResolveArgs {
    fn resolution(&self) -> Option<Resolution> {
        if self.keep_local {
            Some(Resolution::KeepLocal)
        } else if self.keep_remote {
            Some(Resolution::KeepRemote)
        } else if self.keep_both {
            Some(Resolution::KeepBoth)
        } else {
            None
        }
    }

    fn selector(&self) -> Result<Selector, ExitError> {
        if self.all {
            return Ok(Selector::All);
        }
        match &self.selector {
            Some(query) => Ok(Selector::One(query.clone())),
            None => Err(ExitError::new(
                EXIT_CONFIG,
                "specify a conflict id/path or --all",
            )),
        }
    }
}

pub fn run<C: Clock>(
    config: &EngineConfig,
    clock: C,
    args: &ResolveArgs,
    status: Status,
) -> Result<i32, ExitError> {
    let store = super::open_store(config, clock)?;

    match args.resolution() {
        Some(resolution) => {
            let selector = args.selector()?;
            let resolved =
                resolve_batch(&store, &selector, resolution, RESOLVED_BY_CLI, args.dry_run)
                    .map_err(map_resolve_error)?;
            let verb = if args.dry_run { "would resolve" } else { "resolved" };
            for record in &resolved {
                status.say(format!(
                    "{} {} as {} ({})",
                    verb,
                    record.path,
                    resolution.as_str(),
                    record.id
                ));
            }
            if resolved.is_empty() {
                status.say("nothing to resolve");
            } else if !args.dry_run {
                status.say("run `skiff sync` to apply the resolutions");
            }
            Ok(EXIT_OK)
        }
        None => {
            let stdin = std::io::stdin();
            let mut input = stdin.lock();
            let mut output = std::io::stderr();
            interactive(&store, &mut input, &mut output)
        }
    }
}

fn map_resolve_error(err: SyncError) -> ExitError {
    match &err {
        SyncError::AmbiguousId { .. } => ExitError::new(EXIT_DIRTY, err.to_string()),
        _ => ExitError::from(err),
    }
}

/// Per-conflict prompt: Local, Remote, Both, Skip, Quit.
pub fn interactive<C: Clock>(
    store: &Arc<BaselineStore<C>>,
    input: &mut impl BufRead,
    output: &mut impl Write,
) -> Result<i32, ExitError> {
    let conflicts = store.list_conflicts(false);
    if conflicts.is_empty() {
        let _ = writeln!(output, "no conflicts");
        return Ok(EXIT_OK);
    }
    for conflict in conflicts {
        match prompt_one(&conflict, input, output)? {
            Choice::Pick(resolution) => {
                store
                    .resolve_conflict(conflict.id.as_str(), resolution, RESOLVED_BY_CLI)
                    .map_err(|e| ExitError::from(SyncError::from(e)))?;
                let _ = writeln!(output, "resolved {} as {}", conflict.path, resolution.as_str());
            }
            Choice::Skip => continue,
            Choice::Quit => break,
        }
    }
    Ok(EXIT_OK)
}

enum Choice {
    Pick(Resolution),
    Skip,
    Quit,
}

fn prompt_one(
    conflict: &ConflictRecord,
    input: &mut impl BufRead,
    output: &mut impl Write,
) -> Result<Choice, ExitError> {
    loop {
        let _ = writeln!(
            output,
            "{} ({}): [L]ocal / [R]emote / [B]oth / [S]kip / [Q]uit?",
            conflict.path,
            conflict.kind.as_str()
        );
        let mut line = String::new();
        let n = input
            .read_line(&mut line)
            .map_err(|e| ExitError::new(EXIT_CONFIG, format!("stdin: {e}")))?;
        if n == 0 {
            // EOF behaves like quit.
            return Ok(Choice::Quit);
        }
        match line.trim().to_ascii_lowercase().as_str() {
            "l" => return Ok(Choice::Pick(Resolution::KeepLocal)),
            "r" => return Ok(Choice::Pick(Resolution::KeepRemote)),
            "b" => return Ok(Choice::Pick(Resolution::KeepBoth)),
            "s" => return Ok(Choice::Skip),
            "q" => return Ok(Choice::Quit),
            other => {
                let _ = writeln!(output, "unrecognized choice {:?}", other);
            }
        }
    }
}

#[cfg(test)]
#[path = "resolve_tests.rs"]
mod tests;
