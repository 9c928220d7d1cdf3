// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! skiff: sync a remote drive with a local directory

mod commands;
mod exit_error;
mod output;
mod transport;

use clap::{Parser, Subcommand};
use commands::conflicts::ConflictsArgs;
use commands::resolve::ResolveArgs;
use commands::sync::SyncArgs;
use exit_error::ExitError;
use output::Status;
use skiff_core::SystemClock;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "skiff", version, about = "Bidirectional drive sync client")]
struct Cli {
    /// Path to the config file (default: <config dir>/skiff/config.toml).
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Suppress interactive status output.
    #[arg(long, short, global = true)]
    quiet: bool,
    /// Emit machine-readable JSON on stdout.
    #[arg(long, global = true)]
    json: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a sync cycle (or keep watching with --watch).
    Sync(SyncArgs),
    /// Pause syncing (watch loops idle until resumed).
    Pause,
    /// Resume a paused sync.
    Resume,
    /// List recorded conflicts.
    Conflicts(ConflictsArgs),
    /// Resolve conflicts, interactively or in batch.
    Resolve(ResolveArgs),
    /// Check local content against the baseline.
    Verify,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing();

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("error: failed to start runtime: {e}");
            return ExitCode::from(exit_error::EXIT_CONFIG as u8);
        }
    };

    match runtime.block_on(dispatch(cli)) {
        Ok(code) => ExitCode::from(code as u8),
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::from(err.code as u8)
        }
    }
}

fn init_tracing() {
    // Status lines and logs both go to stderr; stdout is data only.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("skiff=info,warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn dispatch(cli: Cli) -> Result<i32, ExitError> {
    let status = Status::new(cli.quiet);
    let config = commands::load_config(cli.config.as_ref())?;
    let clock = SystemClock;

    match &cli.command {
        Command::Sync(args) => {
            // Token acquisition lives in the auth component; this build
            // carries the unauthenticated placeholder, so sync reports
            // NotLoggedIn until a transport is wired in.
            let remote = Arc::new(transport::UnauthenticatedRemote);
            commands::sync::run(remote, config, clock, args, cli.json, status).await
        }
        Command::Pause => commands::pause::pause(&config, status),
        Command::Resume => commands::pause::resume(&config, status),
        Command::Conflicts(args) => commands::conflicts::run(&config, clock, args, cli.json),
        Command::Resolve(args) => commands::resolve::run(&config, clock, args, status),
        Command::Verify => commands::verify::run(&config, clock, cli.json, status),
    }
}
