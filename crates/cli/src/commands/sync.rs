// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `skiff sync`

use crate::exit_error::{ExitError, EXIT_DIRTY, EXIT_OK};
use crate::output::{print_report_human, print_report_json, Status};
use clap::Args;
use skiff_core::{quickxor_factory, Clock, EngineConfig, SyncMode, SyncReport};
use skiff_engine::{Engine, WatchOptions};
use skiff_remote::RemoteClient;
use std::sync::Arc;

#[derive(Debug, Args)]
pub struct SyncArgs {
    /// Keep running, driven by filesystem events plus a safety scan.
    #[arg(long)]
    pub watch: bool,
    /// Plan and report without executing anything.
    #[arg(long)]
    pub dry_run: bool,
    /// Only pull remote changes.
    #[arg(long, conflicts_with = "upload_only")]
    pub download_only: bool,
    /// Only push local changes.
    #[arg(long)]
    pub upload_only: bool,
    /// Override the big-delete safety gate.
    #[arg(long)]
    pub force: bool,
}

impl SyncArgs {
    pub fn mode(&self) -> SyncMode {
        if self.dry_run {
            SyncMode::DryRun
        } else if self.download_only {
            SyncMode::DownloadOnly
        } else if self.upload_only {
            SyncMode::UploadOnly
        } else {
            SyncMode::Bidirectional
        }
    }
}

/// Run a sync and return the process exit code.
pub async fn run<R: RemoteClient, C: Clock>(
    remote: Arc<R>,
    mut config: EngineConfig,
    clock: C,
    args: &SyncArgs,
    json: bool,
    status: Status,
) -> Result<i32, ExitError> {
    if args.force {
        config.force_big_delete = true;
    }
    let engine = Engine::open(remote, config, quickxor_factory(), clock)?;
    let mode = args.mode();

    if args.watch {
        status.say("watching for changes (ctrl-c to stop)");
        let cancel = engine.cancel_token();
        let watch = engine.run_watch(mode, WatchOptions::default());
        tokio::select! {
            result = watch => {
                result?;
                Ok(EXIT_OK)
            }
            _ = tokio::signal::ctrl_c() => {
                status.say("stopping...");
                cancel.cancel();
                Ok(EXIT_OK)
            }
        }
    } else {
        let report = engine.run_once(mode).await?;
        emit(&report, json, status)?;
        if report.failed > 0 {
            Ok(EXIT_DIRTY)
        } else {
            Ok(EXIT_OK)
        }
    }
}

fn emit(report: &SyncReport, json: bool, status: Status) -> Result<(), ExitError> {
    if json {
        print_report_json(report)
            .map_err(|e| ExitError::new(EXIT_DIRTY, format!("report serialization: {e}")))?;
    } else {
        print_report_human(report, status);
    }
    Ok(())
}
