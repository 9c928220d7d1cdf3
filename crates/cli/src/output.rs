// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Report and conflict rendering
//!
//! Interactive status lines go to stderr (suppressed by `--quiet`); data
//! output (`--json`, tables) goes to stdout.

use skiff_core::{ConflictRecord, SyncReport};

/// Stderr status printer honoring the quiet flag.
#[derive(Clone, Copy)]
pub struct Status {
    quiet: bool,
}

impl Status {
    pub fn new(quiet: bool) -> Self {
        Self { quiet }
    }

    pub fn say(&self, line: impl AsRef<str>) {
        if !self.quiet {
            eprintln!("{}", line.as_ref());
        }
    }
}

/// The report, verbatim, as pretty JSON.
pub fn report_json(report: &SyncReport) -> anyhow::Result<String> {
    Ok(serde_json::to_string_pretty(report)?)
}

/// Emit the report verbatim as JSON on stdout.
pub fn print_report_json(report: &SyncReport) -> anyhow::Result<()> {
    println!("{}", report_json(report)?);
    Ok(())
}

/// Human summary of a cycle.
pub fn print_report_human(report: &SyncReport, status: Status) {
    status.say(format!(
        "synced: {} down, {} up, {} deleted, {} folders, {} converged",
        report.downloads,
        report.uploads,
        report.local_deletes + report.remote_deletes,
        report.folders_created,
        report.converged,
    ));
    if report.conflicts_detected > 0 || report.conflicts_resolved > 0 {
        status.say(format!(
            "conflicts: {} detected, {} resolved",
            report.conflicts_detected, report.conflicts_resolved
        ));
    }
    if report.delta_reset {
        status.say("delta cursor was reset; a full rescan ran");
    }
    if report.dropped_events > 0 {
        status.say(format!(
            "warning: {} watcher events dropped this cycle",
            report.dropped_events
        ));
    }
    for err in &report.errors {
        status.say(format!(
            "failed: {} {} ({})",
            err.kind.as_str(),
            err.path,
            err.error
        ));
    }
    if report.errors_truncated > 0 {
        status.say(format!("... and {} more errors", report.errors_truncated));
    }
}

/// Conflict table for `skiff conflicts`.
pub fn print_conflicts_human(conflicts: &[ConflictRecord]) {
    if conflicts.is_empty() {
        println!("no conflicts");
        return;
    }
    println!(
        "{:<25} {:<14} {:<12} PATH",
        "ID", "TYPE", "RESOLUTION"
    );
    for c in conflicts {
        println!(
            "{:<25} {:<14} {:<12} {}",
            c.id,
            c.kind.as_str(),
            c.resolution.as_str(),
            c.path
        );
    }
}

pub fn conflicts_json(conflicts: &[ConflictRecord]) -> anyhow::Result<String> {
    Ok(serde_json::to_string_pretty(conflicts)?)
}

pub fn print_conflicts_json(conflicts: &[ConflictRecord]) -> anyhow::Result<()> {
    println!("{}", conflicts_json(conflicts)?);
    Ok(())
}

#[cfg(test)]
#[path = "output_tests.rs"]
mod tests;
