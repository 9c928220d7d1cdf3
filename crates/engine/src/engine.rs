// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cycle orchestration
//!
//! `run_once` drives one cycle (observe both sides, plan, execute,
//! commit); `run_watch` repeats cycles on local-event arrival plus a
//! periodic safety scan. Every suspending call takes the cycle's cancellation
//! token. A cycle is a unit of atomicity for the cursor only: individual
//! outcomes are already durable when it ends.

use crate::buffer::ChangeBuffer;
use crate::executor::Executor;
use crate::observer::local::watch::LocalWatcher;
use crate::observer::local::LocalObserver;
use crate::observer::remote::{Observation, RemoteObserver};
use crate::planner::{self, PlannerInput};
use crate::tracker::Tracker;
use parking_lot::Mutex;
use skiff_core::{
    ChangeEvent, Clock, EngineConfig, ExclusionSet, HasherFactory, Origin, SyncError, SyncMode,
    SyncReport,
};
use skiff_remote::RemoteClient;
use skiff_store::{BaselineStore, DriveIdentity, SessionStore};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Engine cycle state, exposed for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Idle,
    Observing,
    Planning,
    Executing,
    Committing,
    Failed,
}

/// Options for watch mode.
#[derive(Debug, Clone, Default)]
pub struct WatchOptions {
    /// Stop after this many cycles (tests and bounded runs).
    pub max_cycles: Option<u64>,
}

/// One engine instance serves one drive.
pub struct Engine<R, C: Clock> {
    remote: Arc<R>,
    store: Arc<BaselineStore<C>>,
    sessions: Arc<SessionStore>,
    tracker: Arc<Tracker<C>>,
    config: Arc<EngineConfig>,
    hasher: HasherFactory,
    clock: C,
    cancel: CancellationToken,
    local: LocalObserver,
    observer: RemoteObserver<R>,
    state: Mutex<EngineState>,
}

impl<R: RemoteClient, C: Clock> Engine<R, C> {
    /// Open the engine: create directories, take the baseline lock, wire
    /// the observers. Remote identity is verified at the start of each
    /// cycle, not here, so an engine can be constructed offline.
    pub fn open(
        remote: Arc<R>,
        config: EngineConfig,
        hasher: HasherFactory,
        clock: C,
    ) -> Result<Self, SyncError> {
        config.validate()?;
        std::fs::create_dir_all(&config.sync_root).map_err(|e| SyncError::LocalIo {
            path: config.sync_root.clone(),
            source: e,
        })?;
        std::fs::create_dir_all(&config.state_dir).map_err(|e| SyncError::LocalIo {
            path: config.state_dir.clone(),
            source: e,
        })?;

        let store = BaselineStore::open(
            &config.baseline_snapshot_path(),
            &config.baseline_wal_path(),
            &config.baseline_lock_path(),
            clock.clone(),
        )
        .map_err(SyncError::from)?;
        let sessions = SessionStore::new(config.sessions_dir());
        let excludes = ExclusionSet::new(&config.exclusions, config.excludes_case_sensitive())
            .map_err(|e| SyncError::Config(format!("bad exclusion pattern: {e}")))?;

        let local = LocalObserver::new(
            config.sync_root.clone(),
            excludes,
            Arc::clone(&hasher),
            config.check_workers,
        );
        let observer = RemoteObserver::new(
            Arc::clone(&remote),
            config.drive_id.clone(),
            config.prefer_remote_alias,
        );

        Ok(Self {
            remote,
            store: Arc::new(store),
            sessions: Arc::new(sessions),
            tracker: Arc::new(Tracker::new(clock.clone())),
            config: Arc::new(config),
            hasher,
            clock,
            cancel: CancellationToken::new(),
            local,
            observer,
            state: Mutex::new(EngineState::Idle),
        })
    }

    /// Token canceling every in-flight cycle of this engine.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn state(&self) -> EngineState {
        *self.state.lock()
    }

    pub fn store(&self) -> &Arc<BaselineStore<C>> {
        &self.store
    }

    /// Run one full cycle with a fresh local scan.
    pub async fn run_once(&self, mode: SyncMode) -> Result<SyncReport, SyncError> {
        let result = self.cycle(mode, None).await;
        *self.state.lock() = match &result {
            Ok(_) => EngineState::Idle,
            Err(_) => EngineState::Failed,
        };
        result
    }

    /// Repeat cycles driven by watcher events and a periodic safety scan.
    ///
    /// Returns when canceled (Ok) or on a fatal error; cursor expiry is
    /// handled inside the cycle with a full rescan, deletion of the sync
    /// root terminates with [`SyncError::SyncRootDeleted`].
    pub async fn run_watch(
        &self,
        mode: SyncMode,
        opts: WatchOptions,
    ) -> Result<(), SyncError> {
        let cancel = self.cancel.clone();
        let (event_tx, mut event_rx) = mpsc::channel(self.config.event_channel_cap);
        let (error_tx, mut error_rx) = mpsc::channel(8);
        let watcher = LocalWatcher::spawn(
            self.config.sync_root.clone(),
            self.local.excludes(),
            self.local.hasher(),
            self.config.debounce(),
            event_tx,
            error_tx,
            self.local.state_cell(),
            self.local.dropped_cell(),
            cancel.clone(),
        );

        // Initial convergence pass with a full scan.
        let mut cycles: u64 = 0;
        if !self.paused() {
            self.run_once(mode).await?;
            cycles += 1;
        }

        let mut safety = tokio::time::interval(self.config.safety_scan_interval());
        safety.reset();
        let result = loop {
            if let Some(max) = opts.max_cycles {
                if cycles >= max {
                    break Ok(());
                }
            }
            tokio::select! {
                _ = cancel.cancelled() => break Ok(()),
                err = error_rx.recv() => {
                    match err {
                        Some(e @ SyncError::SyncRootDeleted) => break Err(e),
                        Some(e) => {
                            tracing::warn!(error = %e, "observer error in watch mode");
                        }
                        None => break Ok(()),
                    }
                }
                event = event_rx.recv() => {
                    let Some(event) = event else { break Ok(()) };
                    if self.paused() {
                        continue;
                    }
                    let mut batch = vec![event];
                    // Drain whatever else settled in the same burst.
                    while let Ok(more) = event_rx.try_recv() {
                        batch.push(more);
                    }
                    match self.cycle(mode, Some(batch)).await {
                        Ok(_) => cycles += 1,
                        Err(e) if e.is_fatal() => break Err(e),
                        Err(SyncError::BufferOverflow { .. }) => {
                            // Fall back to a full rescan cycle.
                            match self.run_once(mode).await {
                                Ok(_) => cycles += 1,
                                Err(e) => break Err(e),
                            }
                        }
                        Err(SyncError::ContextCanceled) => break Ok(()),
                        Err(e) => {
                            tracing::warn!(error = %e, "cycle failed; continuing watch");
                        }
                    }
                }
                _ = safety.tick() => {
                    if self.paused() {
                        continue;
                    }
                    match self.run_once(mode).await {
                        Ok(_) => cycles += 1,
                        Err(e) if e.is_fatal() => break Err(e),
                        Err(SyncError::ContextCanceled) => break Ok(()),
                        Err(e) => {
                            tracing::warn!(error = %e, "safety scan cycle failed");
                        }
                    }
                }
            }
        };
        watcher.abort();
        result
    }

    fn paused(&self) -> bool {
        self.config.pause_marker().exists()
    }

    /// One cycle. `local_events` of `None` runs a full scan (one-shot
    /// mode and safety scans); `Some` uses watcher output.
    async fn cycle(
        &self,
        mode: SyncMode,
        local_events: Option<Vec<ChangeEvent>>,
    ) -> Result<SyncReport, SyncError> {
        let started = Instant::now();
        let cancel = self.cancel.child_token();
        let mut report = SyncReport::default();

        *self.state.lock() = EngineState::Observing;
        self.verify_identity().await?;

        let baseline = self.store.load();
        let cursor = self.store.cursor();

        // Both observers run concurrently within the cycle.
        let (remote_result, local_result) = match local_events {
            Some(events) => (
                self.observer.observe(&baseline, cursor.as_ref(), &cancel).await,
                Ok(events),
            ),
            None => {
                tokio::join!(
                    self.observer.observe(&baseline, cursor.as_ref(), &cancel),
                    self.local.scan(&baseline, &cancel)
                )
            }
        };
        let local_events = local_result?;
        let observation = match remote_result {
            Ok(obs) => obs,
            Err(SyncError::CursorExpired) => {
                // Distinguished error: drop the cursor, restart with an
                // initial sync against a fresh full scan.
                tracing::info!("delta cursor expired; performing full rescan");
                report.delta_reset = true;
                self.store.set_cursor(None).map_err(SyncError::from)?;
                self.observer.observe(&baseline, None, &cancel).await?
            }
            Err(e) => return Err(e),
        };

        let report = self
            .plan_and_execute(mode, &baseline, local_events, observation, report, &cancel)
            .await;
        let mut report = report?;
        report.duration_ms = started.elapsed().as_millis() as u64;
        Ok(report)
    }

    async fn plan_and_execute(
        &self,
        mode: SyncMode,
        baseline: &skiff_store::Baseline,
        local_events: Vec<ChangeEvent>,
        observation: Observation,
        mut report: SyncReport,
        cancel: &CancellationToken,
    ) -> Result<SyncReport, SyncError> {
        // Coalesce per path, one buffer per side.
        let mut local_buffer = ChangeBuffer::new(self.config.buffer_cap);
        let mut remote_buffer = ChangeBuffer::new(self.config.buffer_cap);
        for event in local_events {
            debug_assert_eq!(event.origin, Origin::Local);
            local_buffer.push(event)?;
        }
        for event in observation.events {
            debug_assert_eq!(event.origin, Origin::Remote);
            remote_buffer.push(event)?;
        }
        report.dropped_events = self.local.take_dropped();
        let local_batch = local_buffer.flush();
        let remote_batch = remote_buffer.flush();

        *self.state.lock() = EngineState::Planning;
        let planned = planner::plan(PlannerInput {
            baseline,
            local: &local_batch,
            remote: &remote_batch,
            mode,
            config: &self.config,
        })?;
        for conflict in &planned.new_conflicts {
            report.conflicts_detected += 1;
            tracing::warn!(
                path = %conflict.path,
                kind = conflict.kind.as_str(),
                "conflict detected"
            );
            // A dry run reports would-be conflicts without recording them.
            if mode != SyncMode::DryRun {
                self.store
                    .record_conflict(conflict.clone())
                    .map_err(SyncError::from)?;
            }
        }

        if mode == SyncMode::DryRun {
            // Report what would happen; nothing executes, nothing commits.
            for action in &planned.plan.actions {
                report.record_success(action.kind);
            }
            report.converged = planned.plan.converged.len() as u64;
            return Ok(report);
        }

        *self.state.lock() = EngineState::Executing;
        let final_cursor = if mode == SyncMode::UploadOnly || planned.deferred > 0 {
            // Upload-only cycles drop pull actions, and conflicted paths
            // defer their remote events; either way the un-applied
            // changes must surface again next observation.
            None
        } else {
            observation.new_cursor
        };
        let executor = Executor::new(
            Arc::clone(&self.remote),
            Arc::clone(&self.store),
            Arc::clone(&self.sessions),
            Arc::clone(&self.tracker),
            Arc::clone(&self.config),
            Arc::clone(&self.hasher),
            self.clock.clone(),
        );
        executor
            .execute(planned.plan, final_cursor, cancel, &mut report)
            .await?;

        *self.state.lock() = EngineState::Committing;
        self.store
            .checkpoint(self.config.tombstone_retention_secs * 1000)
            .map_err(SyncError::from)?;
        Ok(report)
    }

    /// The configured drive must match what the remote reports for this
    /// token; the stored identity must match both.
    async fn verify_identity(&self) -> Result<(), SyncError> {
        let drive = self
            .remote
            .primary_drive()
            .await
            .map_err(SyncError::from)?;
        if drive.id != self.config.drive_id {
            return Err(SyncError::DriveIdentityMismatch {
                configured: self.config.drive_id.to_string(),
                actual: drive.id.to_string(),
            });
        }
        match self.store.identity() {
            Some(identity) => {
                if identity.drive_id != drive.id.as_str() {
                    return Err(SyncError::DriveIdentityMismatch {
                        configured: identity.drive_id,
                        actual: drive.id.to_string(),
                    });
                }
            }
            None => {
                self.store
                    .record_identity(DriveIdentity {
                        drive_id: drive.id.to_string(),
                        drive_type: drive.drive_type.clone(),
                        owner_email: drive.owner_email.clone(),
                        created_at_ms: self.clock.epoch_ms(),
                    })
                    .map_err(SyncError::from)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
