// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! skiff-engine: the per-drive sync engine
//!
//! One engine instance serves one drive. A cycle observes both sides,
//! coalesces events, plans actions against the baseline, executes with
//! resumable transfers, and commits each outcome durably; the delta cursor
//! advances only once every outcome of the cycle has committed.

pub mod buffer;
pub mod conflicts;
pub mod engine;
pub mod executor;
pub mod observer;
pub mod planner;
pub mod tracker;
pub mod transfer;

pub use buffer::ChangeBuffer;
pub use conflicts::{resolve_batch, Selector};
pub use engine::{Engine, EngineState, WatchOptions};
pub use executor::Executor;
pub use observer::local::{LocalObserver, ObserverState};
pub use observer::remote::{Observation, RemoteObserver};
pub use planner::{plan, PlannerInput, PlannerOutput};
pub use tracker::Tracker;
