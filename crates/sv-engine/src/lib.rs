// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The supervision engine: the Event Queue, operator-tree distribution
//! pass, Job Class Table cache, per-job state machine, and the
//! `Supervisor` aggregate that ties them together with the Configuration
//! Manager and the rest of `sv-core`. Holds no process-handling or I/O —
//! `sv-process` forks, execs, and reaps on the effects this crate emits.

pub mod distribution;
pub mod error;
pub mod queue;
pub mod respawn;
pub mod scheduler;
pub mod supervisor;
pub mod table;
pub mod transitions;

pub use distribution::{distribute, DistributionOutcome, StartFired, StopFired};
pub use error::EngineError;
pub use queue::EventQueue;
pub use scheduler::{FiredTimer, Scheduler, TimerKind};
pub use supervisor::{EngineSnapshot, PendingAction, Supervisor};
pub use table::{JobTable, JobTableOracle};
pub use transitions::{advance, reload_signal, request_start, request_stop, Effect, ExitStatus, ExternalInput};
