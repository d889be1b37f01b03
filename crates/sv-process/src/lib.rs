// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The Process Supervisor: fork/exec of process slots, pid-carrying
//! async reaping, signal delivery, and log-sink wiring. Consumes the
//! `Spawn`/`Signal` effects `sv-engine::Supervisor` emits; owns every
//! real file descriptor and pid the rest of the workspace only reasons
//! about abstractly.

pub mod error;
pub mod log_sink;
pub mod reaper;
pub mod signal;
pub mod spawn;

pub use error::SpawnError;
pub use log_sink::{FakeLogSink, FileLogSink, LogSink, NullLogSink};
pub use reaper::{watch, Reaped};
pub use signal::{is_alive, send_to_group};
pub use spawn::{spawn, SpawnSpec};
