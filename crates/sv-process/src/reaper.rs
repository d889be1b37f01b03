// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Reaps spawned children asynchronously, translating each exit into the
//! `(JobId, ProcessKind, ExitStatus)` triple `Supervisor::child_exit`
//! expects.

use std::os::unix::process::ExitStatusExt;

use sv_core::{JobId, ProcessKind};
use sv_engine::ExitStatus as EngineExitStatus;
use tokio::process::Child;
use tokio::sync::mpsc::UnboundedSender;

/// One child's terminal outcome, fed back so only the single-threaded
/// main loop ever calls `Supervisor::child_exit`.
#[derive(Debug, Clone)]
pub struct Reaped {
    pub job: JobId,
    pub kind: ProcessKind,
    pub status: EngineExitStatus,
}

/// Spawn a background task that awaits `child`'s exit and reports it on
/// `tx`. One task per child is simpler than a pid-keyed SIGCHLD dispatch
/// table, since `tokio::process::Child::wait` already demultiplexes
/// `waitpid` for us — the job/kind this child belongs to is known at
/// spawn time and travels with the task closure instead of needing a
/// separate pid-to-job reverse lookup.
pub fn watch(mut child: Child, job: JobId, kind: ProcessKind, tx: UnboundedSender<Reaped>) {
    tokio::spawn(async move {
        let status = match child.wait().await {
            Ok(status) => engine_status(status),
            Err(_) => EngineExitStatus::Code(-1),
        };
        let _ = tx.send(Reaped { job, kind, status });
    });
}

fn engine_status(status: std::process::ExitStatus) -> EngineExitStatus {
    match status.signal() {
        Some(signal) => EngineExitStatus::Signal(signal),
        None => EngineExitStatus::Code(status.code().unwrap_or(-1)),
    }
}

#[cfg(test)]
#[path = "reaper_tests.rs"]
mod tests;
