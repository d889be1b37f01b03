// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Executes the `PendingAction`s a `Supervisor` step emits: spawning a
//! process slot or signaling a live one. The only place in `sv-daemon`
//! that touches `sv-process` directly.

use sv_core::{Pid, ProcessKind, SystemClock};
use sv_engine::{ExitStatus, PendingAction, Supervisor};
use sv_process::{FileLogSink, SpawnSpec};
use tokio::sync::mpsc::UnboundedSender;
use tracing::warn;

use sv_process::Reaped;

/// Drain and execute every pending action the last supervisor step
/// produced. A failed spawn is fed back as an immediate synthetic
/// `ExitStatus::Code(-1)` so the normal exit-handling transition (retry,
/// respawn-rate-limit, or fail) drives the outcome — a process that never
/// started is observably the same as one that exited at once.
pub fn execute_pending(
    supervisor: &mut Supervisor<SystemClock>,
    log_sink: &FileLogSink,
    reaped_tx: &UnboundedSender<Reaped>,
) {
    for action in supervisor.drain_pending_actions() {
        match action {
            PendingAction::Spawn { job, kind } => spawn_slot(supervisor, log_sink, reaped_tx, job, kind),
            PendingAction::Signal { job, kind, signal } => signal_slot(supervisor, job, kind, signal),
        }
    }
}

fn spawn_slot(
    supervisor: &mut Supervisor<SystemClock>,
    log_sink: &FileLogSink,
    reaped_tx: &UnboundedSender<Reaped>,
    job_id: sv_core::JobId,
    kind: ProcessKind,
) {
    let spec = {
        let Some(job) = supervisor.jobs().get(&job_id) else { return };
        let class_id = job.class.clone();
        let job_name = job.name.clone();
        let job_env = job.env.clone();
        let Some(class) = supervisor.class(&class_id) else {
            warn!(%job_id, "spawn requested for job with no resolvable class");
            return;
        };
        let Some(slot) = class.process_slot(kind) else {
            warn!(%job_id, ?kind, "spawn requested for a slot the class does not define");
            return;
        };
        SpawnSpec::for_slot(class, &job_name, kind, &slot.command, slot.is_script, job_env)
    };

    match spec {
        Ok(spec) => match sv_process::spawn(&spec, log_sink) {
            Ok(child) => {
                let pid = child.id().map(Pid).unwrap_or(Pid::NONE);
                if let Some(job) = supervisor.jobs_mut().get_mut(&job_id) {
                    job.set_pid(kind, pid);
                }
                sv_process::watch(child, job_id, kind, reaped_tx.clone());
            }
            Err(err) => {
                warn!(%job_id, ?kind, %err, "spawn failed");
                supervisor.child_exit(&job_id, kind, ExitStatus::Code(-1));
            }
        },
        Err(err) => {
            warn!(%job_id, ?kind, %err, "failed to build spawn spec");
            supervisor.child_exit(&job_id, kind, ExitStatus::Code(-1));
        }
    }
}

fn signal_slot(supervisor: &Supervisor<SystemClock>, job_id: sv_core::JobId, kind: ProcessKind, signal: i32) {
    let Some(job) = supervisor.jobs().get(&job_id) else { return };
    let pid = job.pid_of(kind);
    if pid.is_none() {
        return;
    }
    if let Err(err) = sv_process::send_to_group(pid, signal) {
        warn!(%job_id, ?kind, signal, %err, "failed to signal process");
    }
}
