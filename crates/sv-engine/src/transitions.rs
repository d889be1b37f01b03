// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The per-job state machine: `(goal, external input) -> new state`,
//! emitting the side effects (spawns, signals, timers) the Process
//! Supervisor and Scheduler must carry out. See SPEC_FULL.md §4.3.

use std::time::Duration;
use sv_core::{
    ExpectPolicy, ExpectTraceState, Job, JobClassDefinition, JobGoal, JobState, NormalExit, Pid,
    ProcessKind,
};

use crate::scheduler::TimerKind;

/// What happened to a child process, as reported by the reaper.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    Code(i32),
    Signal(i32),
}

/// The stimuli the transition table reacts to, per §4.3.
#[derive(Debug, Clone, Copy)]
pub enum ExternalInput {
    ChildExit { kind: ProcessKind, status: ExitStatus },
    TimerExpiry(TimerKind),
    /// One `expect=fork|daemon` trace event observed for the main process.
    ForkTrace,
    /// The main process raised SIGSTOP, satisfying `expect=stop`.
    StopTrace,
}

/// A side effect the transition table asks the caller to carry out. The
/// caller (eventually `sv-process`/the main loop) is the only thing that
/// touches real file descriptors and pids; this module only ever mutates
/// the in-memory `Job`.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Spawn { kind: ProcessKind },
    Signal { kind: ProcessKind, signal: i32 },
    ArmTimer { kind: TimerKind, duration: Duration },
    CancelTimer { kind: TimerKind },
    CancelAllTimers,
    /// The job reached `(Stop, Waiting)` and, if unreferenced, is now
    /// eligible for deletion (invariant 3, §8).
    Resting,
}

/// Request a job start: sets `goal=Start` and, if currently resting,
/// enters the start sequence.
pub fn request_start(job: &mut Job, class: &JobClassDefinition) -> Vec<Effect> {
    job.goal = JobGoal::Start;
    if job.state == JobState::Waiting {
        enter_starting(job, class)
    } else if job.state.is_stopping_side() {
        // Finish the stop sequence first; `reach_waiting` re-checks `goal`
        // and re-enters Starting once it lands on Waiting.
        Vec::new()
    } else {
        Vec::new()
    }
}

/// Request a job stop: sets `goal=Stop` and, if currently running the
/// start side of the machine, begins the stop sequence.
pub fn request_stop(job: &mut Job, class: &JobClassDefinition) -> Vec<Effect> {
    job.goal = JobGoal::Stop;
    if job.state == JobState::Waiting || job.state.is_stopping_side() {
        Vec::new()
    } else {
        enter_prestop(job, class)
    }
}

/// `rpc_reload`: signal the main process's `reload_signal` without
/// touching the state machine (§4.3, "Reload").
pub fn reload_signal(class: &JobClassDefinition) -> Vec<Effect> {
    vec![Effect::Signal {
        kind: ProcessKind::Main,
        signal: class.reload_signal,
    }]
}

/// Advance the machine in response to one external input. `now_ms` is the
/// wall-clock reading (from [`sv_core::Clock::epoch_ms`]) used to stamp the
/// respawn rate limiter's sliding window; it is otherwise unused.
pub fn advance(
    job: &mut Job,
    class: &JobClassDefinition,
    input: ExternalInput,
    now_ms: u64,
) -> Vec<Effect> {
    match input {
        ExternalInput::ChildExit { kind, status } => on_child_exit(job, class, kind, status, now_ms),
        ExternalInput::TimerExpiry(TimerKind::Kill) => on_kill_timer_expiry(job, class),
        ExternalInput::TimerExpiry(TimerKind::Expect) => on_expect_timeout(job, class),
        ExternalInput::TimerExpiry(TimerKind::RespawnCooldown) => Vec::new(),
        ExternalInput::ForkTrace => on_fork_trace(job, class),
        ExternalInput::StopTrace => on_stop_trace(job, class),
    }
}

fn enter_starting(job: &mut Job, class: &JobClassDefinition) -> Vec<Effect> {
    job.state = JobState::Starting;
    enter_prestart(job, class)
}

fn enter_prestart(job: &mut Job, class: &JobClassDefinition) -> Vec<Effect> {
    if class.process_slot(ProcessKind::PreStart).is_some() {
        job.state = JobState::PreStart;
        vec![Effect::Spawn { kind: ProcessKind::PreStart }]
    } else {
        enter_spawned(job, class)
    }
}

fn enter_spawned(job: &mut Job, class: &JobClassDefinition) -> Vec<Effect> {
    job.state = JobState::Spawned;
    let mut effects = vec![Effect::Spawn { kind: ProcessKind::Main }];
    match class.expect {
        ExpectPolicy::None => effects.extend(enter_poststart(job, class)),
        ExpectPolicy::Fork => {
            job.trace_forks = 0;
            job.trace_state = ExpectTraceState::WaitingForFork;
            effects.push(Effect::ArmTimer {
                kind: TimerKind::Expect,
                duration: Duration::from_secs(10),
            });
        }
        ExpectPolicy::Daemon => {
            job.trace_forks = 0;
            job.trace_state = ExpectTraceState::WaitingForFork;
            effects.push(Effect::ArmTimer {
                kind: TimerKind::Expect,
                duration: Duration::from_secs(10),
            });
        }
        ExpectPolicy::Stop => {
            job.trace_state = ExpectTraceState::WaitingForStop;
            effects.push(Effect::ArmTimer {
                kind: TimerKind::Expect,
                duration: Duration::from_secs(10),
            });
        }
    }
    effects
}

fn on_fork_trace(job: &mut Job, class: &JobClassDefinition) -> Vec<Effect> {
    if job.state != JobState::Spawned {
        return Vec::new();
    }
    let required = match class.expect {
        ExpectPolicy::Fork => 1,
        ExpectPolicy::Daemon => 2,
        _ => return Vec::new(),
    };
    job.trace_forks += 1;
    if job.trace_forks >= required {
        job.trace_state = ExpectTraceState::Ready;
        let mut effects = vec![Effect::CancelTimer { kind: TimerKind::Expect }];
        effects.extend(enter_poststart(job, class));
        effects
    } else {
        Vec::new()
    }
}

fn on_stop_trace(job: &mut Job, class: &JobClassDefinition) -> Vec<Effect> {
    if job.state != JobState::Spawned || class.expect != ExpectPolicy::Stop {
        return Vec::new();
    }
    job.trace_state = ExpectTraceState::Ready;
    let mut effects = vec![
        Effect::CancelTimer { kind: TimerKind::Expect },
        Effect::Signal { kind: ProcessKind::Main, signal: SIGCONT },
    ];
    effects.extend(enter_poststart(job, class));
    effects
}

fn on_expect_timeout(job: &mut Job, class: &JobClassDefinition) -> Vec<Effect> {
    if job.state != JobState::Spawned {
        return Vec::new();
    }
    // Pidfile/daemon expectations timing out is treated as a process
    // failure (§4.3).
    job.failed = true;
    job.failed_process = Some(ProcessKind::Main);
    begin_forced_stop(job, class)
}

fn enter_poststart(job: &mut Job, class: &JobClassDefinition) -> Vec<Effect> {
    if class.process_slot(ProcessKind::PostStart).is_some() {
        job.state = JobState::PostStart;
        vec![Effect::Spawn { kind: ProcessKind::PostStart }]
    } else {
        enter_running(job)
    }
}

fn enter_running(job: &mut Job) -> Vec<Effect> {
    job.state = JobState::Running;
    Vec::new()
}

fn enter_prestop(job: &mut Job, class: &JobClassDefinition) -> Vec<Effect> {
    if class.process_slot(ProcessKind::PreStop).is_some() {
        job.state = JobState::PreStop;
        vec![Effect::Spawn { kind: ProcessKind::PreStop }]
    } else {
        enter_stopping(job, class)
    }
}

fn enter_stopping(job: &mut Job, class: &JobClassDefinition) -> Vec<Effect> {
    job.state = JobState::Stopping;
    enter_killed(job, class)
}

fn enter_killed(job: &mut Job, class: &JobClassDefinition) -> Vec<Effect> {
    job.state = JobState::Killed;
    job.kill_process = Some(ProcessKind::Main);
    if job.pid_of(ProcessKind::Main).is_none() {
        // Nothing to signal (respawn exhaustion after the child already
        // exited); proceed straight through.
        return on_killed_exit(job, class);
    }
    vec![
        Effect::Signal { kind: ProcessKind::Main, signal: class.kill_signal },
        Effect::ArmTimer {
            kind: TimerKind::Kill,
            duration: Duration::from_secs(class.kill_timeout_secs),
        },
    ]
}

fn on_kill_timer_expiry(job: &mut Job, _class: &JobClassDefinition) -> Vec<Effect> {
    if job.state != JobState::Killed {
        return Vec::new();
    }
    vec![Effect::Signal { kind: ProcessKind::Main, signal: SIGKILL }]
}

fn on_killed_exit(job: &mut Job, class: &JobClassDefinition) -> Vec<Effect> {
    job.set_pid(ProcessKind::Main, Pid::NONE);
    job.kill_process = None;
    let mut effects = vec![Effect::CancelTimer { kind: TimerKind::Kill }];
    effects.extend(enter_poststop(job, class));
    effects
}

fn enter_poststop(job: &mut Job, class: &JobClassDefinition) -> Vec<Effect> {
    if class.process_slot(ProcessKind::PostStop).is_some() {
        job.state = JobState::PostStop;
        vec![Effect::Spawn { kind: ProcessKind::PostStop }]
    } else {
        reach_waiting(job, class)
    }
}

fn reach_waiting(job: &mut Job, class: &JobClassDefinition) -> Vec<Effect> {
    job.state = JobState::Waiting;
    job.failed = false;
    job.failed_process = None;
    job.trace_state = ExpectTraceState::Idle;
    let mut effects = vec![Effect::CancelAllTimers];
    if job.goal == JobGoal::Start {
        // Goal flipped to Start mid-stop; re-enter Starting as if a fresh
        // start request just arrived (§4.3, last bullet).
        effects.extend(enter_starting(job, class));
    } else {
        effects.push(Effect::Resting);
    }
    effects
}

/// Force a job directly into the stop chain regardless of its current
/// position on the start side, used for exec failures and expect timeouts.
fn begin_forced_stop(job: &mut Job, class: &JobClassDefinition) -> Vec<Effect> {
    job.goal = JobGoal::Stop;
    enter_prestop(job, class)
}

fn on_child_exit(
    job: &mut Job,
    class: &JobClassDefinition,
    kind: ProcessKind,
    status: ExitStatus,
    now_ms: u64,
) -> Vec<Effect> {
    job.set_pid(kind, Pid::NONE);
    job.exit_status = Some(encode_status(status));

    match (job.state, kind) {
        (JobState::PreStart, ProcessKind::PreStart) => {
            if is_clean_script_exit(status) {
                enter_spawned(job, class)
            } else {
                job.failed = true;
                job.failed_process = Some(ProcessKind::PreStart);
                begin_forced_stop(job, class)
            }
        }
        (JobState::PostStart, ProcessKind::PostStart) => {
            if is_clean_script_exit(status) {
                enter_running(job)
            } else {
                job.failed = true;
                job.failed_process = Some(ProcessKind::PostStart);
                begin_forced_stop(job, class)
            }
        }
        (JobState::PreStop, ProcessKind::PreStop) => enter_stopping(job, class),
        (JobState::Killed, ProcessKind::Main) => on_killed_exit(job, class),
        (JobState::PostStop, ProcessKind::PostStop) => reach_waiting(job, class),
        (JobState::Spawned, ProcessKind::Main) => {
            // The main process died before satisfying `expect`; always a
            // failure, not eligible for respawn mid-handshake.
            job.failed = true;
            job.failed_process = Some(ProcessKind::Main);
            begin_forced_stop(job, class)
        }
        (JobState::Running, ProcessKind::Main) => {
            on_running_main_exit(job, class, status, now_ms)
        }
        _ => Vec::new(),
    }
}

fn on_running_main_exit(
    job: &mut Job,
    class: &JobClassDefinition,
    status: ExitStatus,
    now_ms: u64,
) -> Vec<Effect> {
    let normal = is_normal_exit(class, status);

    if class.respawn.enabled && job.goal == JobGoal::Start {
        crate::respawn::record_attempt(&mut job.respawn_history, now_ms, class.respawn.interval_secs);
        if crate::respawn::exceeds_limit(
            &job.respawn_history,
            class.respawn.limit,
            class.respawn.interval_secs,
            now_ms,
        ) {
            job.failed = true;
            if !normal {
                job.failed_process = Some(ProcessKind::Main);
            }
            return begin_forced_stop(job, class);
        }
        return enter_starting(job, class);
    }

    if !normal {
        job.failed = true;
        job.failed_process = Some(ProcessKind::Main);
    }
    job.goal = JobGoal::Stop;
    enter_prestop(job, class)
}

fn is_clean_script_exit(status: ExitStatus) -> bool {
    matches!(status, ExitStatus::Code(0))
}

fn is_normal_exit(class: &JobClassDefinition, status: ExitStatus) -> bool {
    class.respawn.normal_exit.iter().any(|allowed| match (allowed, status) {
        (NormalExit::Status(s), ExitStatus::Code(c)) => *s == c,
        (NormalExit::Signal(s), ExitStatus::Signal(sig)) => *s == sig,
        _ => false,
    }) || matches!(status, ExitStatus::Code(0))
}

fn encode_status(status: ExitStatus) -> i32 {
    match status {
        ExitStatus::Code(code) => code,
        ExitStatus::Signal(sig) => sig | 0x80,
    }
}

const SIGCONT: i32 = 18;
const SIGKILL: i32 = 9;

#[cfg(test)]
#[path = "transitions_tests.rs"]
mod tests;
