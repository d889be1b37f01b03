// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use sv_core::{ClassId, JobId, ProcessSlot};

fn minimal_class() -> JobClassDefinition {
    JobClassDefinition {
        name: "sshd".into(),
        description: None,
        author: None,
        version: None,
        usage: None,
        process: vec![ProcessSlot {
            kind: ProcessKind::Main,
            is_script: false,
            command: "/usr/sbin/sshd -D".into(),
        }],
        start_on: None,
        stop_on: None,
        emits: Vec::new(),
        instance: String::new(),
        respawn: sv_core::RespawnPolicy::default(),
        kill_signal: 15,
        kill_timeout_secs: 5,
        reload_signal: 1,
        expect: ExpectPolicy::None,
        console: Default::default(),
        umask: None,
        nice: None,
        oom_score_adj: None,
        rlimits: Default::default(),
        chroot: None,
        chdir: None,
        setuid: None,
        setgid: None,
        apparmor_switch: None,
        env: Default::default(),
        export: Vec::new(),
        task: false,
        session: None,
        deleted: false,
    }
}

fn job() -> Job {
    Job::new(JobId::new("job-1"), "sshd", ClassId::new("null/sshd"))
}

#[test]
fn start_with_no_optional_slots_reaches_running_immediately() {
    let mut job = job();
    let class = minimal_class();
    let effects = request_start(&mut job, &class);
    assert_eq!(job.state, JobState::Running);
    assert_eq!(effects, vec![Effect::Spawn { kind: ProcessKind::Main }]);
}

#[test]
fn prestart_spawns_before_main() {
    let mut job = job();
    let mut class = minimal_class();
    class.process.push(ProcessSlot {
        kind: ProcessKind::PreStart,
        is_script: false,
        command: "mkdir -p /run/sshd".into(),
    });

    let effects = request_start(&mut job, &class);
    assert_eq!(job.state, JobState::PreStart);
    assert_eq!(effects, vec![Effect::Spawn { kind: ProcessKind::PreStart }]);

    let effects = advance(
        &mut job,
        &class,
        ExternalInput::ChildExit { kind: ProcessKind::PreStart, status: ExitStatus::Code(0) },
        0,
    );
    assert_eq!(job.state, JobState::Running);
    assert_eq!(effects, vec![Effect::Spawn { kind: ProcessKind::Main }]);
}

#[test]
fn failed_prestart_aborts_the_start_and_heads_to_stop() {
    let mut job = job();
    let mut class = minimal_class();
    class.process.push(ProcessSlot {
        kind: ProcessKind::PreStart,
        is_script: false,
        command: "false".into(),
    });
    request_start(&mut job, &class);

    advance(
        &mut job,
        &class,
        ExternalInput::ChildExit { kind: ProcessKind::PreStart, status: ExitStatus::Code(1) },
        0,
    );

    assert!(job.failed);
    assert_eq!(job.failed_process, Some(ProcessKind::PreStart));
    assert_eq!(job.state, JobState::Killed);
}

#[test]
fn expect_fork_waits_for_one_trace_event() {
    let mut job = job();
    let mut class = minimal_class();
    class.expect = ExpectPolicy::Fork;

    let effects = request_start(&mut job, &class);
    assert_eq!(job.state, JobState::Spawned);
    assert!(effects.iter().any(|e| matches!(e, Effect::ArmTimer { kind: TimerKind::Expect, .. })));

    let effects = advance(&mut job, &class, ExternalInput::ForkTrace, 0);
    assert_eq!(job.state, JobState::Running);
    assert!(effects.contains(&Effect::CancelTimer { kind: TimerKind::Expect }));
}

#[test]
fn stop_from_running_sends_kill_signal_and_arms_timer() {
    let mut job = job();
    let class = minimal_class();
    request_start(&mut job, &class);
    job.set_pid(ProcessKind::Main, sv_core::Pid(1234));

    let effects = request_stop(&mut job, &class);
    assert_eq!(job.state, JobState::Killed);
    assert_eq!(
        effects,
        vec![
            Effect::Signal { kind: ProcessKind::Main, signal: 15 },
            Effect::ArmTimer { kind: TimerKind::Kill, duration: std::time::Duration::from_secs(5) },
        ]
    );
}

#[test]
fn kill_timeout_escalates_to_sigkill() {
    let mut job = job();
    let class = minimal_class();
    request_start(&mut job, &class);
    job.set_pid(ProcessKind::Main, sv_core::Pid(1234));
    request_stop(&mut job, &class);

    let effects = advance(&mut job, &class, ExternalInput::TimerExpiry(TimerKind::Kill), 0);
    assert_eq!(effects, vec![Effect::Signal { kind: ProcessKind::Main, signal: 9 }]);
}

#[test]
fn main_exit_while_killed_reaches_waiting_and_rests() {
    let mut job = job();
    let class = minimal_class();
    request_start(&mut job, &class);
    job.set_pid(ProcessKind::Main, sv_core::Pid(1234));
    request_stop(&mut job, &class);

    let effects = advance(
        &mut job,
        &class,
        ExternalInput::ChildExit { kind: ProcessKind::Main, status: ExitStatus::Signal(15) },
        0,
    );

    assert_eq!(job.state, JobState::Waiting);
    assert!(job.is_terminal_resting());
    assert!(effects.contains(&Effect::Resting));
}

#[test]
fn respawn_storm_fails_after_exceeding_the_limit() {
    let mut job = job();
    let mut class = minimal_class();
    class.respawn.enabled = true;
    class.respawn.limit = 3;
    class.respawn.interval_secs = 10;

    request_start(&mut job, &class);
    job.set_pid(ProcessKind::Main, sv_core::Pid(1));

    for (i, now_ms) in [1_000u64, 2_000, 3_000].into_iter().enumerate() {
        let effects = advance(
            &mut job,
            &class,
            ExternalInput::ChildExit { kind: ProcessKind::Main, status: ExitStatus::Code(1) },
            now_ms,
        );
        assert_eq!(job.state, JobState::Running, "respawn {i} should restart main");
        assert!(effects.contains(&Effect::Spawn { kind: ProcessKind::Main }));
        job.set_pid(ProcessKind::Main, sv_core::Pid(1));
    }

    // Fourth failure within the same 10s window exceeds limit=3.
    advance(
        &mut job,
        &class,
        ExternalInput::ChildExit { kind: ProcessKind::Main, status: ExitStatus::Code(1) },
        4_000,
    );

    assert!(job.failed);
    assert_eq!(job.failed_process, Some(ProcessKind::Main));
    assert_eq!(job.state, JobState::Waiting);
}

#[test]
fn goal_flip_to_start_mid_stop_restarts_once_waiting_is_reached() {
    let mut job = job();
    let class = minimal_class();
    request_start(&mut job, &class);
    job.set_pid(ProcessKind::Main, sv_core::Pid(1234));
    request_stop(&mut job, &class);

    // Client asks to start again before the stop sequence finishes.
    let effects = request_start(&mut job, &class);
    assert!(effects.is_empty());
    assert_eq!(job.goal, JobGoal::Start);
    assert_eq!(job.state, JobState::Killed);

    let effects = advance(
        &mut job,
        &class,
        ExternalInput::ChildExit { kind: ProcessKind::Main, status: ExitStatus::Signal(15) },
        0,
    );

    assert_eq!(job.state, JobState::Running);
    assert!(effects.contains(&Effect::Spawn { kind: ProcessKind::Main }));
}

#[test]
fn reload_signal_does_not_touch_state() {
    let class = minimal_class();
    let effects = reload_signal(&class);
    assert_eq!(effects, vec![Effect::Signal { kind: ProcessKind::Main, signal: 1 }]);
}
