// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn new_job() -> Job {
    Job::new(JobId::new("job-1"), "sshd", ClassId::new("null/sshd"))
}

#[test]
fn fresh_job_is_terminal_resting() {
    let job = new_job();
    assert!(job.is_terminal_resting());
    assert!(job.has_no_live_pids());
}

#[test]
fn setting_a_pid_breaks_no_live_pids() {
    let mut job = new_job();
    job.set_pid(ProcessKind::Main, Pid(1234));
    assert!(!job.has_no_live_pids());
    assert_eq!(job.pid_of(ProcessKind::Main), Pid(1234));
}

#[test]
fn clearing_a_pid_removes_the_entry() {
    let mut job = new_job();
    job.set_pid(ProcessKind::Main, Pid(1234));
    job.set_pid(ProcessKind::Main, Pid::NONE);
    assert!(job.has_no_live_pids());
    assert!(job.pid_of(ProcessKind::Main).is_none());
}

#[test]
fn stopping_side_states_are_identified() {
    assert!(JobState::PreStop.is_stopping_side());
    assert!(JobState::Killed.is_stopping_side());
    assert!(!JobState::Running.is_stopping_side());
    assert!(!JobState::Waiting.is_stopping_side());
}

#[test]
fn starting_goal_start_is_not_terminal_resting() {
    let mut job = new_job();
    job.goal = JobGoal::Start;
    job.state = JobState::Running;
    assert!(!job.is_terminal_resting());
}
