// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::time::Duration;
use sv_core::JobId;

#[test]
fn fired_timers_drains_only_due_entries() {
    let mut scheduler = Scheduler::new();
    let now = Instant::now();
    let job = JobId::new("job-1");
    scheduler.set_timer(job.clone(), TimerKind::Kill, Duration::from_secs(1), now);
    scheduler.set_timer(job.clone(), TimerKind::Expect, Duration::from_secs(10), now);

    let fired = scheduler.fired_timers(now + Duration::from_secs(2));
    assert_eq!(fired, vec![FiredTimer { job, kind: TimerKind::Kill }]);
    assert!(scheduler.has_timers());
}

#[test]
fn cancel_timers_for_job_removes_every_kind() {
    let mut scheduler = Scheduler::new();
    let now = Instant::now();
    let job = JobId::new("job-1");
    scheduler.set_timer(job.clone(), TimerKind::Kill, Duration::from_secs(1), now);
    scheduler.set_timer(job.clone(), TimerKind::Expect, Duration::from_secs(1), now);

    scheduler.cancel_timers_for_job(&job);

    assert!(!scheduler.has_timers());
}

#[test]
fn cancel_timer_only_removes_the_named_kind() {
    let mut scheduler = Scheduler::new();
    let now = Instant::now();
    let job = JobId::new("job-1");
    scheduler.set_timer(job.clone(), TimerKind::Kill, Duration::from_secs(1), now);
    scheduler.set_timer(job.clone(), TimerKind::Expect, Duration::from_secs(1), now);

    scheduler.cancel_timer(&job, TimerKind::Kill);

    let fired = scheduler.fired_timers(now + Duration::from_secs(5));
    assert_eq!(fired, vec![FiredTimer { job, kind: TimerKind::Expect }]);
}

#[test]
fn next_deadline_reports_the_earliest_timer() {
    let mut scheduler = Scheduler::new();
    let now = Instant::now();
    let job = JobId::new("job-1");
    scheduler.set_timer(job.clone(), TimerKind::Kill, Duration::from_secs(5), now);
    scheduler.set_timer(job, TimerKind::Expect, Duration::from_secs(1), now);

    assert_eq!(scheduler.next_deadline(), Some(now + Duration::from_secs(1)));
}

#[test]
fn empty_scheduler_has_no_deadline() {
    let scheduler = Scheduler::new();
    assert_eq!(scheduler.next_deadline(), None);
    assert!(!scheduler.has_timers());
}
