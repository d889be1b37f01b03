// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Timer management: kill-timeout, expect-timeout, and respawn-cooldown
//! timers, all driven through [`sv_core::Clock`] so tests can fast-forward
//! without sleeping.

use std::collections::HashMap;
use std::time::{Duration, Instant};
use sv_core::JobId;

/// Which deadline a timer represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    /// Armed on entering `Killed`; fires `kill_signal` escalates to SIGKILL.
    Kill,
    /// Armed on entering `Spawned` when `expect` is `fork` or `daemon`.
    Expect,
    /// Not currently armed by the transition table, reserved for a future
    /// cooldown-based limiter; the rate limiter here is window-based instead.
    RespawnCooldown,
}

fn key(job: &JobId, kind: TimerKind) -> String {
    format!("{}:{:?}", job.as_str(), kind)
}

struct Timer {
    fires_at: Instant,
}

/// A timer that has reached its deadline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FiredTimer {
    pub job: JobId,
    pub kind: TimerKind,
}

/// Manages every outstanding per-job timer for the engine.
#[derive(Default)]
pub struct Scheduler {
    timers: HashMap<String, (JobId, TimerKind, Timer)>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_timer(&mut self, job: JobId, kind: TimerKind, duration: Duration, now: Instant) {
        let fires_at = now + duration;
        self.timers
            .insert(key(&job, kind), (job, kind, Timer { fires_at }));
    }

    pub fn cancel_timer(&mut self, job: &JobId, kind: TimerKind) {
        self.timers.remove(&key(job, kind));
    }

    /// Cancel every timer armed for a job, e.g. once it reaches `Waiting`.
    pub fn cancel_timers_for_job(&mut self, job: &JobId) {
        let prefix = format!("{}:", job.as_str());
        self.timers.retain(|id, _| !id.starts_with(&prefix));
    }

    /// Drain every timer that has reached its deadline.
    pub fn fired_timers(&mut self, now: Instant) -> Vec<FiredTimer> {
        let due: Vec<String> = self
            .timers
            .iter()
            .filter(|(_, (_, _, timer))| timer.fires_at <= now)
            .map(|(id, _)| id.clone())
            .collect();

        due.into_iter()
            .filter_map(|id| {
                self.timers
                    .remove(&id)
                    .map(|(job, kind, _)| FiredTimer { job, kind })
            })
            .collect()
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.timers.values().map(|(_, _, t)| t.fires_at).min()
    }

    pub fn has_timers(&self) -> bool {
        !self.timers.is_empty()
    }
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
