// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job (instance) runtime state: the live, mutable counterpart to a
//! [`JobClassDefinition`](crate::class::JobClassDefinition).

use crate::class::ProcessKind;
use crate::id::{ClassId, EventId, JobId};
use crate::operator::OperatorTree;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};

/// The user-intended end state of a Job. `Respawn` is a transient value set
/// while the respawn path is re-entering `Starting`; it collapses back to
/// `Start` once the new cycle begins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobGoal {
    Stop,
    Start,
    Respawn,
}

/// Position in the state machine driven by `(goal, external input)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Waiting,
    Starting,
    PreStart,
    Spawned,
    PostStart,
    Running,
    PreStop,
    Stopping,
    Killed,
    PostStop,
}

impl JobState {
    /// Whether this state lies on the "stopping" side of the machine, used
    /// to decide whether a goal flip to `Start` must wait for the current
    /// stop sequence to finish before re-entering `Starting`.
    pub fn is_stopping_side(self) -> bool {
        matches!(
            self,
            JobState::PreStop | JobState::Stopping | JobState::Killed | JobState::PostStop
        )
    }
}

/// A single forked-off process belonging to a job, tracked by process
/// slot kind so the supervisor can tell main from pre-start from post-stop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pid(pub u32);

impl Pid {
    pub const NONE: Pid = Pid(0);

    pub fn is_none(&self) -> bool {
        self.0 == 0
    }
}

/// One respawn cycle start timestamp, used by the rate limiter's sliding
/// window.
pub type RespawnTimestampMs = u64;

/// A live instance of a job class.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub name: String,
    pub class: ClassId,
    pub goal: JobGoal,
    pub state: JobState,

    #[serde(default)]
    pub env: HashMap<String, String>,
    #[serde(default)]
    pub start_env: HashMap<String, String>,
    #[serde(default)]
    pub stop_env: HashMap<String, String>,

    #[serde(default)]
    pub pid: HashMap<ProcessKind, Pid>,

    /// The event this instance was created to satisfy `start_on` for, if any.
    #[serde(default)]
    pub blocker: Option<EventId>,
    /// Events blocked on this job finishing its current transition.
    #[serde(default)]
    pub blocking: Vec<EventId>,

    /// Deadline (epoch ms) for the kill timer armed on entering `Killed`.
    #[serde(default)]
    pub kill_timer: Option<u64>,
    #[serde(default)]
    pub kill_process: Option<ProcessKind>,

    #[serde(default)]
    pub failed: bool,
    #[serde(default)]
    pub failed_process: Option<ProcessKind>,
    #[serde(default)]
    pub exit_status: Option<i32>,

    /// Sliding window of respawn cycle starts, for the rate limiter.
    #[serde(default)]
    pub respawn_history: VecDeque<RespawnTimestampMs>,

    /// Fork-trace events seen so far for the current `expect=fork|daemon`
    /// readiness wait.
    #[serde(default)]
    pub trace_forks: u32,
    #[serde(default)]
    pub trace_state: ExpectTraceState,

    /// Per-instance clone of the class's `stop_on` tree, carrying this
    /// instance's own leaf-satisfaction progress independent of siblings.
    #[serde(default)]
    pub stop_on_tree: Option<OperatorTree>,
}

/// Progress of the `expect=fork|daemon|stop` readiness handshake.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExpectTraceState {
    #[default]
    Idle,
    WaitingForFork,
    WaitingForStop,
    Ready,
}

impl Job {
    pub fn new(id: JobId, name: impl Into<String>, class: ClassId) -> Self {
        Self {
            id,
            name: name.into(),
            class,
            goal: JobGoal::Stop,
            state: JobState::Waiting,
            env: HashMap::new(),
            start_env: HashMap::new(),
            stop_env: HashMap::new(),
            pid: HashMap::new(),
            blocker: None,
            blocking: Vec::new(),
            kill_timer: None,
            kill_process: None,
            failed: false,
            failed_process: None,
            exit_status: None,
            respawn_history: VecDeque::new(),
            trace_forks: 0,
            trace_state: ExpectTraceState::default(),
            stop_on_tree: None,
        }
    }

    /// `goal==Stop ∧ state==Waiting`: the terminal resting state. A job in
    /// this state, if unreferenced, is eligible for deletion.
    pub fn is_terminal_resting(&self) -> bool {
        self.goal == JobGoal::Stop && self.state == JobState::Waiting
    }

    /// No process slot has a live pid.
    pub fn has_no_live_pids(&self) -> bool {
        self.pid.values().all(Pid::is_none)
    }

    pub fn pid_of(&self, kind: ProcessKind) -> Pid {
        self.pid.get(&kind).copied().unwrap_or(Pid::NONE)
    }

    pub fn set_pid(&mut self, kind: ProcessKind, pid: Pid) {
        if pid.is_none() {
            self.pid.remove(&kind);
        } else {
            self.pid.insert(kind, pid);
        }
    }
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
