// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Replies the daemon sends back for a [`crate::Request`].

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use sv_core::{ClassId, EventProgress, JobId, JobState, Pid, ProcessKind};

/// A job instance summary, enough for `svctl list`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JobSummary {
    pub id: JobId,
    pub name: String,
    pub class: ClassId,
    pub state: JobState,
}

/// Full instance detail, for `svctl status <name>`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JobDetail {
    pub summary: JobSummary,
    pub pid: HashMap<ProcessKind, Pid>,
    pub failed: bool,
    pub failed_process: Option<ProcessKind>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum Response {
    /// Generic success with no payload.
    Ok,
    /// Health-check reply.
    Pong,
    /// Version handshake reply.
    Hello { version: String },
    /// An error the caller can act on without a state change (spec.md §7's
    /// RPC-facing taxonomy: `UnknownJob`/`UnknownInstance`/`AlreadyStarted`/
    /// `AlreadyStopped` all surface here).
    Error { message: String },
    /// A started/stopped/restarted instance's id.
    Instance { id: JobId },
    /// An emitted event's id and, once `wait` was requested and honored,
    /// its final progress.
    EventAccepted { id: String, progress: Option<EventProgress> },
    /// `Query::ListJobs` reply.
    Jobs { jobs: Vec<JobSummary> },
    /// `Query::GetJob` reply; `None` if no instance of that class exists.
    Job { job: Option<Box<JobDetail>> },
    /// `Query::EventProgress` reply.
    Progress { progress: Option<EventProgress> },
    /// `Query::Status` reply.
    Status { uptime_secs: u64, jobs_active: usize, classes_loaded: usize },
    /// Pushed on a `Request::Subscribe` connection whenever a job
    /// instance's state changes.
    JobChanged { job: JobSummary },
    /// Pushed on a `Request::Subscribe` connection whenever a tracked
    /// event's progress changes.
    EventChanged { id: String, progress: EventProgress },
}

#[cfg(test)]
#[path = "response_tests.rs"]
mod tests;
