// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Events: the messages flowing through the Event Queue that drive job
//! state transitions via operator trees.

use crate::id::EventId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Where an event is in its lifecycle through the Event Queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventProgress {
    /// Queued, not yet handed to the distribution pass.
    Pending,
    /// Being matched against operator trees; jobs may be blocking on it.
    Handling,
    /// All interested operator trees have been notified; safe to retire.
    Finished,
}

/// One event occurrence: a name, positional arguments, and environment,
/// plus the bookkeeping needed to answer "is anyone still waiting on me".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub name: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub env: HashMap<String, String>,
    pub progress: EventProgress,
    /// Job instances that are blocked on this event's outcome via `stop_on`,
    /// i.e. whose stop must be deferred until this event finishes handling.
    #[serde(default)]
    pub blockers: Vec<crate::job::JobId>,
}

impl Event {
    pub fn new(id: EventId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            args: Vec::new(),
            env: HashMap::new(),
            progress: EventProgress::Pending,
            blockers: Vec::new(),
        }
    }

    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    pub fn with_env(mut self, env: HashMap<String, String>) -> Self {
        self.env = env;
        self
    }

    pub fn is_blocking(&self) -> bool {
        !self.blockers.is_empty()
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
