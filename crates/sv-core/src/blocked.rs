// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Blocking Graph records: bidirectional links between events and jobs
//! representing "X is waiting for Y", plus the RPC replies waiting on one
//! of them to clear.

use crate::id::{EventId, JobId};
use serde::{Deserialize, Serialize};

/// One edge in the Blocking Graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Blocked {
    /// A job instance cannot proceed (e.g. its `stop_on` has not fired)
    /// until the referenced job reaches a resting state.
    Job { waiter: JobId, waited_on: JobId },
    /// A job's start or stop sequence is keeping an event from finishing.
    Event { waiter: JobId, waited_on: EventId },
    /// An RPC caller is waiting for an event (e.g. emitted with `wait=true`)
    /// to finish before its reply is delivered.
    RpcReply { request_id: String, waited_on: EventId },
}

impl Blocked {
    pub fn job(waiter: JobId, waited_on: JobId) -> Self {
        Blocked::Job { waiter, waited_on }
    }

    pub fn event(waiter: JobId, waited_on: EventId) -> Self {
        Blocked::Event { waiter, waited_on }
    }

    pub fn rpc_reply(request_id: impl Into<String>, waited_on: EventId) -> Self {
        Blocked::RpcReply {
            request_id: request_id.into(),
            waited_on,
        }
    }

    /// The event this record resolves on, if it is keyed by one.
    pub fn waited_event(&self) -> Option<&EventId> {
        match self {
            Blocked::Event { waited_on, .. } => Some(waited_on),
            Blocked::RpcReply { waited_on, .. } => Some(waited_on),
            Blocked::Job { .. } => None,
        }
    }

    /// The job this record resolves on, if it is keyed by one.
    pub fn waited_job(&self) -> Option<&JobId> {
        match self {
            Blocked::Job { waited_on, .. } => Some(waited_on),
            _ => None,
        }
    }
}

/// Tracks all outstanding [`Blocked`] edges, indexed for cheap lookup in
/// both directions as the spec's "unbounded list traversal" concern calls
/// for.
#[derive(Debug, Default)]
pub struct BlockingGraph {
    edges: Vec<Blocked>,
}

impl BlockingGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, edge: Blocked) {
        if !self.edges.contains(&edge) {
            self.edges.push(edge);
        }
    }

    /// Remove every edge waiting on the given event, returning them.
    pub fn resolve_event(&mut self, event: &EventId) -> Vec<Blocked> {
        let (resolved, remaining): (Vec<_>, Vec<_>) = self
            .edges
            .drain(..)
            .partition(|e| e.waited_event() == Some(event));
        self.edges = remaining;
        resolved
    }

    /// Remove every edge waiting on the given job, returning them.
    pub fn resolve_job(&mut self, job: &JobId) -> Vec<Blocked> {
        let (resolved, remaining): (Vec<_>, Vec<_>) = self
            .edges
            .drain(..)
            .partition(|e| e.waited_job() == Some(job));
        self.edges = remaining;
        resolved
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Blocked> {
        self.edges.iter()
    }
}

#[cfg(test)]
#[path = "blocked_tests.rs"]
mod tests;
