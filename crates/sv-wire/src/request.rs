// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Requests a `svctl` client sends the `svd` daemon over its Unix socket.

use std::collections::HashMap;
use serde::{Deserialize, Serialize};
use sv_core::SessionId;

use crate::Query;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum Request {
    /// Health check.
    Ping,
    /// Version handshake, ahead of the first real request on a connection.
    Hello { version: String },
    /// Read-only state query.
    Query { query: Query },
    /// Start a named job instance (spec.md §3's `start` action).
    Start { name: String, session: SessionId },
    /// Request a named instance stop.
    Stop { name: String, session: SessionId },
    /// Stop then start a named instance.
    Restart { name: String, session: SessionId },
    /// Rescan config sources, or one named source if `source` is set.
    Reload { #[serde(default)] source: Option<String> },
    /// Emit an event. `wait` blocks the reply until the event finishes
    /// distributing (spec.md Testable Scenario S4).
    Emit {
        name: String,
        #[serde(default)]
        args: Vec<String>,
        #[serde(default)]
        env: HashMap<String, String>,
        #[serde(default)]
        wait: bool,
    },
    /// Ask to re-exec the running daemon in place (spec.md §1's "request
    /// re-exec" operation), carrying forward the persisted state.
    Reexec,
    /// Keep this connection open and receive `Response::JobChanged`/
    /// `Response::EventChanged` push frames until it closes (spec.md §1's
    /// "subscribe to job/event state transitions").
    Subscribe,
}

#[cfg(test)]
#[path = "request_tests.rs"]
mod tests;
