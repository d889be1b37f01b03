// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Read-only questions a client can ask the daemon, wrapped by
//! [`crate::Request::Query`].

use serde::{Deserialize, Serialize};
use sv_core::SessionId;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum Query {
    /// Every currently-visible class and the count of its live instances.
    ListJobs {
        #[serde(default)]
        session: Option<SessionId>,
    },
    /// One named class's definition and every live instance of it.
    GetJob { name: String, session: SessionId },
    /// `EventProgress` for a previously emitted event, for `emit --wait`.
    EventProgress { id: String },
    /// Daemon uptime and a few headline counts.
    Status,
}

#[cfg(test)]
#[path = "query_tests.rs"]
mod tests;
