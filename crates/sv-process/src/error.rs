// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Errors from spawning, signaling, and reaping process slots.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SpawnError {
    #[error("job {0} has no command in its process slot")]
    EmptyCommand(String),

    #[error("failed to open log sink for {job} ({kind}): {source}")]
    LogSink {
        job: String,
        kind: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to spawn `{command}`: {source}")]
    Exec {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("user lookup failed: {source}")]
    UserLookup {
        #[source]
        source: nix::Error,
    },

    #[error("unknown user for setuid: {0}")]
    UnknownUser(String),

    #[error("unknown group for setgid: {0}")]
    UnknownGroup(String),

    #[error("rlimit {resource} could not be applied: {source}")]
    RLimit {
        resource: String,
        #[source]
        source: nix::Error,
    },

    #[error("{call} failed in pre-exec: {source}")]
    PreExecSyscall {
        call: &'static str,
        #[source]
        source: nix::Error,
    },

    #[error("not a valid signal number: {0}")]
    UnknownSignal(i32),

    #[error("signal {signal} to pid {pid} failed: {source}")]
    Signal {
        pid: u32,
        signal: i32,
        #[source]
        source: nix::Error,
    },

    #[error("pre-exec directive failed: {0}")]
    PreExec(#[source] std::io::Error),
}
