// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job Class Definition: the declarative record produced by parsing a
//! config file, consumed unchanged by the engine.

use crate::id::ClassId;
use crate::operator::OperatorTree;
use crate::session::SessionId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Which process slot a command belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessKind {
    Main,
    PreStart,
    PostStart,
    PreStop,
    PostStop,
    Security,
}

impl ProcessKind {
    pub const ALL: [ProcessKind; 6] = [
        ProcessKind::Security,
        ProcessKind::PreStart,
        ProcessKind::Main,
        ProcessKind::PostStart,
        ProcessKind::PreStop,
        ProcessKind::PostStop,
    ];
}

impl std::fmt::Display for ProcessKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ProcessKind::Main => "main",
            ProcessKind::PreStart => "pre-start",
            ProcessKind::PostStart => "post-start",
            ProcessKind::PreStop => "pre-stop",
            ProcessKind::PostStop => "post-stop",
            ProcessKind::Security => "security",
        };
        write!(f, "{s}")
    }
}

/// One executable attached to a class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessSlot {
    pub kind: ProcessKind,
    /// True when `command` is a `script ... end script` block (wrapped in
    /// `/bin/sh -e` with the text fed over stdin); false for a single
    /// `exec`/`pre-start exec`-style command line.
    #[serde(default)]
    pub is_script: bool,
    pub command: String,
}

/// How the supervisor learns a job has become ready.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpectPolicy {
    #[default]
    None,
    Fork,
    Daemon,
    Stop,
}

/// Console I/O mode for the main process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsoleMode {
    #[default]
    None,
    Output,
    Owner,
    Log,
}

/// One of the 16 POSIX rlimits, expressed as an optional `(soft, hard)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RLimit {
    pub soft: Option<u64>,
    pub hard: Option<u64>,
}

/// The 16 resources `setrlimit`-style limits apply to (`RLIMIT_AS` .. `RLIMIT_STACK`).
pub const RLIMIT_NAMES: [&str; 16] = [
    "as", "core", "cpu", "data", "fsize", "locks", "memlock", "msgqueue", "nice", "nofile",
    "nproc", "rss", "rtprio", "sigpending", "stack", "signal",
];

/// Exit statuses (and `signal | 0x80` encodings) that should not be treated
/// as failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NormalExit {
    Status(i32),
    Signal(i32),
}

/// Respawn policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RespawnPolicy {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_respawn_limit")]
    pub limit: u32,
    #[serde(default = "default_respawn_interval")]
    pub interval_secs: u64,
    #[serde(default)]
    pub normal_exit: Vec<NormalExit>,
}

fn default_respawn_limit() -> u32 {
    10
}

fn default_respawn_interval() -> u64 {
    5
}

impl Default for RespawnPolicy {
    fn default() -> Self {
        Self {
            enabled: false,
            limit: default_respawn_limit(),
            interval_secs: default_respawn_interval(),
            normal_exit: Vec::new(),
        }
    }
}

/// Declarative job template: the populated record the external parser
/// produces and the engine consumes verbatim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobClassDefinition {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub usage: Option<String>,

    #[serde(default)]
    pub process: Vec<ProcessSlot>,

    #[serde(default)]
    pub start_on: Option<OperatorTree>,
    #[serde(default)]
    pub stop_on: Option<OperatorTree>,
    #[serde(default)]
    pub emits: Vec<String>,

    /// Instance name template (e.g. `$NAME`); empty string means single-instance.
    #[serde(default)]
    pub instance: String,

    #[serde(default)]
    pub respawn: RespawnPolicy,

    #[serde(default = "default_kill_signal")]
    pub kill_signal: i32,
    #[serde(default = "default_kill_timeout")]
    pub kill_timeout_secs: u64,
    #[serde(default = "default_reload_signal")]
    pub reload_signal: i32,

    #[serde(default)]
    pub expect: ExpectPolicy,
    #[serde(default)]
    pub console: ConsoleMode,

    #[serde(default)]
    pub umask: Option<u32>,
    #[serde(default)]
    pub nice: Option<i32>,
    #[serde(default)]
    pub oom_score_adj: Option<i32>,
    #[serde(default)]
    pub rlimits: HashMap<String, RLimit>,

    #[serde(default)]
    pub chroot: Option<std::path::PathBuf>,
    #[serde(default)]
    pub chdir: Option<std::path::PathBuf>,
    #[serde(default)]
    pub setuid: Option<String>,
    #[serde(default)]
    pub setgid: Option<String>,
    #[serde(default)]
    pub apparmor_switch: Option<String>,

    #[serde(default)]
    pub env: HashMap<String, String>,
    #[serde(default)]
    pub export: Vec<String>,

    #[serde(default)]
    pub task: bool,

    #[serde(skip)]
    pub session: Option<SessionId>,
    /// Set by the Config Manager when a reload installs a new definition
    /// while live instances of the old one remain; not written by the parser.
    #[serde(skip)]
    pub deleted: bool,
}

fn default_kill_signal() -> i32 {
    libc_sigterm()
}

fn default_kill_timeout() -> u64 {
    5
}

fn default_reload_signal() -> i32 {
    libc_sighup()
}

// Avoids a direct libc dependency in sv-core for two constants; kept in
// sync with POSIX signal numbers used throughout sv-process.
fn libc_sigterm() -> i32 {
    15
}

fn libc_sighup() -> i32 {
    1
}

impl JobClassDefinition {
    pub fn process_slot(&self, kind: ProcessKind) -> Option<&ProcessSlot> {
        self.process.iter().find(|p| p.kind == kind)
    }

    pub fn is_single_instance(&self) -> bool {
        self.instance.is_empty()
    }

    /// The class id a job class with this name is keyed under within a
    /// session, mirroring how `Session::derive_id` keys sessions by identity
    /// rather than assigning random ids to stable, name-addressed records.
    pub fn derive_id(session: &SessionId, name: &str) -> ClassId {
        ClassId::new(format!("{}/{}", session.as_str(), name))
    }
}

#[cfg(test)]
#[path = "class_tests.rs"]
mod tests;
