// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Builds and spawns one process slot's `tokio::process::Command`,
//! applying the owning job class's session, resource-limit, and
//! privilege-drop directives between `fork` and `exec`.

use std::collections::HashMap;
use std::os::unix::process::CommandExt as _;
use std::path::PathBuf;

use nix::unistd::{Gid, Uid};
use sv_core::{ConsoleMode, JobClassDefinition, ProcessKind, RLimit};
use tokio::process::{Child, Command};

use crate::error::SpawnError;
use crate::log_sink::LogSink;

/// Directives applied to a process slot between `fork` and `exec`. Derived
/// from a [`JobClassDefinition`] once per spawn rather than re-reading the
/// class inside the `pre_exec` closure, since that closure runs in the
/// child after `fork` and must not touch the parent's shared state.
#[derive(Debug, Clone)]
pub struct SpawnSpec {
    pub job_name: String,
    pub kind: ProcessKind,
    pub command: String,
    pub is_script: bool,
    pub env: HashMap<String, String>,
    pub chdir: Option<PathBuf>,
    pub chroot: Option<PathBuf>,
    pub uid: Option<u32>,
    pub gid: Option<u32>,
    pub umask: Option<u32>,
    pub nice: Option<i32>,
    pub oom_score_adj: Option<i32>,
    pub rlimits: HashMap<String, RLimit>,
    pub console: ConsoleMode,
}

impl SpawnSpec {
    /// Build the spec for one of `class`'s process slots, resolving
    /// `setuid`/`setgid` user/group names up front so a lookup failure is
    /// reported before any `fork`, not silently swallowed in the child.
    pub fn for_slot(
        class: &JobClassDefinition,
        job_name: &str,
        kind: ProcessKind,
        command: &str,
        is_script: bool,
        extra_env: HashMap<String, String>,
    ) -> Result<Self, SpawnError> {
        let uid = class.setuid.as_deref().map(resolve_uid).transpose()?;
        let gid = class.setgid.as_deref().map(resolve_gid).transpose()?;
        let mut env = class.env.clone();
        env.extend(extra_env);
        Ok(Self {
            job_name: job_name.to_string(),
            kind,
            command: command.to_string(),
            is_script,
            env,
            chdir: class.chdir.clone(),
            chroot: class.chroot.clone(),
            uid,
            gid,
            umask: class.umask,
            nice: class.nice,
            oom_score_adj: class.oom_score_adj,
            rlimits: class.rlimits.clone(),
            console: class.console,
        })
    }
}

fn resolve_uid(name: &str) -> Result<u32, SpawnError> {
    if let Ok(n) = name.parse::<u32>() {
        return Ok(n);
    }
    nix::unistd::User::from_name(name)
        .map_err(|source| SpawnError::UserLookup { source })?
        .map(|u| u.uid.as_raw())
        .ok_or_else(|| SpawnError::UnknownUser(name.to_string()))
}

fn resolve_gid(name: &str) -> Result<u32, SpawnError> {
    if let Ok(n) = name.parse::<u32>() {
        return Ok(n);
    }
    nix::unistd::Group::from_name(name)
        .map_err(|source| SpawnError::UserLookup { source })?
        .map(|g| g.gid.as_raw())
        .ok_or_else(|| SpawnError::UnknownGroup(name.to_string()))
}

/// Splits a command line on whitespace. Deliberately not a full shell
/// grammar — quoting/expansion belongs to `is_script`'s `/bin/sh -e`
/// path, not the plain `exec`-style command line.
fn split_command(command: &str) -> Vec<String> {
    command.split_whitespace().map(str::to_string).collect()
}

fn base_command(spec: &SpawnSpec) -> Result<Command, SpawnError> {
    if spec.is_script {
        let mut c = Command::new("/bin/sh");
        c.arg("-e").arg("-c").arg(&spec.command);
        return Ok(c);
    }
    let mut parts = split_command(&spec.command);
    if parts.is_empty() {
        return Err(SpawnError::EmptyCommand(spec.job_name.clone()));
    }
    let program = parts.remove(0);
    let mut c = Command::new(program);
    c.args(parts);
    Ok(c)
}

fn stdio_for(
    spec: &SpawnSpec,
    log: &dyn LogSink,
    is_stdout: bool,
) -> Result<std::process::Stdio, SpawnError> {
    let wants_log = matches!(spec.console, ConsoleMode::Output | ConsoleMode::Log)
        || (spec.console == ConsoleMode::Owner && is_stdout);
    if !wants_log {
        return Ok(std::process::Stdio::null());
    }
    let opened = if is_stdout {
        log.stdout(&spec.job_name, spec.kind)
    } else {
        log.stderr(&spec.job_name, spec.kind)
    };
    opened.map_err(|source| SpawnError::LogSink {
        job: spec.job_name.clone(),
        kind: spec.kind.to_string(),
        source,
    })
}

/// Spawn one process slot, wiring its stdio through `log` and applying
/// `spec`'s session/limits/privilege directives in a `pre_exec` hook that
/// runs after `fork`, before `exec`.
pub fn spawn(spec: &SpawnSpec, log: &dyn LogSink) -> Result<Child, SpawnError> {
    let mut cmd = base_command(spec)?;

    cmd.env_clear();
    cmd.envs(&spec.env);
    if let Some(dir) = &spec.chdir {
        cmd.current_dir(dir);
    }
    cmd.stdin(std::process::Stdio::null());
    cmd.stdout(stdio_for(spec, log, true)?);
    cmd.stderr(stdio_for(spec, log, false)?);
    cmd.kill_on_drop(false);

    register_pre_exec(&mut cmd, spec.clone());

    cmd.spawn().map_err(|source| SpawnError::Exec { command: spec.command.clone(), source })
}

/// Isolated to keep the crate's one genuinely unsafe operation — arming
/// the `pre_exec` hook, whose contract `Command::pre_exec`'s docs require
/// callers to uphold — in a single, narrow, auditable spot.
#[allow(unsafe_code)]
fn register_pre_exec(cmd: &mut Command, spec: SpawnSpec) {
    // SAFETY: `apply_pre_exec` only calls nix/libc wrappers that are
    // documented async-signal-safe (setsid, chroot/chdir, setuid/setgid,
    // getrlimit/setrlimit, umask) plus `setpriority`, which in practice
    // every init system calls from the same hook; it performs no heap
    // allocation and does not touch the parent's Rust-level state.
    unsafe {
        cmd.pre_exec(move || apply_pre_exec(&spec).map_err(std::io::Error::from));
    }
}

fn apply_pre_exec(spec: &SpawnSpec) -> Result<(), SpawnError> {
    nix::unistd::setsid()
        .map_err(|source| SpawnError::PreExecSyscall { call: "setsid", source })?;

    if let Some(mask) = spec.umask {
        nix::sys::stat::umask(nix::sys::stat::Mode::from_bits_truncate(mask as _));
    }
    if let Some(n) = spec.nice {
        set_nice(n)?;
    }
    for (name, limit) in &spec.rlimits {
        if let Some(resource) = rlimit_resource(name) {
            apply_rlimit(resource, limit).map_err(|source| SpawnError::RLimit {
                resource: name.clone(),
                source,
            })?;
        }
    }
    if let Some(root) = &spec.chroot {
        nix::unistd::chroot(root.as_path())
            .map_err(|source| SpawnError::PreExecSyscall { call: "chroot", source })?;
        nix::unistd::chdir("/")
            .map_err(|source| SpawnError::PreExecSyscall { call: "chdir", source })?;
    }
    if let Some(gid) = spec.gid {
        nix::unistd::setgid(Gid::from_raw(gid))
            .map_err(|source| SpawnError::PreExecSyscall { call: "setgid", source })?;
    }
    if let Some(uid) = spec.uid {
        nix::unistd::setuid(Uid::from_raw(uid))
            .map_err(|source| SpawnError::PreExecSyscall { call: "setuid", source })?;
    }
    if let Some(adj) = spec.oom_score_adj {
        // Best-effort: writing a procfs file from `pre_exec` is not
        // strictly async-signal-safe, but every init system that supports
        // `oom_score_adj` does exactly this; a failure here should not
        // abort an otherwise-healthy spawn.
        let _ = std::fs::write("/proc/self/oom_score_adj", adj.to_string());
    }
    Ok(())
}

#[allow(unsafe_code)]
fn set_nice(n: i32) -> Result<(), SpawnError> {
    // SAFETY: `setpriority(2)` is async-signal-safe and takes no pointers.
    let ret = unsafe { libc::setpriority(libc::PRIO_PROCESS, 0, n) };
    if ret == -1 {
        return Err(SpawnError::PreExec(std::io::Error::last_os_error()));
    }
    Ok(())
}

fn rlimit_resource(name: &str) -> Option<nix::sys::resource::Resource> {
    use nix::sys::resource::Resource;
    Some(match name {
        "as" => Resource::RLIMIT_AS,
        "core" => Resource::RLIMIT_CORE,
        "cpu" => Resource::RLIMIT_CPU,
        "data" => Resource::RLIMIT_DATA,
        "fsize" => Resource::RLIMIT_FSIZE,
        "locks" => Resource::RLIMIT_LOCKS,
        "memlock" => Resource::RLIMIT_MEMLOCK,
        "msgqueue" => Resource::RLIMIT_MSGQUEUE,
        "nice" => Resource::RLIMIT_NICE,
        "nofile" => Resource::RLIMIT_NOFILE,
        "nproc" => Resource::RLIMIT_NPROC,
        "rss" => Resource::RLIMIT_RSS,
        "rtprio" => Resource::RLIMIT_RTPRIO,
        "sigpending" => Resource::RLIMIT_SIGPENDING,
        "stack" => Resource::RLIMIT_STACK,
        _ => return None,
    })
}

fn apply_rlimit(resource: nix::sys::resource::Resource, limit: &RLimit) -> nix::Result<()> {
    let (cur, max) = nix::sys::resource::getrlimit(resource)?;
    let soft = limit.soft.unwrap_or(cur);
    let hard = limit.hard.unwrap_or(max);
    nix::sys::resource::setrlimit(resource, soft, hard)
}

impl From<SpawnError> for std::io::Error {
    fn from(err: SpawnError) -> Self {
        std::io::Error::other(err.to_string())
    }
}

#[cfg(test)]
#[path = "spawn_tests.rs"]
mod tests;
