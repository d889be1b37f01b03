// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Re-exec in place (spec.md §1/§5): write the current `EngineSnapshot` to
//! an anonymous, non-CLOEXEC fd the new process image inherits, then
//! `exec` over this process. Unlike spec.md §5's literal "the fd number is
//! passed on the new argv", the fd number travels through the
//! `SVD_REEXEC_FD` environment variable instead — `execve`'s argv is
//! otherwise unconstrained here and an env var is simpler to parse back
//! out than a positional argument a future CLI flag could collide with.
//! The socket and lock file are left exactly as they are: the new image
//! binds the same path only after confirming no snapshot fd was handed to
//! it, which never happens on this path.

use std::io::{Seek, SeekFrom, Write};
use std::os::fd::{AsRawFd, RawFd};
use std::os::unix::process::CommandExt;

use nix::fcntl::{fcntl, FcntlArg, FdFlag};
use thiserror::Error;
use tracing::warn;

use sv_storage::{read_plain, write_plain, PersistedDocument};

use crate::lifecycle::DaemonState;

pub const REEXEC_FD_VAR: &str = "SVD_REEXEC_FD";

#[derive(Debug, Error)]
pub enum ReexecError {
    #[error("failed to serialize state for re-exec: {0}")]
    Storage(#[from] sv_storage::StorageError),

    #[error("failed to prepare the hand-off descriptor: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to determine the running executable: {0}")]
    CurrentExe(std::io::Error),

    #[error("exec failed: {0}")]
    Exec(std::io::Error),
}

/// Serialize state into an inherited fd and `exec` over this process.
/// Only ever returns — with an error — because success replaces the
/// process image and never comes back here.
pub fn reexec(daemon: &DaemonState) -> ReexecError {
    match try_reexec(daemon) {
        Ok(()) => unreachable!("a successful exec never returns"),
        Err(err) => err,
    }
}

/// If this process image was `exec`'d by [`reexec`], read back the state it
/// handed off and consume the marker env var so a later re-exec attempt
/// from this (now-running) instance never mistakes it for another
/// inherited fd. Returns `None` (after a warning) on any failure — falling
/// back to the normal cold-start/disk-checkpoint path is always safe.
///
/// Reopens the inherited fd via `/proc/self/fd/<n>` rather than
/// reconstructing a `File` from the raw number directly, so this stays
/// within `sv-daemon`'s forbid-unsafe-code policy; the fd itself is then
/// closed through `nix::unistd::close`, a safe wrapper, instead of being
/// left to leak for the process's remaining lifetime.
pub fn take_inherited_document() -> Option<PersistedDocument> {
    let raw = std::env::var(REEXEC_FD_VAR).ok()?;
    std::env::remove_var(REEXEC_FD_VAR);
    let fd: RawFd = match raw.parse() {
        Ok(fd) => fd,
        Err(err) => {
            warn!(%err, raw, "malformed {REEXEC_FD_VAR}, ignoring");
            return None;
        }
    };

    let doc = match std::fs::File::open(format!("/proc/self/fd/{fd}")) {
        Ok(file) => match read_plain(file) {
            Ok(doc) => Some(doc),
            Err(err) => {
                warn!(%err, "failed to read inherited re-exec state, ignoring");
                None
            }
        },
        Err(err) => {
            warn!(%err, fd, "failed to reopen inherited re-exec fd, ignoring");
            None
        }
    };

    if let Err(err) = nix::unistd::close(fd) {
        warn!(%err, fd, "failed to close inherited re-exec fd");
    }
    doc
}

fn try_reexec(daemon: &DaemonState) -> Result<(), ReexecError> {
    let doc = PersistedDocument::new(daemon.supervisor.snapshot());
    let mut plain = Vec::new();
    write_plain(&doc, &mut plain)?;

    let mut handoff = tempfile::tempfile()?;
    handoff.write_all(&plain)?;
    handoff.seek(SeekFrom::Start(0))?;

    let fd = handoff.as_raw_fd();
    fcntl(fd, FcntlArg::F_SETFD(FdFlag::empty())).map_err(|errno| ReexecError::Io(errno.into()))?;

    let exe = std::env::current_exe().map_err(ReexecError::CurrentExe)?;
    let err = std::process::Command::new(exe).env(REEXEC_FD_VAR, fd.to_string()).exec();
    Err(ReexecError::Exec(err))
}
