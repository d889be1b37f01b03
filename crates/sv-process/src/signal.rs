// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Signal delivery to a job's process group (kill sequence, reload
//! notification) and liveness checks, grounded on the pack's
//! `nix::sys::signal::kill` daemon-process idioms.

use nix::sys::signal::{self, Signal};
use nix::unistd::Pid as NixPid;
use sv_core::Pid;

use crate::error::SpawnError;

/// Send `signal` to the process group led by `pid`. Every slot is
/// `setsid`'d on spawn, so its own pid doubles as its process group id —
/// signaling the group rather than the single pid reaches any children
/// the slot itself forked, matching upstart's kill-the-tree behavior.
pub fn send_to_group(pid: Pid, sig: i32) -> Result<(), SpawnError> {
    let signal = Signal::try_from(sig).map_err(|_| SpawnError::UnknownSignal(sig))?;
    signal::killpg(NixPid::from_raw(pid.0 as i32), signal)
        .map_err(|source| SpawnError::Signal { pid: pid.0, signal: sig, source })
}

/// Signal-0 liveness probe: succeeds iff the pid still exists and is
/// visible to us, without actually delivering a signal.
pub fn is_alive(pid: Pid) -> bool {
    signal::kill(NixPid::from_raw(pid.0 as i32), None).is_ok()
}

#[cfg(test)]
#[path = "signal_tests.rs"]
mod tests;
