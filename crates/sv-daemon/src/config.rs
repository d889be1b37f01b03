// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon runtime configuration: fixed XDG-style paths under a single
//! state directory, mirroring `oj-daemon::lifecycle::Config::load()`.

use std::path::PathBuf;

use crate::lifecycle::LifecycleError;

/// Daemon configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Root state directory (e.g. `~/.local/state/svd`).
    pub state_dir: PathBuf,
    /// Root job-class directory (conventionally `/etc/init`; here, a
    /// directory under the state dir so a non-root user can run a full
    /// instance without touching `/etc`).
    pub conf_root: PathBuf,
    /// Unix control socket path.
    pub socket_path: PathBuf,
    /// PID/lock file path, held for the process's lifetime.
    pub lock_path: PathBuf,
    /// Daemon log file path.
    pub log_path: PathBuf,
    /// On-disk periodic checkpoint path (compressed).
    pub snapshot_path: PathBuf,
}

impl Config {
    /// Load configuration for the user-level daemon. One daemon instance
    /// serves every session under this state directory; `flock`'d
    /// exclusivity is enforced at [`crate::lifecycle::startup`], not here.
    pub fn load() -> Result<Self, LifecycleError> {
        let state_dir = state_dir()?;
        Ok(Self {
            conf_root: state_dir.join("jobs"),
            socket_path: state_dir.join("svd.sock"),
            lock_path: state_dir.join("svd.pid"),
            log_path: state_dir.join("svd.log"),
            snapshot_path: state_dir.join("snapshot.json.zst"),
            state_dir,
        })
    }
}

fn state_dir() -> Result<PathBuf, LifecycleError> {
    if let Ok(dir) = std::env::var("SVD_STATE_DIR") {
        return Ok(PathBuf::from(dir));
    }
    dirs::state_dir()
        .or_else(dirs::home_dir)
        .map(|d| d.join("svd"))
        .ok_or(LifecycleError::NoStateDir)
}
