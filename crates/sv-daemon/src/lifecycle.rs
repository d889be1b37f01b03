// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle: startup (lock acquisition, state recovery, socket
//! bind) and shutdown (final checkpoint, file cleanup), grounded in
//! `oj-daemon::lifecycle`'s `startup_inner`/`DaemonState::shutdown`.

use std::fs::File;
use std::io::Write as _;
use std::time::Instant;

use fs2::FileExt;
use sv_config::SourceKind;
use sv_core::SystemClock;
use sv_engine::Supervisor;
use sv_process::FileLogSink;
use sv_storage::Checkpointer;
use thiserror::Error;
use tokio::net::UnixListener;
use tracing::{info, warn};

use crate::config::Config;

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("could not determine state directory")]
    NoStateDir,

    #[error("failed to acquire lock: daemon already running?")]
    LockFailed(#[source] std::io::Error),

    #[error("failed to bind socket at {0}: {1}")]
    BindFailed(std::path::PathBuf, std::io::Error),

    #[error("storage error: {0}")]
    Storage(#[from] sv_storage::StorageError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Daemon state held across the process's lifetime.
pub struct DaemonState {
    pub config: Config,
    #[allow(dead_code)]
    lock_file: File,
    pub supervisor: Supervisor<SystemClock>,
    pub log_sink: FileLogSink,
    pub start_time: Instant,
}

pub struct StartupResult {
    pub daemon: DaemonState,
    pub listener: UnixListener,
}

/// Start the daemon: acquire the exclusive lock, recover state from the
/// last checkpoint (if any), bind the control socket last so a partially
/// failed startup never leaves a socket a client could connect to.
pub async fn startup(config: Config) -> Result<StartupResult, LifecycleError> {
    match startup_inner(config.clone()).await {
        Ok(result) => Ok(result),
        Err(e) => {
            if !matches!(e, LifecycleError::LockFailed(_)) {
                cleanup_on_failure(&config);
            }
            Err(e)
        }
    }
}

async fn startup_inner(config: Config) -> Result<StartupResult, LifecycleError> {
    std::fs::create_dir_all(&config.state_dir)?;
    std::fs::create_dir_all(&config.conf_root)?;

    let lock_file =
        std::fs::OpenOptions::new().write(true).create(true).truncate(false).open(&config.lock_path)?;
    lock_file.try_lock_exclusive().map_err(LifecycleError::LockFailed)?;
    lock_file.set_len(0)?;
    let mut lock_file = lock_file;
    writeln!(lock_file, "{}", std::process::id())?;

    let inherited = crate::reexec::take_inherited_document();
    let from_disk = if inherited.is_none() { sv_storage::load_snapshot(&config.snapshot_path)? } else { None };

    let mut supervisor = match inherited.or(from_disk) {
        Some(doc) => {
            info!(path = %config.snapshot_path.display(), "restoring state");
            // The document already carries `conf_sources`; only the
            // per-file watch bookkeeping needs rebuilding, via `reload`.
            sv_storage::rehydrate(SystemClock, config.conf_root.clone(), doc)
        }
        None => {
            info!("no checkpoint found, starting with empty state");
            let mut supervisor = Supervisor::new(SystemClock, config.conf_root.clone());
            let null = supervisor.null_session().id.clone();
            supervisor.add_source(config.conf_root.clone(), SourceKind::JobDir, Some(null));
            supervisor
        }
    };
    if let Err(err) = supervisor.reload(None) {
        warn!(%err, "initial config load reported errors");
    }

    if config.socket_path.exists() {
        std::fs::remove_file(&config.socket_path)?;
    }
    let listener = UnixListener::bind(&config.socket_path)
        .map_err(|e| LifecycleError::BindFailed(config.socket_path.clone(), e))?;

    let log_sink = FileLogSink::new(config.state_dir.join("logs"));

    info!("svd started");

    Ok(StartupResult {
        daemon: DaemonState { config, lock_file, supervisor, log_sink, start_time: Instant::now() },
        listener,
    })
}

impl DaemonState {
    /// Shut down cleanly: checkpoint, then remove the files that mark
    /// this instance as the live one.
    pub fn shutdown(&mut self) {
        info!("shutting down");

        let checkpointer = Checkpointer::new(self.config.snapshot_path.clone());
        match checkpointer.checkpoint_sync(self.supervisor.snapshot()) {
            Ok(result) => info!(size_bytes = result.size_bytes, "saved final shutdown checkpoint"),
            Err(err) => warn!(%err, "failed to save shutdown checkpoint"),
        }

        if self.config.socket_path.exists() {
            if let Err(err) = std::fs::remove_file(&self.config.socket_path) {
                warn!(%err, "failed to remove socket file");
            }
        }
        if self.config.lock_path.exists() {
            if let Err(err) = std::fs::remove_file(&self.config.lock_path) {
                warn!(%err, "failed to remove lock file");
            }
        }

        info!("shutdown complete");
    }
}

fn cleanup_on_failure(config: &Config) {
    if config.socket_path.exists() {
        let _ = std::fs::remove_file(&config.socket_path);
    }
    if config.lock_path.exists() {
        let _ = std::fs::remove_file(&config.lock_path);
    }
}
