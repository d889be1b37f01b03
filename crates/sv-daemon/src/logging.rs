// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Log setup, matching `oj-daemon`'s pattern: write a startup marker to
//! the log file *before* the subscriber is installed, so a failure during
//! subscriber setup is still visible on disk.

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

/// Initialize file-backed structured logging. The returned guard must be
/// held for the process's lifetime — dropping it stops the background
/// flush thread and buffered lines are lost.
pub fn init(log_path: &Path) -> std::io::Result<WorkerGuard> {
    if let Some(parent) = log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    // Startup marker written directly, ahead of the subscriber, so a
    // daemon that crashes during `tracing_subscriber::fmt().init()` still
    // leaves a trace of having tried to start.
    {
        use std::io::Write;
        let mut marker = std::fs::OpenOptions::new().create(true).append(true).open(log_path)?;
        writeln!(marker, "--- svd starting (pid {}) ---", std::process::id())?;
    }

    let file_appender = tracing_appender::rolling::never(
        log_path.parent().unwrap_or_else(|| Path::new(".")),
        log_path.file_name().unwrap_or_default(),
    );
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(non_blocking)
        .with_ansi(false)
        .init();

    Ok(guard)
}
