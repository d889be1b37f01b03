// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `svd`: the event-driven service supervisor daemon. Single-threaded
//! cooperative runtime per spec.md §5 — one `Supervisor` owned end to end
//! by [`mainloop::MainLoop`], fed by [`listener::run`]'s per-connection
//! tasks over an `mpsc` channel.

mod config;
mod lifecycle;
mod listener;
mod logging;
mod mainloop;
mod process_actions;
mod reexec;

use tokio::sync::mpsc;
use tracing::error;

const COMMAND_CHANNEL_CAPACITY: usize = 256;

#[tokio::main(flavor = "current_thread")]
async fn main() -> std::process::ExitCode {
    let config = match config::Config::load() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("svd: failed to load configuration: {err}");
            return std::process::ExitCode::FAILURE;
        }
    };

    let _log_guard = match logging::init(&config.log_path) {
        Ok(guard) => guard,
        Err(err) => {
            eprintln!("svd: failed to initialize logging: {err}");
            return std::process::ExitCode::FAILURE;
        }
    };

    let startup = match lifecycle::startup(config).await {
        Ok(startup) => startup,
        Err(err) => {
            error!(%err, "startup failed");
            return std::process::ExitCode::FAILURE;
        }
    };

    let (cmd_tx, cmd_rx) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);
    let listener_task = tokio::spawn(listener::run(startup.listener, cmd_tx));

    let result = mainloop::MainLoop::new(startup.daemon, cmd_rx).run().await;
    listener_task.abort();

    match result {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(err) => {
            error!(%err, "failed to install signal handlers");
            std::process::ExitCode::FAILURE
        }
    }
}
