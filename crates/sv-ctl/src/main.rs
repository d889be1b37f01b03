// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `svctl`: the control-plane CLI for `svd`. Exit codes follow spec.md
//! §6: 0 success, 1 usage/general error, 2 cannot contact supervisor.

mod client;
mod commands;
mod exit_error;
mod output;

use clap::{Parser, Subcommand};
use sv_core::SessionId;

use exit_error::ExitError;
use output::OutputFormat;

#[derive(Parser)]
#[command(name = "svctl", version, about = "Control plane for the svd service supervisor")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Output format shared by every subcommand that prints data.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text, global = true)]
    format: OutputFormat,
}

#[derive(Subcommand)]
enum Command {
    /// Health check.
    Ping,
    /// Start a named job instance.
    Start {
        name: String,
        #[arg(long, default_value = "null")]
        session: String,
    },
    /// Stop a named job instance.
    Stop {
        name: String,
        #[arg(long, default_value = "null")]
        session: String,
    },
    /// Stop then start a named job instance.
    Restart {
        name: String,
        #[arg(long, default_value = "null")]
        session: String,
    },
    /// List every visible job instance.
    List {
        /// Restrict to one session; omit for every session.
        #[arg(long)]
        session: Option<String>,
    },
    /// Show one job instance's full detail.
    Show {
        name: String,
        #[arg(long, default_value = "null")]
        session: String,
    },
    /// Re-scan config sources, or one named source.
    Reload {
        source: Option<String>,
    },
    /// Re-exec the running daemon in place, carrying forward its state.
    Reexec,
    /// Post an event.
    Emit {
        name: String,
        /// Positional arguments passed to the event's operators.
        #[arg(long = "arg")]
        args: Vec<String>,
        /// `key=value` environment entries for the event.
        #[arg(long = "env", value_parser = commands::emit::parse_env_pair)]
        env: Vec<(String, String)>,
        /// Block until the event finishes distributing.
        #[arg(long)]
        wait: bool,
    },
    /// Daemon uptime and headline counts.
    Status,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> std::process::ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(err) => match err.downcast_ref::<ExitError>() {
            Some(exit_err) => {
                eprintln!("svctl: {}", exit_err.message);
                std::process::ExitCode::from(exit_err.code as u8)
            }
            None => {
                eprintln!("svctl: {err:#}");
                std::process::ExitCode::FAILURE
            }
        },
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let format = cli.format;
    match cli.command {
        Command::Ping => commands::daemon::ping().await,
        Command::Start { name, session } => commands::job::start(name, SessionId::new(session), format).await,
        Command::Stop { name, session } => commands::job::stop(name, SessionId::new(session), format).await,
        Command::Restart { name, session } => commands::job::restart(name, SessionId::new(session), format).await,
        Command::List { session } => commands::job::list(session.map(SessionId::new), format).await,
        Command::Show { name, session } => commands::job::show(name, SessionId::new(session), format).await,
        Command::Reload { source } => commands::daemon::reload(source).await,
        Command::Reexec => commands::daemon::reexec().await,
        Command::Emit { name, args, env, wait } => commands::emit::handle(name, args, env, wait, format).await,
        Command::Status => commands::status::handle(format).await,
    }
}
