// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `svctl start|stop|restart|list|show` — instance lifecycle and queries.

use anyhow::Result;
use sv_core::SessionId;

use crate::client::DaemonClient;
use crate::commands::job_display::{format_pid_map, format_summary};
use crate::exit_error::ExitError;
use crate::output::OutputFormat;

pub async fn start(name: String, session: SessionId, format: OutputFormat) -> Result<()> {
    let mut client = DaemonClient::connect().await?;
    let id = client.start(name, session).await?;
    print_instance(&id, format);
    Ok(())
}

pub async fn stop(name: String, session: SessionId, format: OutputFormat) -> Result<()> {
    let mut client = DaemonClient::connect().await?;
    let id = client.stop(name, session).await?;
    print_instance(&id, format);
    Ok(())
}

pub async fn restart(name: String, session: SessionId, format: OutputFormat) -> Result<()> {
    let mut client = DaemonClient::connect().await?;
    let id = client.restart(name, session).await?;
    print_instance(&id, format);
    Ok(())
}

pub async fn list(session: Option<SessionId>, format: OutputFormat) -> Result<()> {
    let mut client = DaemonClient::connect().await?;
    let jobs = client.list_jobs(session).await?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&jobs)?),
        OutputFormat::Text => {
            if jobs.is_empty() {
                println!("No instances");
            }
            for job in &jobs {
                println!("{}", format_summary(job));
            }
        }
    }
    Ok(())
}

pub async fn show(name: String, session: SessionId, format: OutputFormat) -> Result<()> {
    let mut client = DaemonClient::connect().await?;
    let job = client.get_job(name.clone(), session).await?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&job)?),
        OutputFormat::Text => match job {
            None => return Err(ExitError::usage(format!("no instance of {name}")).into()),
            Some(detail) => {
                println!("{}", format_summary(&detail.summary));
                println!("pid:\t{}", format_pid_map(&detail.pid));
                if detail.failed {
                    println!("failed in: {:?}", detail.failed_process);
                }
            }
        },
    }
    Ok(())
}

fn print_instance(id: &sv_core::JobId, format: OutputFormat) {
    match format {
        OutputFormat::Json => println!("{}", serde_json::json!({ "id": id.as_str() })),
        OutputFormat::Text => println!("{id}"),
    }
}
