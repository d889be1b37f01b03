// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `svctl status` — daemon uptime and headline counts.

use anyhow::Result;

use crate::client::DaemonClient;
use crate::output::OutputFormat;

pub async fn handle(format: OutputFormat) -> Result<()> {
    let mut client = DaemonClient::connect().await?;
    let (uptime_secs, jobs_active, classes_loaded) = client.status().await?;

    match format {
        OutputFormat::Json => println!(
            "{}",
            serde_json::json!({
                "uptime_secs": uptime_secs,
                "jobs_active": jobs_active,
                "classes_loaded": classes_loaded,
            })
        ),
        OutputFormat::Text => {
            println!("svd uptime: {uptime_secs}s");
            println!("jobs active: {jobs_active}");
            println!("classes loaded: {classes_loaded}");
        }
    }
    Ok(())
}
