// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `svctl emit` — post an event, optionally waiting for it to finish
//! distributing (spec.md Testable Scenario S4).

use std::collections::HashMap;

use anyhow::Result;

use crate::client::DaemonClient;
use crate::output::OutputFormat;

pub async fn handle(
    name: String,
    args: Vec<String>,
    env: Vec<(String, String)>,
    wait: bool,
    format: OutputFormat,
) -> Result<()> {
    let env: HashMap<String, String> = env.into_iter().collect();
    let mut client = DaemonClient::connect().await?;
    let (id, progress) = client.emit(name, args, env, wait).await?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::json!({ "id": id, "progress": progress })),
        OutputFormat::Text => match progress {
            Some(progress) => println!("{id}\t{progress:?}"),
            None => println!("{id}"),
        },
    }
    Ok(())
}

/// Parses a `key=value` argument, as used by `--env`.
pub fn parse_env_pair(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) => Ok((key.to_string(), value.to_string())),
        None => Err(format!("expected key=value, got {raw:?}")),
    }
}
