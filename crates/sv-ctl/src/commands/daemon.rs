// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `svctl reload|reexec|ping` — whole-daemon operations.

use anyhow::Result;

use crate::client::DaemonClient;

pub async fn reload(source: Option<String>) -> Result<()> {
    let mut client = DaemonClient::connect().await?;
    client.reload(source).await?;
    println!("reloaded");
    Ok(())
}

pub async fn reexec() -> Result<()> {
    let mut client = DaemonClient::connect().await?;
    client.reexec().await?;
    println!("re-exec requested");
    Ok(())
}

pub async fn ping() -> Result<()> {
    let mut client = DaemonClient::connect().await?;
    client.ping().await?;
    println!("svd is up");
    Ok(())
}
