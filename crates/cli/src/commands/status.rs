// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `lance status` — quick overview of the running daemon.

use crate::client::DaemonClient;
use crate::output::OutputFormat;
use anyhow::{anyhow, Result};
use clap::Args;

#[derive(Args)]
pub struct StatusArgs;

pub async fn status(_args: StatusArgs, format: OutputFormat) -> Result<()> {
    let client = DaemonClient::for_query().map_err(|e| anyhow!("{}", e))?;
    let info = client.status().await.map_err(|e| anyhow!("{}", e))?;

    match format {
        OutputFormat::Text => {
            println!("my_id: {}", info.my_id);
            println!("server: {}", info.is_server);
            println!("config synced: {}", info.config_synced);
            println!("devices: {}", info.device_count);
            println!("folders: {}", info.folder_count);
            println!("projects: {}", info.project_count);
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&info)?);
        }
    }

    Ok(())
}
