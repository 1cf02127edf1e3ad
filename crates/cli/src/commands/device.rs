// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `lance device` — device roster management.

use crate::client::DaemonClient;
use crate::output::OutputFormat;
use anyhow::{anyhow, Result};
use clap::{Args, Subcommand};

#[derive(Args)]
pub struct DeviceArgs {
    #[command(subcommand)]
    pub command: DeviceCommand,
}

#[derive(Subcommand)]
pub enum DeviceCommand {
    /// List known devices
    List,
    /// Add a device to the roster
    Add {
        /// Syncthing device ID
        device_id: String,
        /// Human-readable name
        #[arg(long)]
        name: Option<String>,
    },
    /// Schedule a device for removal
    Remove {
        /// Syncthing device ID
        device_id: String,
    },
}

pub async fn device(args: DeviceArgs, format: OutputFormat) -> Result<()> {
    match args.command {
        DeviceCommand::List => list(format).await,
        DeviceCommand::Add { device_id, name } => add(device_id, name).await,
        DeviceCommand::Remove { device_id } => remove(device_id).await,
    }
}

async fn list(format: OutputFormat) -> Result<()> {
    let client = DaemonClient::for_query().map_err(|e| anyhow!("{}", e))?;
    let devices = client.get_devices().await.map_err(|e| anyhow!("{}", e))?;

    match format {
        OutputFormat::Text => {
            if devices.is_empty() {
                println!("no devices");
                return Ok(());
            }
            for d in devices {
                let marker = if d.is_server { "*" } else { " " };
                let conn = if d.connected { "connected" } else { "disconnected" };
                let del = if d.scheduled_for_deletion { " (scheduled for deletion)" } else { "" };
                println!("{marker} {:<14} {} [{}]{}", d.name, d.id, conn, del);
            }
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&devices)?),
    }

    Ok(())
}

async fn add(device_id: String, name: Option<String>) -> Result<()> {
    let client = DaemonClient::for_action().map_err(|e| anyhow!("{}", e))?;
    client.add_device(device_id, name).await.map_err(|e| anyhow!("{}", e))?;
    println!("device added");
    Ok(())
}

async fn remove(device_id: String) -> Result<()> {
    let client = DaemonClient::for_action().map_err(|e| anyhow!("{}", e))?;
    client.remove_device(device_id).await.map_err(|e| anyhow!("{}", e))?;
    println!("device scheduled for removal");
    Ok(())
}
