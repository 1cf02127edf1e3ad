// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `lance folder` — ad hoc folder management (outside the project/shot model).

use crate::client::DaemonClient;
use crate::output::OutputFormat;
use anyhow::{anyhow, Result};
use clap::{Args, Subcommand};

#[derive(Args)]
pub struct FolderArgs {
    #[command(subcommand)]
    pub command: FolderCommand,
}

#[derive(Subcommand)]
pub enum FolderCommand {
    /// List known folders
    List,
    /// Add a folder
    Add {
        /// Folder label
        label: String,
        /// Local path on disk
        #[arg(long)]
        local_path: Option<String>,
        /// Device IDs to share with (can be repeated)
        #[arg(long = "device")]
        devices: Vec<String>,
    },
    /// Remove a folder
    Remove {
        /// Folder ID
        folder_id: String,
    },
    /// Replace a folder's device roster
    SetDevices {
        /// Folder ID
        folder_id: String,
        /// Device IDs to share with (can be repeated)
        #[arg(long = "device")]
        devices: Vec<String>,
    },
}

pub async fn folder(args: FolderArgs, format: OutputFormat) -> Result<()> {
    match args.command {
        FolderCommand::List => list(format).await,
        FolderCommand::Add { label, local_path, devices } => add(label, local_path, devices).await,
        FolderCommand::Remove { folder_id } => remove(folder_id).await,
        FolderCommand::SetDevices { folder_id, devices } => set_devices(folder_id, devices).await,
    }
}

async fn list(format: OutputFormat) -> Result<()> {
    let client = DaemonClient::for_query().map_err(|e| anyhow!("{}", e))?;
    let folders = client.get_folders().await.map_err(|e| anyhow!("{}", e))?;

    match format {
        OutputFormat::Text => {
            if folders.is_empty() {
                println!("no folders");
                return Ok(());
            }
            for f in folders {
                let synced = if f.synced { "synced" } else { "syncing" };
                println!("{:<40} {:<24} [{}] devices: {}", f.id, f.label, synced, f.devices.len());
            }
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&folders)?),
    }

    Ok(())
}

async fn add(label: String, local_path: Option<String>, devices: Vec<String>) -> Result<()> {
    let client = DaemonClient::for_action().map_err(|e| anyhow!("{}", e))?;
    let folder_id = client
        .add_folder(None, label, local_path, devices)
        .await
        .map_err(|e| anyhow!("{}", e))?;
    println!("folder created: {}", folder_id);
    Ok(())
}

async fn remove(folder_id: String) -> Result<()> {
    let client = DaemonClient::for_action().map_err(|e| anyhow!("{}", e))?;
    client.remove_folder(folder_id).await.map_err(|e| anyhow!("{}", e))?;
    println!("folder removed");
    Ok(())
}

async fn set_devices(folder_id: String, devices: Vec<String>) -> Result<()> {
    let client = DaemonClient::for_action().map_err(|e| anyhow!("{}", e))?;
    client
        .set_folder_devices(folder_id, devices)
        .await
        .map_err(|e| anyhow!("{}", e))?;
    println!("folder devices updated");
    Ok(())
}
