// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `lance daemon` — daemon process management commands

use crate::client::DaemonClient;
use crate::daemon_process::{process_exists, read_daemon_pid, stop_daemon_sync};
use crate::output::OutputFormat;
use anyhow::{anyhow, Result};
use clap::{Args, Subcommand};

#[derive(Args)]
pub struct DaemonArgs {
    #[command(subcommand)]
    pub command: Option<DaemonCommand>,
}

#[derive(Subcommand)]
pub enum DaemonCommand {
    /// Start the daemon in the background
    Start,
    /// Stop the daemon
    Stop,
    /// Check daemon status
    Status,
    /// Stop and restart the daemon
    Restart,
    /// Show the tail of the daemon log
    Logs {
        /// Number of recent lines to show
        #[arg(short = 'n', long, default_value = "50")]
        limit: usize,
    },
}

pub async fn daemon(args: DaemonArgs, format: OutputFormat) -> Result<()> {
    match args.command {
        Some(DaemonCommand::Start) => start().await,
        Some(DaemonCommand::Stop) => stop().await,
        Some(DaemonCommand::Restart) => restart().await,
        Some(DaemonCommand::Status) => status(format).await,
        Some(DaemonCommand::Logs { limit }) => logs(limit, format),
        None => status(format).await,
    }
}

async fn start() -> Result<()> {
    if let Ok(client) = DaemonClient::connect() {
        if client.status().await.is_ok() {
            println!("daemon already running");
            return Ok(());
        }
    }

    match DaemonClient::for_action() {
        Ok(_client) => {
            println!("daemon started");
            Ok(())
        }
        Err(e) => Err(anyhow!("{}", e)),
    }
}

async fn stop() -> Result<()> {
    match read_daemon_pid()? {
        Some(pid) if process_exists(pid) => {
            stop_daemon_sync();
            println!("daemon stopped");
        }
        _ => println!("daemon not running"),
    }
    Ok(())
}

async fn restart() -> Result<()> {
    stop().await?;
    tokio::time::sleep(std::time::Duration::from_millis(500)).await;
    match DaemonClient::for_action() {
        Ok(_client) => {
            println!("daemon restarted");
            Ok(())
        }
        Err(e) => Err(anyhow!("{}", e)),
    }
}

async fn status(format: OutputFormat) -> Result<()> {
    let not_running = || match format {
        OutputFormat::Text => {
            println!("daemon not running");
            Ok(())
        }
        OutputFormat::Json => {
            println!(r#"{{ "status": "not_running" }}"#);
            Ok(())
        }
    };

    let client = match DaemonClient::connect() {
        Ok(c) => c,
        Err(_) => return not_running(),
    };

    let info = match client.status().await {
        Ok(info) => info,
        Err(crate::client::ClientError::DaemonNotRunning) => return not_running(),
        Err(e) => return Err(anyhow!("{}", e)),
    };

    match format {
        OutputFormat::Text => {
            println!("status: running");
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

fn logs(limit: usize, format: OutputFormat) -> Result<()> {
    let log_path = crate::daemon_process::daemon_dir()?.join("lanced.log");

    if !log_path.exists() {
        match format {
            OutputFormat::Text => println!("no log file found at {}", log_path.display()),
            OutputFormat::Json => println!(r#"{{ "lines": [] }}"#),
        }
        return Ok(());
    }

    let content = std::fs::read_to_string(&log_path)?;
    let lines: Vec<&str> = content.lines().rev().take(limit).collect();
    let lines: Vec<&str> = lines.into_iter().rev().collect();

    match format {
        OutputFormat::Text => {
            for line in lines {
                println!("{}", line);
            }
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&serde_json::json!({ "lines": lines }))?);
        }
    }

    Ok(())
}
