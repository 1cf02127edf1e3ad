// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! lance - operator CLI for the Lance collaboration daemon

mod client;
mod color;
mod commands;
mod daemon_process;
mod env;
mod output;

use anyhow::Result;
use clap::{CommandFactory, FromArgMatches, Parser, Subcommand};
use commands::{daemon, device, folder, project, status};
use output::OutputFormat;

#[derive(Parser)]
#[command(
    name = "lance",
    version,
    about = "Operator CLI for the Lance collaboration daemon"
)]
struct Cli {
    /// Output format
    #[arg(short = 'o', long = "output", value_enum, default_value_t, global = true)]
    output: OutputFormat,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show overview of the running daemon
    Status(status::StatusArgs),
    /// Daemon process management
    Daemon(daemon::DaemonArgs),
    /// Device roster management
    Device(device::DeviceArgs),
    /// Folder management
    Folder(folder::FolderArgs),
    /// Project management
    Project(project::ProjectArgs),
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let matches = Cli::command().styles(color::styles()).get_matches();
    let cli = Cli::from_arg_matches(&matches)?;
    let format = cli.output;

    match cli.command {
        Some(Commands::Status(args)) => status::status(args, format).await,
        Some(Commands::Daemon(args)) => daemon::daemon(args, format).await,
        Some(Commands::Device(args)) => device::device(args, format).await,
        Some(Commands::Folder(args)) => folder::folder(args, format).await,
        Some(Commands::Project(args)) => project::project(args, format).await,
        None => {
            Cli::command().styles(color::styles()).print_help()?;
            Ok(())
        }
    }
}
