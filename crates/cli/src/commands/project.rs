// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `lance project` — project roster management.

use crate::client::DaemonClient;
use crate::output::OutputFormat;
use anyhow::{anyhow, Result};
use clap::{Args, Subcommand};

#[derive(Args)]
pub struct ProjectArgs {
    #[command(subcommand)]
    pub command: ProjectCommand,
}

#[derive(Subcommand)]
pub enum ProjectCommand {
    /// List known projects
    List,
    /// Create a new project, hosting its `server.configuration` folder locally
    Add {
        /// Project name
        name: String,
        /// Local path to host the project's configuration folder under
        local_path: String,
    },
}

pub async fn project(args: ProjectArgs, format: OutputFormat) -> Result<()> {
    match args.command {
        ProjectCommand::List => list(format).await,
        ProjectCommand::Add { name, local_path } => add(name, local_path).await,
    }
}

async fn list(format: OutputFormat) -> Result<()> {
    let client = DaemonClient::for_query().map_err(|e| anyhow!("{}", e))?;
    let names = client.get_projects().await.map_err(|e| anyhow!("{}", e))?;

    match format {
        OutputFormat::Text => {
            if names.is_empty() {
                println!("no projects");
                return Ok(());
            }
            for name in names {
                println!("{}", name);
            }
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&names)?),
    }

    Ok(())
}

async fn add(name: String, local_path: String) -> Result<()> {
    let client = DaemonClient::for_action().map_err(|e| anyhow!("{}", e))?;
    client.add_project(name.clone(), local_path).await.map_err(|e| anyhow!("{}", e))?;
    println!("project created: {}", name);
    Ok(())
}
