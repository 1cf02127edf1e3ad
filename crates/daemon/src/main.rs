// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lance Daemon (lanced)
//!
//! Background process that owns the sync-daemon child, the event bus, and
//! the admin socket. Unlike `ojd`'s WAL-driven engine loop, `lanced` has no
//! durable event log of its own to replay: the sync-daemon handler's event
//! long-poll and the dispatcher's run loop are both self-driving background
//! tasks started during [`lifecycle::startup`], so the process only needs
//! to wait for a shutdown signal.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod config;
mod env;
mod error;
mod event_bus;
mod lifecycle;
mod listener;
mod processor;
mod project_manager;
mod protocol;
mod server;
mod syncthing;
mod worker;

use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info};

use crate::config::Config;
use crate::error::DaemonError;
use crate::lifecycle::StartupResult;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    if let Some(arg) = std::env::args().nth(1) {
        match arg.as_str() {
            "--version" | "-V" | "-v" => {
                println!("lanced {}", env!("CARGO_PKG_VERSION"));
                return Ok(());
            }
            "--help" | "-h" | "help" => {
                println!("lanced {}", env!("CARGO_PKG_VERSION"));
                println!("Lance Daemon - owns the sync-daemon process and the project roster");
                println!();
                println!("USAGE:");
                println!("    lanced");
                println!();
                println!("The daemon is typically started by the `lance` CLI and should not");
                println!("be invoked directly. It listens on a Unix socket for commands");
                println!("from `lance`.");
                println!();
                println!("OPTIONS:");
                println!("    -h, --help       Print help information");
                println!("    -v, --version    Print version information");
                return Ok(());
            }
            _ => {
                eprintln!("error: unexpected argument '{arg}'");
                eprintln!("Usage: lanced [--help | --version]");
                std::process::exit(1);
            }
        }
    }

    let config = Config::load()?;

    rotate_log_if_needed(&config.log_path);
    write_startup_marker(&config)?;
    let log_guard = setup_logging(&config)?;

    info!("starting lance daemon");

    let StartupResult {
        daemon,
        listener,
        shutdown,
    } = match lifecycle::startup(&config).await {
        Ok(r) => r,
        Err(DaemonError::LockFailed(_)) => {
            let pid = std::fs::read_to_string(&config.lock_path)
                .unwrap_or_default()
                .trim()
                .to_string();
            let version = std::fs::read_to_string(&config.version_path)
                .unwrap_or_default()
                .trim()
                .to_string();

            eprintln!("lanced is already running");
            if !pid.is_empty() {
                eprintln!("  pid: {pid}");
            }
            if !version.is_empty() {
                let current_version = env!("CARGO_PKG_VERSION");
                if version == current_version {
                    eprintln!("  version: {version}");
                } else {
                    eprintln!("  version: {version} (outdated — current: {current_version})");
                }
            }
            std::process::exit(1);
        }
        Err(e) => {
            write_startup_error(&config, &e);
            error!("failed to start daemon: {}", e);
            drop(log_guard);
            return Err(e.into());
        }
    };

    tokio::spawn(listener.run());

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    info!("daemon ready, listening on {}", config.socket_path.display());
    println!("READY");

    loop {
        tokio::select! {
            _ = shutdown.notified() => {
                info!("shutdown requested via command");
                break;
            }
            _ = sigterm.recv() => {
                info!("received SIGTERM, shutting down...");
                break;
            }
            _ = sigint.recv() => {
                info!("received SIGINT, shutting down...");
                break;
            }
        }
    }

    daemon.shutdown().await;
    info!("daemon stopped");
    Ok(())
}

/// Maximum log file size before rotation (10 MB).
const MAX_LOG_SIZE: u64 = 10 * 1024 * 1024;

/// Number of rotated log files to keep (lanced.log.1, .2, .3).
const MAX_ROTATED_LOGS: u32 = 3;

/// Rotate the daemon log file if it exceeds [`MAX_LOG_SIZE`].
///
/// Shifts `lanced.log` → `lanced.log.1` → `lanced.log.2` → `lanced.log.3`,
/// deleting the oldest. Best-effort: rotation failures are silently ignored
/// so the daemon still starts.
fn rotate_log_if_needed(log_path: &std::path::Path) {
    let size = match std::fs::metadata(log_path) {
        Ok(m) => m.len(),
        Err(_) => return,
    };

    if size < MAX_LOG_SIZE {
        return;
    }

    let log_str = log_path.display().to_string();

    for i in (1..MAX_ROTATED_LOGS).rev() {
        let from = format!("{log_str}.{i}");
        let to = format!("{log_str}.{}", i + 1);
        let _ = std::fs::rename(&from, &to);
    }

    let _ = std::fs::rename(log_path, format!("{log_str}.1"));
}

/// Startup marker prefix written to log before anything else.
/// Full format: "--- lanced: starting (pid: 12345) ---"
const STARTUP_MARKER_PREFIX: &str = "--- lanced: starting (pid: ";

fn write_startup_marker(config: &Config) -> Result<(), DaemonError> {
    use std::io::Write;

    if let Some(parent) = config.log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.log_path)?;
    writeln!(file, "{}{}) ---\n", STARTUP_MARKER_PREFIX, std::process::id())?;

    Ok(())
}

fn write_startup_error(config: &Config, error: &DaemonError) {
    use std::io::Write;

    let Ok(mut file) = std::fs::OpenOptions::new().create(true).append(true).open(&config.log_path) else {
        return;
    };
    let _ = writeln!(file, "ERROR failed to start daemon: {}", error);
}

fn setup_logging(config: &Config) -> Result<tracing_appender::non_blocking::WorkerGuard, DaemonError> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    if let Some(parent) = config.log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let file_appender = tracing_appender::rolling::never(
        config.log_path.parent().ok_or(DaemonError::NoStateDir)?,
        config.log_path.file_name().ok_or(DaemonError::NoStateDir)?,
    );
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(non_blocking))
        .init();

    Ok(guard)
}
