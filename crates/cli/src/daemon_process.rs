// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon process management utilities.
//!
//! Functions for starting, stopping, and monitoring the `lanced` process.

use crate::client::ClientError;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::{Duration, Instant};

/// Start the daemon in the background, returning the child process handle.
pub fn start_daemon_background() -> Result<std::process::Child, ClientError> {
    let lanced_path = find_lanced_binary()?;

    Command::new(&lanced_path)
        .stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .spawn()
        .map_err(|e| ClientError::DaemonStartFailed(e.to_string()))
}

/// Stop the daemon synchronously using SIGTERM + polling.
pub fn stop_daemon_sync() {
    if let Ok(Some(pid)) = read_daemon_pid() {
        kill_signal("-15", pid);

        let start = Instant::now();
        let timeout = super::client::timeout_exit();
        while start.elapsed() < timeout {
            if !process_exists(pid) {
                break;
            }
            std::thread::sleep(Duration::from_millis(50));
        }

        if process_exists(pid) {
            force_kill_daemon(pid);
        }
    }

    if let Ok(dir) = daemon_dir() {
        cleanup_stale_pid(&dir);
    }
}

/// Find the `lanced` binary.
fn find_lanced_binary() -> Result<PathBuf, ClientError> {
    if let Some(path) = crate::env::daemon_binary() {
        return Ok(PathBuf::from(path));
    }

    let current_exe = std::env::current_exe().ok();

    let is_debug_build = current_exe
        .as_ref()
        .and_then(|p| p.to_str())
        .map(|s| s.contains("target/debug"))
        .unwrap_or(false);

    if is_debug_build {
        if let Some(manifest_dir) = crate::env::cargo_manifest_dir() {
            let dev_path = PathBuf::from(manifest_dir)
                .parent()
                .and_then(|p| p.parent())
                .map(|p| p.join("target/debug/lanced"));
            if let Some(path) = dev_path {
                if path.exists() {
                    return Ok(path);
                }
            }
        }
    }

    if let Some(ref exe) = current_exe {
        if let Some(dir) = exe.parent() {
            let sibling = dir.join("lanced");
            if sibling.exists() {
                return Ok(sibling);
            }
        }
    }

    Ok(PathBuf::from("lanced"))
}

/// Get the admin socket path.
pub fn daemon_socket() -> Result<PathBuf, ClientError> {
    Ok(daemon_dir()?.join("lanced.sock"))
}

/// Get the state directory for the daemon.
pub fn daemon_dir() -> Result<PathBuf, ClientError> {
    crate::env::state_dir()
}

/// Clean up an orphaned PID file during shutdown.
pub fn cleanup_stale_pid(dir: &std::path::Path) {
    let pid_path = dir.join("lanced.pid");
    if pid_path.exists() {
        let _ = std::fs::remove_file(&pid_path);
    }
}

/// Get the PID from the daemon's PID file, if it exists.
pub fn read_daemon_pid() -> Result<Option<u32>, ClientError> {
    let pid_path = daemon_dir()?.join("lanced.pid");

    if !pid_path.exists() {
        return Ok(None);
    }

    match std::fs::read_to_string(&pid_path) {
        Ok(content) => Ok(content.trim().parse::<u32>().ok()),
        Err(_) => Ok(None),
    }
}

fn kill_signal(signal: &str, pid: u32) -> bool {
    Command::new("kill")
        .args([signal, &pid.to_string()])
        .stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

pub fn process_exists(pid: u32) -> bool {
    kill_signal("-0", pid)
}

pub fn force_kill_daemon(pid: u32) -> bool {
    kill_signal("-9", pid)
}

/// Startup marker prefix that the daemon writes to its log before anything else.
const STARTUP_MARKER_PREFIX: &str = "--- lanced: starting (pid: ";

/// Read the daemon log from the latest startup marker, looking for errors.
pub fn read_startup_error() -> Option<String> {
    let log_path = daemon_dir().ok()?.join("lanced.log");
    let content = std::fs::read_to_string(&log_path).ok()?;
    parse_startup_error(&content)
}

fn parse_startup_error(content: &str) -> Option<String> {
    let start_pos = content.rfind(STARTUP_MARKER_PREFIX)?;
    let startup_log = &content[start_pos..];

    let errors: Vec<&str> = startup_log
        .lines()
        .filter(|line| line.contains(" ERROR ") || line.contains("Failed to start"))
        .collect();

    if errors.is_empty() {
        return None;
    }

    let error_messages: Vec<String> = errors
        .iter()
        .filter_map(|line| line.split_once(": ").map(|(_, msg)| msg.to_string()))
        .collect();

    if error_messages.is_empty() {
        Some(errors.join("\n"))
    } else {
        Some(error_messages.join("\n"))
    }
}

/// Wrap an error with startup log info if available.
pub fn wrap_with_startup_error(err: ClientError) -> ClientError {
    if matches!(err, ClientError::DaemonStartFailed(_)) {
        return err;
    }

    if let Some(startup_error) = read_startup_error() {
        ClientError::DaemonStartFailed(startup_error)
    } else {
        err
    }
}

/// Probe whether a Unix socket is accepting connections.
pub fn probe_socket(socket_path: &Path) -> bool {
    std::os::unix::net::UnixStream::connect(socket_path).is_ok()
}

/// Remove stale socket and PID files when the daemon is not actually running.
pub fn cleanup_stale_socket() -> Result<(), ClientError> {
    let dir = daemon_dir()?;
    let socket_path = dir.join("lanced.sock");
    let pid_path = dir.join("lanced.pid");

    if pid_path.exists() {
        if let Ok(Some(pid)) = read_daemon_pid() {
            if !process_exists(pid) {
                let _ = std::fs::remove_file(&socket_path);
                let _ = std::fs::remove_file(&pid_path);
            }
        } else {
            let _ = std::fs::remove_file(&socket_path);
            let _ = std::fs::remove_file(&pid_path);
        }
    } else {
        let _ = std::fs::remove_file(&socket_path);
    }

    Ok(())
}
