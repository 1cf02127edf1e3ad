// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Sync-daemon child process lifecycle (spec.md §4.3.1, §5).
//!
//! This is the one place that shells out to the `syncthing` binary itself,
//! as opposed to talking to it over HTTP once it's up (`lance-adapters::http`).

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use lance_core::DeviceId;
use thiserror::Error;
use tokio::process::{Child, Command};

use crate::subprocess::{run_with_timeout, SYNCTHING_CLI_TIMEOUT, SYNCTHING_SHUTDOWN_TIMEOUT};

#[derive(Debug, Error)]
pub enum SyncthingProcessError {
    #[error("failed to spawn sync-daemon binary {binary}: {source}")]
    Spawn {
        binary: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{0}")]
    Cli(String),

    #[error("sync-daemon printed no usable device id")]
    NoDeviceId,
}

/// A spawned sync-daemon child process, scoped to one `-home` directory.
pub struct SyncthingProcess {
    child: Child,
    home_dir: PathBuf,
}

impl SyncthingProcess {
    /// Launch the sync-daemon with its GUI and CLI both disabled; the
    /// handler talks to it exclusively through the REST API once it
    /// reports ready (spec.md §4.3.1).
    pub fn spawn(binary: &Path, home_dir: &Path) -> Result<Self, SyncthingProcessError> {
        let child = Command::new(binary)
            .arg("-home")
            .arg(home_dir)
            .arg("-no-browser")
            .arg("-no-restart")
            .arg("-no-upgrade")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| SyncthingProcessError::Spawn {
                binary: binary.to_path_buf(),
                source,
            })?;

        Ok(Self {
            child,
            home_dir: home_dir.to_path_buf(),
        })
    }

    pub fn pid(&self) -> Option<u32> {
        self.child.id()
    }

    pub fn home_dir(&self) -> &Path {
        &self.home_dir
    }

    /// Wait for the child to exit on its own (it shouldn't, under normal
    /// operation — this is used to detect a crashed sync-daemon).
    pub async fn wait(&mut self) -> std::io::Result<std::process::ExitStatus> {
        self.child.wait().await
    }

    /// Ask the sync-daemon to exit, escalating to a hard kill if it
    /// doesn't within [`SYNCTHING_SHUTDOWN_TIMEOUT`].
    pub async fn shutdown(mut self) -> Result<(), SyncthingProcessError> {
        if let Some(pid) = self.child.id() {
            let mut term = Command::new("kill");
            term.arg("-TERM").arg(pid.to_string());
            let _ = run_with_timeout(term, Duration::from_secs(5), "kill -TERM syncthing").await;
        }

        match tokio::time::timeout(SYNCTHING_SHUTDOWN_TIMEOUT, self.child.wait()).await {
            Ok(Ok(_)) => Ok(()),
            _ => {
                let _ = self.child.kill().await;
                Ok(())
            }
        }
    }
}

/// Probe the identity the sync-daemon would use for an existing `-home`
/// directory, without starting it (spec.md §4.3.1 bootstrap probe).
pub async fn device_id(binary: &Path, home_dir: &Path) -> Result<DeviceId, SyncthingProcessError> {
    let mut cmd = Command::new(binary);
    cmd.arg("-home").arg(home_dir).arg("-device-id");
    let output = run_with_timeout(cmd, SYNCTHING_CLI_TIMEOUT, "syncthing -device-id")
        .await
        .map_err(SyncthingProcessError::Cli)?;

    let id = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if id.is_empty() {
        return Err(SyncthingProcessError::NoDeviceId);
    }
    Ok(DeviceId::new(id))
}

/// Generate a fresh device key pair and config skeleton under `home_dir`
/// (spec.md §4.3.1: "no prior configuration" branch).
pub async fn generate_keys(binary: &Path, home_dir: &Path) -> Result<(), SyncthingProcessError> {
    let mut cmd = Command::new(binary);
    cmd.arg("-generate").arg(home_dir);
    run_with_timeout(cmd, SYNCTHING_CLI_TIMEOUT, "syncthing -generate")
        .await
        .map_err(SyncthingProcessError::Cli)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spawn_nonexistent_binary_is_an_error() {
        let err = SyncthingProcess::spawn(Path::new("/nonexistent/syncthing"), Path::new("/tmp"))
            .unwrap_err();
        assert!(matches!(err, SyncthingProcessError::Spawn { .. }));
    }
}
