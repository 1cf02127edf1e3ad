// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon client for CLI commands.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crate::daemon_process::{
    cleanup_stale_socket, daemon_dir, daemon_socket, probe_socket, read_startup_error,
    start_daemon_background, stop_daemon_sync, wrap_with_startup_error,
};

use lance_daemon::protocol::{self, ProtocolError};
use lance_daemon::{DeviceInfo, FolderInfo, Request, Response, StatusInfo};
use thiserror::Error;
use tokio::net::UnixStream;

fn parse_duration_ms(var: &str) -> Option<Duration> {
    std::env::var(var)
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
}

pub fn timeout_ipc() -> Duration {
    parse_duration_ms("LANCE_TIMEOUT_IPC_MS").unwrap_or(Duration::from_secs(5))
}

pub fn timeout_connect() -> Duration {
    parse_duration_ms("LANCE_TIMEOUT_CONNECT_MS").unwrap_or(Duration::from_secs(5))
}

pub fn timeout_exit() -> Duration {
    parse_duration_ms("LANCE_TIMEOUT_EXIT_MS").unwrap_or(Duration::from_secs(2))
}

pub fn poll_interval() -> Duration {
    parse_duration_ms("LANCE_CONNECT_POLL_MS").unwrap_or(Duration::from_millis(50))
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("daemon not running")]
    DaemonNotRunning,

    #[error("failed to start daemon: {0}")]
    DaemonStartFailed(String),

    #[error("connection timeout waiting for daemon to start")]
    DaemonStartTimeout,

    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("request rejected: {0}")]
    Rejected(String),

    #[error("unexpected response from daemon")]
    UnexpectedResponse,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("could not determine state directory")]
    NoStateDir,
}

/// Client for the daemon's admin socket.
pub struct DaemonClient {
    socket_path: PathBuf,
}

impl DaemonClient {
    /// For action commands — auto-start the daemon, at most one restart
    /// per process to avoid looping if startup keeps failing.
    pub fn for_action() -> Result<Self, ClientError> {
        static RESTARTED: AtomicBool = AtomicBool::new(false);

        if RESTARTED.load(Ordering::SeqCst) {
            return Self::connect();
        }

        let version_path = daemon_dir()?.join("lanced.version");
        if let Ok(daemon_version) = std::fs::read_to_string(&version_path) {
            let cli_version = env!("CARGO_PKG_VERSION");
            if daemon_version.trim() != cli_version {
                RESTARTED.store(true, Ordering::SeqCst);
                eprintln!(
                    "warn: daemon version {} does not match cli version {}, restarting daemon",
                    daemon_version.trim(),
                    cli_version
                );
                stop_daemon_sync();
            }
        }

        match Self::connect() {
            Ok(client) => {
                if probe_socket(&client.socket_path) {
                    Ok(client)
                } else {
                    cleanup_stale_socket()?;
                    let child = start_daemon_background()?;
                    Self::connect_with_retry(timeout_connect(), child)
                }
            }
            Err(ClientError::DaemonNotRunning) => {
                let child = start_daemon_background()?;
                Self::connect_with_retry(timeout_connect(), child)
            }
            Err(e) => Err(wrap_with_startup_error(e)),
        }
    }

    /// For query commands — connect only, no auto-start.
    pub fn for_query() -> Result<Self, ClientError> {
        Self::connect()
    }

    /// Connect to an existing daemon, no auto-start.
    pub fn connect() -> Result<Self, ClientError> {
        let socket_path = daemon_socket()?;

        if !socket_path.exists() {
            return Err(ClientError::DaemonNotRunning);
        }

        Ok(Self { socket_path })
    }

    fn connect_with_retry(timeout: Duration, mut child: std::process::Child) -> Result<Self, ClientError> {
        let start = Instant::now();
        while start.elapsed() < timeout {
            match child.try_wait() {
                Ok(Some(status)) => {
                    let poll_start = Instant::now();
                    while poll_start.elapsed() < timeout_exit() {
                        if let Some(err) = read_startup_error() {
                            return Err(ClientError::DaemonStartFailed(err));
                        }
                        std::thread::sleep(poll_interval());
                    }
                    return Err(ClientError::DaemonStartFailed(format!("exited with {}", status)));
                }
                Ok(None) => {}
                Err(_) => {}
            }

            match Self::connect() {
                Ok(client) => return Ok(client),
                Err(ClientError::DaemonNotRunning) => std::thread::sleep(poll_interval()),
                Err(e) => return Err(wrap_with_startup_error(e)),
            }
        }

        Err(wrap_with_startup_error(ClientError::DaemonStartTimeout))
    }

    async fn send_with_timeout(
        &self,
        request: &Request,
        read_timeout: Duration,
        write_timeout: Duration,
    ) -> Result<Response, ClientError> {
        let stream = UnixStream::connect(&self.socket_path).await?;
        let (mut reader, mut writer) = stream.into_split();

        let data = protocol::encode(request)?;
        tokio::time::timeout(write_timeout, protocol::write_message(&mut writer, &data))
            .await
            .map_err(|_| ProtocolError::Timeout)??;

        let response_bytes = tokio::time::timeout(read_timeout, protocol::read_message(&mut reader))
            .await
            .map_err(|_| ProtocolError::Timeout)??;

        let response: Response = protocol::decode(&response_bytes)?;
        Ok(response)
    }

    pub async fn send(&self, request: &Request) -> Result<Response, ClientError> {
        self.send_with_timeout(request, timeout_ipc(), timeout_ipc()).await
    }

    async fn send_simple(&self, request: &Request) -> Result<(), ClientError> {
        match self.send(request).await? {
            Response::Ok => Ok(()),
            Response::Error { message } => Err(ClientError::Rejected(message)),
            _ => Err(ClientError::UnexpectedResponse),
        }
    }

    fn reject<T>(response: Response) -> Result<T, ClientError> {
        match response {
            Response::Error { message } => Err(ClientError::Rejected(message)),
            _ => Err(ClientError::UnexpectedResponse),
        }
    }

    pub async fn hello(&self) -> Result<String, ClientError> {
        match self
            .send(&Request::Hello {
                version: env!("CARGO_PKG_VERSION").to_string(),
            })
            .await?
        {
            Response::Hello { version } => Ok(version),
            other => Self::reject(other),
        }
    }

    pub async fn status(&self) -> Result<StatusInfo, ClientError> {
        match self.send(&Request::Status).await? {
            Response::Status(info) => Ok(info),
            other => Self::reject(other),
        }
    }

    pub async fn get_devices(&self) -> Result<Vec<DeviceInfo>, ClientError> {
        match self.send(&Request::GetDevices).await? {
            Response::Devices(devices) => Ok(devices),
            other => Self::reject(other),
        }
    }

    pub async fn get_folders(&self) -> Result<Vec<FolderInfo>, ClientError> {
        match self.send(&Request::GetFolders).await? {
            Response::Folders(folders) => Ok(folders),
            other => Self::reject(other),
        }
    }

    pub async fn get_projects(&self) -> Result<Vec<String>, ClientError> {
        match self.send(&Request::GetProjects).await? {
            Response::Projects(names) => Ok(names),
            other => Self::reject(other),
        }
    }

    pub async fn add_project(&self, name: String, local_path: String) -> Result<(), ClientError> {
        self.send_simple(&Request::AddProject { name, local_path }).await
    }

    pub async fn add_device(&self, device_id: String, name: Option<String>) -> Result<(), ClientError> {
        self.send_simple(&Request::AddDevice { device_id, name }).await
    }

    pub async fn remove_device(&self, device_id: String) -> Result<(), ClientError> {
        self.send_simple(&Request::RemoveDevice { device_id }).await
    }

    pub async fn add_folder(
        &self,
        id: Option<String>,
        label: String,
        local_path: Option<String>,
        devices: Vec<String>,
    ) -> Result<String, ClientError> {
        match self
            .send(&Request::AddFolder { id, label, local_path, devices })
            .await?
        {
            Response::FolderCreated { folder_id } => Ok(folder_id),
            other => Self::reject(other),
        }
    }

    pub async fn remove_folder(&self, folder_id: String) -> Result<(), ClientError> {
        self.send_simple(&Request::RemoveFolder { folder_id }).await
    }

    pub async fn set_folder_devices(&self, folder_id: String, devices: Vec<String>) -> Result<(), ClientError> {
        self.send_simple(&Request::SetFolderDevices { folder_id, devices }).await
    }

    pub async fn shutdown(&self) -> Result<(), ClientError> {
        match self.send(&Request::Shutdown).await? {
            Response::ShuttingDown => Ok(()),
            other => Self::reject(other),
        }
    }
}
