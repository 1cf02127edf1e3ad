// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Admin socket listener: accepts connections on `Config::socket_path` and
//! dispatches each request against the running [`Server`] (spec.md §4.5
//! footnote). Mirrors `oj-daemon::listener`'s shape — one task per
//! connection, request handling never blocks the accept loop.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;

use lance_adapters::http::SyncthingClient;
use lance_core::{Clock, DeviceId, FolderId, ProjectName};
use thiserror::Error;
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::Notify;
use tracing::{debug, error, warn};

use crate::protocol::{
    self, DeviceInfo, FolderInfo, ProtocolError, Request, Response, StatusInfo, DEFAULT_TIMEOUT,
    PROTOCOL_VERSION,
};
use crate::server::Server;

#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),
}

/// Admin-socket listener task.
pub struct Listener<C: SyncthingClient, CK: Clock + Send + 'static> {
    socket: UnixListener,
    server: Arc<Server<C, CK>>,
    shutdown: Arc<Notify>,
}

impl<C: SyncthingClient, CK: Clock + Send + 'static> Listener<C, CK> {
    pub fn bind(
        socket_path: &Path,
        server: Arc<Server<C, CK>>,
        shutdown: Arc<Notify>,
    ) -> std::io::Result<Self> {
        if socket_path.exists() {
            std::fs::remove_file(socket_path)?;
        }
        let socket = UnixListener::bind(socket_path)?;
        Ok(Self { socket, server, shutdown })
    }

    pub async fn run(self) {
        loop {
            match self.socket.accept().await {
                Ok((stream, _)) => {
                    let server = Arc::clone(&self.server);
                    let shutdown = Arc::clone(&self.shutdown);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(stream, &server, &shutdown).await {
                            match e {
                                ConnectionError::Protocol(ProtocolError::ConnectionClosed) => {
                                    debug!("admin client disconnected");
                                }
                                ConnectionError::Protocol(ProtocolError::Timeout) => {
                                    warn!("admin connection timed out");
                                }
                                _ => error!(error = %e, "admin connection error"),
                            }
                        }
                    });
                }
                Err(e) => error!(error = %e, "admin socket accept failed"),
            }
        }
    }
}

async fn handle_connection<C: SyncthingClient, CK: Clock + Send + 'static>(
    stream: UnixStream,
    server: &Server<C, CK>,
    shutdown: &Notify,
) -> Result<(), ConnectionError> {
    let (mut reader, mut writer) = stream.into_split();
    let request = protocol::read_request(&mut reader, DEFAULT_TIMEOUT).await?;
    debug!(request = ?request, "received admin request");
    let response = handle_request(request, server, shutdown).await;
    protocol::write_response(&mut writer, &response, DEFAULT_TIMEOUT).await?;
    Ok(())
}

async fn handle_request<C: SyncthingClient, CK: Clock + Send + 'static>(
    request: Request,
    server: &Server<C, CK>,
    shutdown: &Notify,
) -> Response {
    match request {
        Request::Ping => Response::Pong,
        Request::Hello { .. } => Response::Hello {
            version: PROTOCOL_VERSION.to_string(),
        },

        Request::Status => {
            let devices = server.syncthing().call(|h| {
                Box::pin(async move {
                    Ok::<_, lance_core::SyncthingError>((
                        h.get_devices().len(),
                        h.get_folders().len(),
                        h.is_server(),
                        format!("{:?}", h.config_synced()),
                    ))
                })
            });
            match devices.wait().await {
                Ok((device_count, folder_count, is_server, config_synced)) => {
                    Response::Status(StatusInfo {
                        my_id: String::new(),
                        is_server,
                        config_synced,
                        device_count,
                        folder_count,
                        project_count: server.project_names().len(),
                    })
                }
                Err(e) => error_response(e),
            }
        }

        Request::GetDevices => {
            let handle = server
                .syncthing()
                .call(|h| Box::pin(async move { Ok::<_, lance_core::SyncthingError>(h.get_devices()) }));
            match handle.wait().await {
                Ok(devices) => Response::Devices(
                    devices
                        .into_iter()
                        .map(|d| DeviceInfo {
                            id: d.id.to_string(),
                            name: d.display_name(),
                            connected: d.volatile.connected,
                            is_server: false,
                            scheduled_for_deletion: d.is_scheduled_for_deletion(),
                        })
                        .collect(),
                ),
                Err(e) => error_response(e),
            }
        }

        Request::GetFolders => {
            let handle = server
                .syncthing()
                .call(|h| Box::pin(async move { Ok::<_, lance_core::SyncthingError>(h.get_folders()) }));
            match handle.wait().await {
                Ok(folders) => Response::Folders(
                    folders
                        .into_iter()
                        .map(|f| FolderInfo {
                            id: f.id.to_string(),
                            label: f.label.clone(),
                            devices: f.devices.iter().map(|d| d.to_string()).collect(),
                            synced: f.is_synced(),
                        })
                        .collect(),
                ),
                Err(e) => error_response(e),
            }
        }

        Request::GetProjects => {
            Response::Projects(server.project_names().into_iter().map(|p| p.to_string()).collect())
        }

        Request::AddProject { name, local_path } => {
            match server.add_project(ProjectName::new(name), std::path::PathBuf::from(local_path)).await {
                Ok(()) => Response::Ok,
                Err(e) => Response::Error { message: e.to_string() },
            }
        }

        Request::AddDevice { device_id, name } => {
            let id = DeviceId::new(device_id);
            let handle = server
                .syncthing()
                .call(move |h| Box::pin(async move { h.add_device(id, name).await }));
            ok_or_error(handle.wait().await)
        }

        Request::RemoveDevice { device_id } => {
            let id = DeviceId::new(device_id);
            let handle = server
                .syncthing()
                .call(move |h| Box::pin(async move { h.remove_device(&id).await }));
            ok_or_error(handle.wait().await)
        }

        Request::AddFolder { id, label, local_path, devices } => {
            let folder_id = id.map(FolderId::new);
            let local_path = local_path.map(std::path::PathBuf::from);
            let devices: BTreeSet<DeviceId> = devices.into_iter().map(DeviceId::new).collect();
            let handle = server.syncthing().call(move |h| {
                Box::pin(async move {
                    h.add_folder(folder_id, label, local_path, devices, serde_json::Value::Null).await
                })
            });
            match handle.wait().await {
                Ok(folder_id) => Response::FolderCreated { folder_id: folder_id.to_string() },
                Err(e) => error_response(e),
            }
        }

        Request::RemoveFolder { folder_id } => {
            let id = FolderId::new(folder_id);
            let handle = server.syncthing().call(move |h| Box::pin(async move { h.remove_folder(&id).await }));
            ok_or_error(handle.wait().await)
        }

        Request::SetFolderDevices { folder_id, devices } => {
            let id = FolderId::new(folder_id);
            let devices: BTreeSet<DeviceId> = devices.into_iter().map(DeviceId::new).collect();
            let handle = server
                .syncthing()
                .call(move |h| Box::pin(async move { h.set_folder_devices(&id, devices).await }));
            ok_or_error(handle.wait().await)
        }

        Request::Shutdown => {
            shutdown.notify_one();
            Response::ShuttingDown
        }
    }
}

fn ok_or_error(result: Result<(), lance_core::SyncthingError>) -> Response {
    match result {
        Ok(()) => Response::Ok,
        Err(e) => error_response(e),
    }
}

fn error_response(e: lance_core::SyncthingError) -> Response {
    Response::Error { message: e.to_string() }
}
