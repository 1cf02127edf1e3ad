// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The admin protocol: `lance-cli`'s wire contract with `lanced` over a
//! local Unix socket. Length-prefixed JSON, same shape as the teacher's
//! IPC protocol, scaled down to Lance's own operator surface (spec.md
//! §4.5 footnote: the admin protocol isn't a GUI, just enough surface for
//! `lance-cli` to exist).

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;

/// Protocol errors.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("message too large: {size} bytes (max {max})")]
    MessageTooLarge { size: usize, max: usize },

    #[error("connection closed")]
    ConnectionClosed,

    #[error("request timed out")]
    Timeout,
}

pub const MAX_MESSAGE_SIZE: usize = 16 * 1024 * 1024;
pub const DEFAULT_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(5);
pub const PROTOCOL_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub id: String,
    pub name: String,
    pub connected: bool,
    pub is_server: bool,
    pub scheduled_for_deletion: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FolderInfo {
    pub id: String,
    pub label: String,
    pub devices: Vec<String>,
    pub synced: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusInfo {
    pub my_id: String,
    pub is_server: bool,
    pub config_synced: String,
    pub device_count: usize,
    pub folder_count: usize,
    pub project_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op")]
pub enum Request {
    Ping,
    Hello { version: String },
    Status,
    GetDevices,
    GetFolders,
    GetProjects,
    AddProject { name: String, local_path: String },
    AddDevice { device_id: String, name: Option<String> },
    RemoveDevice { device_id: String },
    AddFolder {
        id: Option<String>,
        label: String,
        local_path: Option<String>,
        devices: Vec<String>,
    },
    RemoveFolder { folder_id: String },
    SetFolderDevices { folder_id: String, devices: Vec<String> },
    Shutdown,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "result")]
pub enum Response {
    Pong,
    Hello { version: String },
    Ok,
    Error { message: String },
    Status(StatusInfo),
    Devices(Vec<DeviceInfo>),
    Folders(Vec<FolderInfo>),
    Projects(Vec<String>),
    FolderCreated { folder_id: String },
    ShuttingDown,
}

pub fn encode<T: Serialize>(msg: &T) -> Result<Vec<u8>, ProtocolError> {
    let json = serde_json::to_vec(msg)?;
    if json.len() > MAX_MESSAGE_SIZE {
        return Err(ProtocolError::MessageTooLarge {
            size: json.len(),
            max: MAX_MESSAGE_SIZE,
        });
    }
    Ok(json)
}

pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, ProtocolError> {
    Ok(serde_json::from_slice(bytes)?)
}

pub async fn read_message<R: tokio::io::AsyncReadExt + Unpin>(
    reader: &mut R,
) -> Result<Vec<u8>, ProtocolError> {
    let mut len_buf = [0u8; 4];
    match reader.read_exact(&mut len_buf).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
            return Err(ProtocolError::ConnectionClosed);
        }
        Err(e) => return Err(ProtocolError::Io(e)),
    }
    let len = u32::from_be_bytes(len_buf) as usize;
    if len > MAX_MESSAGE_SIZE {
        return Err(ProtocolError::MessageTooLarge { size: len, max: MAX_MESSAGE_SIZE });
    }
    let mut buf = vec![0u8; len];
    reader.read_exact(&mut buf).await?;
    Ok(buf)
}

pub async fn write_message<W: tokio::io::AsyncWriteExt + Unpin>(
    writer: &mut W,
    data: &[u8],
) -> Result<(), ProtocolError> {
    let len = data.len();
    if len > MAX_MESSAGE_SIZE {
        return Err(ProtocolError::MessageTooLarge { size: len, max: MAX_MESSAGE_SIZE });
    }
    writer.write_all(&(len as u32).to_be_bytes()).await?;
    writer.write_all(data).await?;
    writer.flush().await?;
    Ok(())
}

pub async fn read_request<R: tokio::io::AsyncReadExt + Unpin>(
    reader: &mut R,
    timeout: std::time::Duration,
) -> Result<Request, ProtocolError> {
    let bytes = tokio::time::timeout(timeout, read_message(reader))
        .await
        .map_err(|_| ProtocolError::Timeout)??;
    decode(&bytes)
}

pub async fn write_response<W: tokio::io::AsyncWriteExt + Unpin>(
    writer: &mut W,
    response: &Response,
    timeout: std::time::Duration,
) -> Result<(), ProtocolError> {
    let data = encode(response)?;
    tokio::time::timeout(timeout, write_message(writer, &data))
        .await
        .map_err(|_| ProtocolError::Timeout)?
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_decode_roundtrip() {
        let req = Request::AddDevice {
            device_id: "d1".into(),
            name: Some("laptop".into()),
        };
        let encoded = encode(&req).unwrap();
        let decoded: Request = decode(&encoded).unwrap();
        assert!(matches!(decoded, Request::AddDevice { device_id, .. } if device_id == "d1"));
    }

    #[tokio::test]
    async fn read_request_roundtrips_over_a_duplex_stream() {
        let (mut client, mut server) = tokio::io::duplex(4096);
        let req = Request::GetDevices;
        let bytes = encode(&req).unwrap();
        write_message(&mut client, &bytes).await.unwrap();

        let read_back = read_request(&mut server, DEFAULT_TIMEOUT).await.unwrap();
        assert!(matches!(read_back, Request::GetDevices));
    }

    #[tokio::test]
    async fn oversized_message_is_rejected() {
        let huge = vec![0u8; MAX_MESSAGE_SIZE + 1];
        let (mut client, _server) = tokio::io::duplex(64);
        let err = write_message(&mut client, &huge).await.unwrap_err();
        assert!(matches!(err, ProtocolError::MessageTooLarge { .. }));
    }
}
