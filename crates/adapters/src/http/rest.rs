// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The `SyncthingClient` trait: everything `lance-daemon`'s handler needs
//! from the sync-daemon's REST API (spec.md §6). Kept as a trait so tests
//! run against [`super::fake::FakeSyncthingClient`] instead of a real
//! `syncthing` binary (spec.md §8's testable-properties section).

use async_trait::async_trait;
use lance_core::SyncthingError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::native_config::NativeConfig;

/// One event off `GET /rest/events?since=...`. `id` lets the poller resume
/// from where it left off across restarts without replaying history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncthingEvent {
    pub id: u64,
    #[serde(rename = "type")]
    pub event_type: String,
    pub time: String,
    #[serde(default)]
    pub data: Value,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DbStatus {
    #[serde(default)]
    pub global_bytes: u64,
    #[serde(default)]
    pub in_sync_bytes: u64,
    #[serde(default)]
    pub need_bytes: u64,
    #[serde(default)]
    pub need_files: u64,
    #[serde(default)]
    pub need_total_items: u64,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub state_changed: String,
}

#[async_trait]
pub trait SyncthingClient: Send + Sync + 'static {
    /// Long-poll event stream, resuming after `since`.
    async fn events(&self, since: u64) -> Result<Vec<SyncthingEvent>, SyncthingError>;

    async fn get_config(&self) -> Result<NativeConfig, SyncthingError>;

    /// Replace the sync-daemon's native configuration. The sync-daemon
    /// applies most changes live; folder path/type changes require
    /// [`SyncthingClient::restart`].
    async fn set_config(&self, config: &NativeConfig) -> Result<(), SyncthingError>;

    async fn restart(&self) -> Result<(), SyncthingError>;

    async fn db_status(&self, folder_id: &str) -> Result<DbStatus, SyncthingError>;

    async fn scan(&self, folder_id: &str) -> Result<(), SyncthingError>;

    async fn pause_device(&self, device_id: &str) -> Result<(), SyncthingError>;

    async fn resume_device(&self, device_id: &str) -> Result<(), SyncthingError>;

    async fn ping(&self) -> Result<(), SyncthingError>;
}
