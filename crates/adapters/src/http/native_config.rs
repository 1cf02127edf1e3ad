// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! DTOs for the sync-daemon's own native configuration
//! (`GET`/`POST /rest/system/config`, spec.md §6), distinct from Lance's
//! own `config.cfg` roster documents in `lance-storage`. This is the shape
//! the sync-daemon's REST API actually speaks; `lance-engine` translates
//! between it and `lance_core::{Device, Folder}`.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NativeConfig {
    #[serde(default)]
    pub folders: Vec<NativeFolder>,
    #[serde(default)]
    pub devices: Vec<NativeDevice>,
    #[serde(default)]
    pub gui: NativeGui,
    #[serde(default)]
    pub options: NativeOptions,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NativeFolder {
    pub id: String,
    pub label: String,
    pub path: String,
    #[serde(default)]
    pub devices: Vec<NativeFolderDevice>,
    #[serde(rename = "type", default = "default_folder_type")]
    pub folder_type: String,
    #[serde(rename = "rescanIntervalS", default = "default_rescan_interval")]
    pub rescan_interval_s: u64,
    #[serde(rename = "fsWatcherEnabled", default = "default_true")]
    pub fs_watcher_enabled: bool,
    #[serde(rename = "ignorePerms", default)]
    pub ignore_perms: bool,
    #[serde(rename = "autoNormalize", default = "default_true")]
    pub auto_normalize: bool,
    /// 0 disables conflict copies entirely (spec.md §6: Lance resolves
    /// conflicts at the project layer, not via `.sync-conflict` files).
    #[serde(rename = "maxConflicts", default)]
    pub max_conflicts: i64,
}

fn default_folder_type() -> String {
    "sendreceive".to_string()
}
fn default_rescan_interval() -> u64 {
    3600
}
fn default_true() -> bool {
    true
}

impl NativeFolder {
    pub fn new(id: impl Into<String>, label: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            path: path.into(),
            devices: Vec::new(),
            folder_type: default_folder_type(),
            rescan_interval_s: default_rescan_interval(),
            fs_watcher_enabled: true,
            ignore_perms: false,
            auto_normalize: true,
            max_conflicts: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NativeFolderDevice {
    #[serde(rename = "deviceID")]
    pub device_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NativeDevice {
    #[serde(rename = "deviceID")]
    pub device_id: String,
    pub name: String,
    #[serde(default)]
    pub addresses: Vec<String>,
    #[serde(default)]
    pub paused: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NativeGui {
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub address: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NativeOptions {
    #[serde(rename = "urAccepted", default)]
    pub ur_accepted: i64,
    #[serde(rename = "globalAnnounceEnabled", default)]
    pub global_announce_enabled: bool,
    #[serde(rename = "localAnnounceEnabled", default = "default_true")]
    pub local_announce_enabled: bool,
}
