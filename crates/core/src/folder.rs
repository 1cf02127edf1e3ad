// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Folder model (spec.md §3, `original_source/lance/syncthinghandler.py::Folder`).

use std::collections::BTreeSet;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ids::{DeviceId, FolderId};

/// Live, non-persisted sync progress for a folder.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FolderVolatileData {
    #[serde(default)]
    pub global_bytes: u64,
    #[serde(default)]
    pub in_sync_bytes: u64,
    #[serde(default)]
    pub connected: bool,
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
    #[serde(default)]
    pub version: u64,
}

impl FolderVolatileData {
    /// A folder is synced once the sync daemon has nothing left to pull.
    pub fn is_synced(&self) -> bool {
        self.need_total_items == 0
    }
}

/// A synchronized folder (spec.md §3). `local_path` is never serialized to
/// the authoritative configuration document or sent to peers (spec.md §3
/// invariants): it is node-local.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Folder {
    pub id: FolderId,
    pub label: String,
    #[serde(skip)]
    pub local_path: Option<PathBuf>,
    pub devices: BTreeSet<DeviceId>,
    #[serde(default)]
    pub metadata: Value,
    #[serde(skip)]
    pub volatile: FolderVolatileData,
}

/// Well-known metadata key marking a folder as a shot-part (spec.md §3).
pub const SHOT_PART_METADATA_KEY: &str = "__ProjectManager_data__";

/// Metadata type tag for the server-configuration folder (spec.md §3).
pub const SERVER_CONFIGURATION_TYPE: &str = "server.configuration";

/// Metadata type tag for a shot-part folder.
pub const SHOT_PART_TYPE: &str = "shotpart";

impl Folder {
    pub fn new(
        id: FolderId,
        label: impl Into<String>,
        local_path: Option<PathBuf>,
        devices: impl IntoIterator<Item = DeviceId>,
        metadata: Value,
    ) -> Self {
        Self {
            id,
            label: label.into(),
            local_path,
            devices: devices.into_iter().collect(),
            metadata,
            volatile: FolderVolatileData::default(),
        }
    }

    pub fn is_synced(&self) -> bool {
        self.volatile.is_synced()
    }

    pub fn add_device(&mut self, device: DeviceId) {
        self.devices.insert(device);
    }

    pub fn remove_device(&mut self, device: &DeviceId) {
        self.devices.remove(device);
    }

    pub fn replace_with(&mut self, other: &Folder) {
        let volatile = std::mem::take(&mut self.volatile);
        self.id = other.id.clone();
        self.label = other.label.clone();
        self.local_path = other.local_path.clone();
        self.devices = other.devices.clone();
        self.metadata = other.metadata.clone();
        self.volatile = volatile;
    }

    /// Hash over non-volatile configuration, matching
    /// `Folder.configuration_hash()` in the original: id, label, xor of
    /// per-device hashes, and the metadata JSON.
    pub fn configuration_hash(&self) -> u64 {
        use std::hash::{Hash, Hasher};
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        self.id.as_str().hash(&mut hasher);
        "::".hash(&mut hasher);
        self.label.hash(&mut hasher);
        let mut devhash: u64 = 0;
        for dev in &self.devices {
            let mut h = std::collections::hash_map::DefaultHasher::new();
            dev.as_str().hash(&mut h);
            devhash ^= h.finish();
        }
        devhash.hash(&mut hasher);
        self.metadata.to_string().hash(&mut hasher);
        hasher.finish()
    }

    /// Parsed `(project, shot_id, shot_part_id)` if this folder's metadata
    /// marks it as a shot-part (spec.md §3).
    pub fn shot_part_identity(&self) -> Option<ShotPartIdentity> {
        let data = self.metadata.get(SHOT_PART_METADATA_KEY)?;
        if data.get("type")?.as_str()? != SHOT_PART_TYPE {
            return None;
        }
        Some(ShotPartIdentity {
            project: data.get("project")?.as_str()?.to_string(),
            shot_id: data.get("shotid")?.as_str()?.to_string(),
            shot_part_id: data.get("shotpartid")?.as_str()?.to_string(),
        })
    }

    /// True if this folder's metadata marks it as a project's
    /// `server.configuration` folder.
    pub fn is_server_configuration(&self) -> bool {
        self.metadata
            .get("type")
            .and_then(Value::as_str)
            == Some(SERVER_CONFIGURATION_TYPE)
    }
}

/// `(project, shotid, shotpartid)` extracted from a shot-part folder's metadata.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ShotPartIdentity {
    pub project: String,
    pub shot_id: String,
    pub shot_part_id: String,
}

#[cfg(test)]
#[path = "folder_tests.rs"]
mod tests;
