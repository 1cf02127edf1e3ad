// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Device model (spec.md §3, `original_source/lance/syncthinghandler.py::Device`).

use serde::{Deserialize, Serialize};

use crate::ids::DeviceId;

/// Live, non-persisted state about a device reported by sync-daemon events.
/// Never part of `Device` equality or serialization.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceVolatileData {
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub paused: bool,
    #[serde(default)]
    pub connected: bool,
    #[serde(default)]
    pub client_name: String,
    #[serde(default)]
    pub client_version: String,
}

impl DeviceVolatileData {
    pub fn update(&mut self, other: DeviceVolatileData) {
        *self = other;
    }
}

/// A device known to the sync-daemon handler.
///
/// `id` is immutable and never reused. `added_at` discriminates a
/// re-added device with the same id (spec.md §3) and, per spec.md §9,
/// is part of equality so reload doesn't mistake a stale re-add for an
/// unchanged device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    pub id: DeviceId,
    pub name: Option<String>,
    pub added_at: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delete_after: Option<u64>,
    #[serde(skip)]
    pub volatile: DeviceVolatileData,
}

impl Device {
    pub fn new(id: DeviceId, name: Option<String>, added_at: u64) -> Self {
        Self {
            id,
            name,
            added_at,
            delete_after: None,
            volatile: DeviceVolatileData::default(),
        }
    }

    /// Human-readable label: explicit name, else a truncated id, mirroring
    /// the original's `Device.name()` fallback.
    pub fn display_name(&self) -> String {
        match &self.name {
            Some(n) if !n.is_empty() => n.clone(),
            _ => format!("device {}", &self.id.short(6)),
        }
    }

    pub fn is_scheduled_for_deletion(&self) -> bool {
        self.delete_after.is_some()
    }

    pub fn schedule_for_deletion(&mut self, now: u64) {
        if self.delete_after.is_none() {
            self.delete_after = Some(now);
        }
    }

    pub fn unschedule_for_deletion(&mut self) {
        self.delete_after = None;
    }

    /// Replace this device's persistent fields in place with `other`'s,
    /// preserving volatile data and object identity (spec.md §9 "Cyclic
    /// references" / the original's `Device.replace_with`).
    pub fn replace_with(&mut self, other: &Device) {
        let volatile = std::mem::take(&mut self.volatile);
        self.id = other.id.clone();
        self.name = other.name.clone();
        self.added_at = other.added_at;
        self.delete_after = other.delete_after;
        self.volatile = volatile;
    }

    /// Hash over non-volatile configuration, excluding `added_at`/`delete_after`,
    /// matching `Device.configuration_hash()` in the original.
    pub fn configuration_hash(&self) -> u64 {
        use std::hash::{Hash, Hasher};
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        self.id.as_str().hash(&mut hasher);
        if let Some(name) = &self.name {
            "::".hash(&mut hasher);
            name.hash(&mut hasher);
        }
        hasher.finish()
    }
}

#[cfg(test)]
#[path = "device_tests.rs"]
mod tests;
