// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `<data_root>/bootstrap.json`: the one document that exists before the
//! sync daemon has ever been configured. It records this host's own device
//! identity and the local REST endpoint the handler will poll, so restarts
//! don't need to re-probe the sync daemon's identity.

use std::path::{Path, PathBuf};

use lance_core::DeviceId;
use serde::{Deserialize, Serialize};

use crate::fs_atomic::{read_to_string_opt, write_atomic};
use crate::StorageError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BootstrapConfig {
    pub device_id: DeviceId,
    pub rest_address: String,
    pub api_key: String,
    pub gui_user: String,
    pub gui_password_hash: String,
}

impl BootstrapConfig {
    pub fn path(data_root: &Path) -> PathBuf {
        data_root.join("bootstrap.json")
    }

    pub fn load(data_root: &Path) -> Result<Option<Self>, StorageError> {
        let Some(raw) = read_to_string_opt(&Self::path(data_root))? else {
            return Ok(None);
        };
        Ok(Some(serde_json::from_str(&raw)?))
    }

    pub fn save(&self, data_root: &Path) -> Result<(), StorageError> {
        let json = serde_json::to_vec_pretty(self)?;
        write_atomic(&Self::path(data_root), &json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample() -> BootstrapConfig {
        BootstrapConfig {
            device_id: DeviceId::new("ABCD-1234"),
            rest_address: "127.0.0.1:8384".into(),
            api_key: "deadbeef".into(),
            gui_user: "lance".into(),
            gui_password_hash: "$2b$hash".into(),
        }
    }

    #[test]
    fn load_missing_returns_none() {
        let dir = tempdir().unwrap();
        assert!(BootstrapConfig::load(dir.path()).unwrap().is_none());
    }

    #[test]
    fn save_then_load_roundtrips() {
        let dir = tempdir().unwrap();
        let cfg = sample();
        cfg.save(dir.path()).unwrap();
        let loaded = BootstrapConfig::load(dir.path()).unwrap().unwrap();
        assert_eq!(loaded, cfg);
    }
}
