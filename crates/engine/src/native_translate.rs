// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Translate between `lance_core`'s domain model and the sync-daemon's own
//! native configuration shape (spec.md §4.3.1 "materialize"). Only folders
//! with a resolved `local_path` are materialized — a folder this host
//! knows about but hasn't chosen to sync locally is omitted from the
//! native config entirely, matching the original's lazy-join behavior.

use lance_adapters::http::{NativeConfig, NativeDevice, NativeFolder, NativeFolderDevice};
use lance_core::{Device, Folder};

pub fn materialize_devices(devices: &[Device]) -> Vec<NativeDevice> {
    devices
        .iter()
        .map(|d| NativeDevice {
            device_id: d.id.as_str().to_string(),
            name: d.display_name(),
            addresses: vec!["dynamic".to_string()],
            paused: false,
        })
        .collect()
}

pub fn materialize_folders(folders: &[Folder]) -> Vec<NativeFolder> {
    folders
        .iter()
        .filter_map(|f| {
            let path = f.local_path.as_ref()?;
            let mut native = NativeFolder::new(
                f.id.as_str().to_string(),
                f.label.clone(),
                path.to_string_lossy().to_string(),
            );
            native.devices = f
                .devices
                .iter()
                .map(|id| NativeFolderDevice {
                    device_id: id.as_str().to_string(),
                })
                .collect();
            Some(native)
        })
        .collect()
}

/// Build the full native config to push via
/// [`lance_adapters::http::SyncthingClient::set_config`], preserving the
/// GUI/options section the caller already read back from the daemon.
pub fn materialize(devices: &[Device], folders: &[Folder], base: &NativeConfig) -> NativeConfig {
    NativeConfig {
        folders: materialize_folders(folders),
        devices: materialize_devices(devices),
        gui: base.gui.clone(),
        options: base.options.clone(),
    }
}
