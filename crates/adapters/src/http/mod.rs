// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Sync-daemon REST API client (spec.md §6).

mod native_config;
mod reqwest_client;
mod rest;

pub use native_config::{NativeConfig, NativeDevice, NativeFolder, NativeFolderDevice, NativeGui, NativeOptions};
pub use reqwest_client::ReqwestSyncthingClient;
pub use rest::{DbStatus, SyncthingClient, SyncthingEvent};

#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeSyncthingClient;
