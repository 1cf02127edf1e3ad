// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Pure reconciliation logic: device/folder diffing, configuration-hash
//! computation, sync-daemon native-config materialization, the
//! device-deletion retention rule, and project/shot classification
//! (spec.md §4.3, §4.4). Nothing here touches the filesystem or the
//! network — that's `lance-daemon`'s job, driving these functions off real
//! events and a real [`lance_adapters::http::SyncthingClient`].

mod config_hash;
mod device_retention;
mod diff;
mod error;
mod native_translate;
mod project;

pub use config_hash::{aggregate_hash, users_hash};
pub use device_retention::{ready_to_remove, MAX_RETENTION_SECS};
pub use diff::{diff_devices, diff_folders, DeviceDiff, FolderDiff};
pub use error::EngineError;
pub use native_translate::{materialize, materialize_devices, materialize_folders};
pub use project::{classify_folders, desired_folder_devices, ProjectView};
