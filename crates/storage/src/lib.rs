// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! On-disk persistence for Lance: the bootstrap cache, the `config.cfg`
//! roster documents, and the config-sync hash file. Every write goes
//! through [`fs_atomic::write_atomic`] so a crash mid-write can't corrupt a
//! document a peer is about to read.

mod bootstrap;
mod documents;
mod error;
mod fs_atomic;
mod hash_file;

pub use bootstrap::BootstrapConfig;
pub use documents::{DocumentKind, ProjectConfigDocument, ServerConfigDocument};
pub use error::StorageError;
pub use fs_atomic::write_atomic;
pub use hash_file::{load as load_config_sync_hash, save as save_config_sync_hash};
