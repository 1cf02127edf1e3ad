// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Top-level daemon error (spec.md §7): wraps the engine/core error
//! vocabulary plus the daemon's own lifecycle/protocol failures.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DaemonError {
    #[error(transparent)]
    Syncthing(#[from] lance_core::SyncthingError),

    #[error(transparent)]
    ProjectManager(#[from] lance_core::ProjectManagerError),

    #[error(transparent)]
    Storage(#[from] lance_storage::StorageError),

    #[error(transparent)]
    SyncthingProcess(#[from] lance_adapters::SyncthingProcessError),

    #[error("could not determine state directory")]
    NoStateDir,

    #[error("failed to acquire lock: daemon already running?")]
    LockFailed(#[source] std::io::Error),

    #[error("failed to bind socket at {0}: {1}")]
    BindFailed(PathBuf, std::io::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("unknown project: {0}")]
    UnknownProject(String),
}
