// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error type for the reconciliation engine itself (as opposed to
//! `lance_core::{SyncthingError, ProjectManagerError}`, which the handlers
//! in `lance-daemon` raise against the outside world).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Syncthing(#[from] lance_core::SyncthingError),

    #[error(transparent)]
    ProjectManager(#[from] lance_core::ProjectManagerError),
}
