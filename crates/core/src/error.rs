// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared error vocabulary for the sync-daemon handler and project manager
//! (spec.md §7). Kept in `lance-core` because both `lance-engine` (pure
//! reconciliation) and `lance-daemon` (the stateful handlers) need to name
//! and match on these, and the worker primitive's retry policy dispatches
//! on them by type.

use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum SyncthingError {
    /// Daemon absent or not yet accepting HTTP (spec.md §7). Retried by
    /// transport-level backoff before being surfaced.
    #[error("sync daemon not ready: {0}")]
    NotReady(String),

    /// Identity probe failed; the caller should run key generation.
    #[error("no initial configuration: {0}")]
    NoInitialConfiguration(String),

    /// Bootstrap JSON missing required fields.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A server-mutating operation was attempted while
    /// `config_synced != Synced` (spec.md §4.3.6, §4.3.8).
    #[error("configuration not in sync")]
    ConfigNotInSync,

    /// Caller is not the server for this configuration.
    #[error("not a server: {0}")]
    NotServer(String),

    /// Referenced device/folder is unknown to this handler.
    #[error("unknown entity: {0}")]
    UnknownEntity(String),

    /// Transport failure talking to the sync-daemon HTTP API.
    #[error("transport error: {0}")]
    Transport(String),
}

impl SyncthingError {
    /// Whether a caller should retry this error (used by [`crate::worker`]-style
    /// retry policies): only transient conditions are retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SyncthingError::ConfigNotInSync | SyncthingError::NotReady(_)
        )
    }
}

#[derive(Debug, Error, Clone)]
pub enum ProjectManagerError {
    /// The project manager observed a contradictory snapshot of folders
    /// (e.g. a shot-part folder referencing an unknown project). Retried
    /// on the next event per spec.md §7.
    #[error("configuration inconsistent: {0}")]
    Inconsistent(String),

    #[error(transparent)]
    Syncthing(#[from] SyncthingError),
}

impl ProjectManagerError {
    pub fn is_retryable(&self) -> bool {
        match self {
            ProjectManagerError::Inconsistent(_) => true,
            ProjectManagerError::Syncthing(e) => e.is_retryable(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_not_in_sync_is_retryable() {
        assert!(SyncthingError::ConfigNotInSync.is_retryable());
    }

    #[test]
    fn not_server_is_not_retryable() {
        assert!(!SyncthingError::NotServer("x".into()).is_retryable());
    }

    #[test]
    fn project_manager_error_delegates_retry_to_inner() {
        let err = ProjectManagerError::Syncthing(SyncthingError::ConfigNotInSync);
        assert!(err.is_retryable());
    }
}
