// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon configuration (spec.md §6 "on-disk layout"), following
//! `oj-daemon::lifecycle::Config`'s pattern of fixed paths derived from a
//! single state/data root resolved from the environment.

use std::path::PathBuf;

use crate::env;
use crate::error::DaemonError;

#[derive(Debug, Clone)]
pub struct Config {
    /// Root for the daemon's own bookkeeping: socket, lock, log, version.
    pub state_dir: PathBuf,
    /// Root for sync-daemon documents and its process home directory.
    pub data_dir: PathBuf,
    pub socket_path: PathBuf,
    pub lock_path: PathBuf,
    pub version_path: PathBuf,
    pub log_path: PathBuf,
    /// `-home` directory handed to the sync-daemon child process.
    pub syncthing_home: PathBuf,
    /// Sync-daemon binary to spawn (`LANCE_SYNCTHING_BINARY` override).
    pub syncthing_binary: PathBuf,
    /// Long-poll timeout for `/rest/events`.
    pub events_timeout_secs: u64,
}

impl Config {
    /// Load configuration for the user-level daemon. Fixed paths under
    /// `~/.local/state/lance` and `~/.local/share/lance` (or their
    /// `$XDG_*` overrides) — one daemon serves one sync-daemon instance
    /// per user.
    pub fn load() -> Result<Self, DaemonError> {
        let state_dir = env::state_dir()?;
        let data_dir = env::data_dir()?;

        Ok(Self {
            socket_path: state_dir.join("lanced.sock"),
            lock_path: state_dir.join("lanced.pid"),
            version_path: state_dir.join("lanced.version"),
            log_path: state_dir.join("lanced.log"),
            syncthing_home: data_dir.join("syncthing-home"),
            syncthing_binary: env::syncthing_binary(),
            events_timeout_secs: env::events_timeout_secs(),
            state_dir,
            data_dir,
        })
    }
}
