// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Environment-variable overrides, read once at startup (`Config::load`).

use std::path::PathBuf;

use crate::error::DaemonError;

/// Root state directory for the daemon's own bookkeeping (socket, lock,
/// log, version file). `LANCE_STATE_DIR` takes priority (used by tests
/// for isolation), then `$XDG_STATE_HOME/lance`, then `~/.local/state/lance`.
pub fn state_dir() -> Result<PathBuf, DaemonError> {
    if let Ok(dir) = std::env::var("LANCE_STATE_DIR") {
        return Ok(PathBuf::from(dir));
    }
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return Ok(PathBuf::from(xdg).join("lance"));
    }
    let home = std::env::var("HOME").map_err(|_| DaemonError::NoStateDir)?;
    Ok(PathBuf::from(home).join(".local/state/lance"))
}

/// Root data directory for sync-daemon documents and its process home
/// (bootstrap cache, `config.cfg` documents, the sync-daemon's own
/// `-home` directory). `LANCE_DATA_DIR` takes priority, then
/// `$XDG_DATA_HOME/lance`, then `~/.local/share/lance`.
pub fn data_dir() -> Result<PathBuf, DaemonError> {
    if let Ok(dir) = std::env::var("LANCE_DATA_DIR") {
        return Ok(PathBuf::from(dir));
    }
    if let Ok(xdg) = std::env::var("XDG_DATA_HOME") {
        return Ok(PathBuf::from(xdg).join("lance"));
    }
    let home = std::env::var("HOME").map_err(|_| DaemonError::NoStateDir)?;
    Ok(PathBuf::from(home).join(".local/share/lance"))
}

/// Path to the sync-daemon binary. Defaults to resolving `syncthing` from
/// `PATH`; `LANCE_SYNCTHING_BINARY` overrides it (e.g. for test fixtures
/// pointing at a fake binary).
pub fn syncthing_binary() -> PathBuf {
    std::env::var("LANCE_SYNCTHING_BINARY")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("syncthing"))
}

/// Long-poll timeout (seconds) passed to `/rest/events?since=N&timeout=T`.
/// `LANCE_EVENTS_TIMEOUT_SECS` overrides the default for tests that want
/// fast polling against a fake daemon.
pub fn events_timeout_secs() -> u64 {
    std::env::var("LANCE_EVENTS_TIMEOUT_SECS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(60)
}
