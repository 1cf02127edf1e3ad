// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle: single-instance lock, sync-daemon process bootstrap
//! (spec.md §4.3.1), and `Server` construction. Mirrors `oj-daemon`'s
//! `lifecycle::startup`/`cleanup_on_failure` split, with the WAL/snapshot
//! recovery sequence replaced by probing (or generating) the sync-daemon's
//! own identity.

use std::fs::File;
use std::sync::Arc;
use std::time::Duration;

use fs2::FileExt;
use lance_adapters::http::{ReqwestSyncthingClient, SyncthingClient};
use lance_adapters::syncthing_process;
use lance_core::SystemClock;
use lance_storage::BootstrapConfig;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::DaemonError;
use crate::listener::Listener;
use crate::server::Server;
use crate::syncthing;

/// Local GUI/REST address the sync-daemon child listens on. Fixed rather
/// than configurable: each daemon owns exactly one sync-daemon home
/// directory, so there's no port contention to resolve.
const REST_ADDRESS: &str = "http://127.0.0.1:8384";
const REST_LISTEN_ADDR: &str = "127.0.0.1:8384";

/// How long to wait for the freshly spawned sync-daemon to answer its
/// REST API before giving up (spec.md §7: transport retry budget).
const READY_RETRIES: u32 = 32;
const READY_RETRY_INTERVAL: Duration = Duration::from_secs(1);

/// Request queue depth for the sync-daemon handler's worker.
const SYNCTHING_QUEUE_CAPACITY: usize = 64;

pub type DaemonServer = Server<ReqwestSyncthingClient, SystemClock>;

/// Daemon state during operation, returned by [`startup`].
pub struct DaemonState {
    pub config: Config,
    #[allow(dead_code)]
    lock_file: File,
    pub server: Arc<DaemonServer>,
    pub syncthing_process: syncthing_process::SyncthingProcess,
    pub dispatcher: JoinHandle<()>,
}

pub struct StartupResult {
    pub daemon: DaemonState,
    pub listener: Listener<ReqwestSyncthingClient, SystemClock>,
    pub shutdown: Arc<Notify>,
}

impl DaemonState {
    /// Release the lock/socket files and ask the sync-daemon child to
    /// exit. Sessions have nothing analogous to preserve here — the
    /// sync-daemon simply restarts clean on next startup.
    pub async fn shutdown(self) {
        info!("shutting down daemon");

        if self.config.socket_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.config.socket_path) {
                warn!(error = %e, "failed to remove socket file");
            }
        }
        if self.config.lock_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.config.lock_path) {
                warn!(error = %e, "failed to remove lock file");
            }
        }
        if self.config.version_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.config.version_path) {
                warn!(error = %e, "failed to remove version file");
            }
        }

        if let Err(e) = self.syncthing_process.shutdown().await {
            warn!(error = %e, "failed to shut down sync-daemon process cleanly");
        }

        info!("daemon shutdown complete");
    }
}

/// Start the daemon: acquire the single-instance lock, bring up the
/// sync-daemon child, and wire the [`Server`]. Cleans up on any failure
/// except a lock conflict (those files belong to the already-running
/// daemon).
pub async fn startup(config: &Config) -> Result<StartupResult, DaemonError> {
    match startup_inner(config).await {
        Ok(result) => Ok(result),
        Err(e) => {
            if !matches!(e, DaemonError::LockFailed(_)) {
                cleanup_on_failure(config);
            }
            Err(e)
        }
    }
}

async fn startup_inner(config: &Config) -> Result<StartupResult, DaemonError> {
    std::fs::create_dir_all(&config.state_dir)?;
    std::fs::create_dir_all(&config.data_dir)?;
    std::fs::create_dir_all(&config.syncthing_home)?;

    let lock_file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(&config.lock_path)?;
    lock_file.try_lock_exclusive().map_err(DaemonError::LockFailed)?;

    use std::io::Write;
    let mut lock_file = lock_file;
    lock_file.set_len(0)?;
    writeln!(lock_file, "{}", std::process::id())?;
    let lock_file = lock_file;

    std::fs::write(&config.version_path, env!("CARGO_PKG_VERSION"))?;

    let (bootstrap, is_fresh) = load_or_create_bootstrap(config).await?;

    let syncthing_process =
        syncthing_process::SyncthingProcess::spawn(&config.syncthing_binary, &config.syncthing_home)?;
    wait_for_ready(&bootstrap).await?;

    let client = Arc::new(ReqwestSyncthingClient::new(REST_ADDRESS, bootstrap.api_key.clone()));

    let (server, dispatcher) = Server::spawn(
        Arc::clone(&client),
        SystemClock,
        config.data_dir.clone(),
        bootstrap.device_id.clone(),
        SYNCTHING_QUEUE_CAPACITY,
    );
    let server = Arc::new(server);

    if is_fresh {
        let handle = server
            .syncthing()
            .call(|h| Box::pin(async move { h.bootstrap_as_server(now()) }));
        handle.wait().await?;
        info!("bootstrapped as a fresh server");
    } else {
        let handle = server
            .syncthing()
            .call(|h| Box::pin(async move { h.reload_configuration(true).await }));
        handle.wait().await?;
    }

    let shutdown = Arc::new(Notify::new());
    let listener = Listener::bind(&config.socket_path, Arc::clone(&server), Arc::clone(&shutdown))
        .map_err(|e| DaemonError::BindFailed(config.socket_path.clone(), e))?;

    info!(device_id = %bootstrap.device_id, "daemon started");

    Ok(StartupResult {
        daemon: DaemonState {
            config: config.clone(),
            lock_file,
            server,
            syncthing_process,
            dispatcher,
        },
        listener,
        shutdown,
    })
}

fn now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Probe the sync-daemon's identity under `config.syncthing_home`,
/// generating fresh keys if none exist yet (spec.md §4.3.1), and persist
/// (or load) the local bootstrap cache.
async fn load_or_create_bootstrap(config: &Config) -> Result<(BootstrapConfig, bool), DaemonError> {
    if let Some(existing) = BootstrapConfig::load(&config.data_dir)? {
        return Ok((existing, false));
    }

    let device_id = match syncthing_process::device_id(&config.syncthing_binary, &config.syncthing_home).await {
        Ok(id) => id,
        Err(_) => {
            syncthing_process::generate_keys(&config.syncthing_binary, &config.syncthing_home).await?;
            syncthing_process::device_id(&config.syncthing_binary, &config.syncthing_home).await?
        }
    };

    let api_key = syncthing::generate_api_key(&device_id);
    let bootstrap = BootstrapConfig {
        device_id,
        rest_address: REST_LISTEN_ADDR.to_string(),
        api_key,
        gui_user: "lance".to_string(),
        gui_password_hash: String::new(),
    };
    bootstrap.save(&config.data_dir)?;
    Ok((bootstrap, true))
}

/// Poll the sync-daemon's REST API until it answers or the retry budget
/// (spec.md §7: 32 attempts, 1s backoff) is exhausted.
async fn wait_for_ready(bootstrap: &BootstrapConfig) -> Result<(), DaemonError> {
    let client = ReqwestSyncthingClient::new(REST_ADDRESS, bootstrap.api_key.clone());
    for attempt in 0..READY_RETRIES {
        match client.ping().await {
            Ok(()) => return Ok(()),
            Err(e) if attempt + 1 == READY_RETRIES => return Err(DaemonError::Syncthing(e)),
            Err(_) => tokio::time::sleep(READY_RETRY_INTERVAL).await,
        }
    }
    unreachable!("loop always returns before exhausting READY_RETRIES")
}

fn cleanup_on_failure(config: &Config) {
    if config.socket_path.exists() {
        let _ = std::fs::remove_file(&config.socket_path);
    }
    if config.version_path.exists() {
        let _ = std::fs::remove_file(&config.version_path);
    }
    if config.lock_path.exists() {
        let _ = std::fs::remove_file(&config.lock_path);
    }
}
