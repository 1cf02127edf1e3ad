// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The sync-daemon handler (spec.md §4.3): the single owner of this host's
//! view of the device/folder roster, reconciled against the authoritative
//! `config.cfg` document living in the `server.configuration` folder and
//! pushed down to the sync daemon's own native configuration
//! (`lance_engine::materialize`). Runs as the [`crate::worker::Load`] of a
//! dedicated worker so every mutation is serialized through one queue.

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use lance_adapters::http::{NativeConfig, SyncthingClient, SyncthingEvent};
use lance_adapters::SyncthingPauseLock;
use lance_core::{Clock, Device, DeviceId, Event, Folder, FolderId, SyncthingError, User};
use rand::Rng;
use sha1::{Digest, Sha1};
use tracing::{info, warn};

use crate::event_bus::EventBus;
use crate::worker::{BoxFuture, Load, LoadControl};

const EVENT_SOURCE: &str = "syncthing-handler";

/// Where this document came from, for [`lance_engine::diff_devices`] /
/// [`lance_engine::diff_folders`] event sourcing.
fn source() -> String {
    EVENT_SOURCE.to_string()
}

fn sha1_hex(input: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
}

fn random_ascii_letters(n: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..n)
        .map(|_| rng.gen_range(b'a'..=b'z') as char)
        .collect()
}

/// `api_key = sha1(my_id + "-apikey-" + 16 random ascii letters)`
/// (spec.md §4.3.1, pinned to `original_source/lance/syncthinghandler.py`).
pub fn generate_api_key(my_id: &DeviceId) -> String {
    sha1_hex(&format!("{}-apikey-{}", my_id.as_str(), random_ascii_letters(16)))
}

/// 24 random ascii letters, namespacing every folder id this server hands
/// out (spec.md §6).
pub fn generate_server_secret() -> String {
    random_ascii_letters(24)
}

/// `server_configuration-<sha1(server_secret)>` (spec.md §6).
pub fn server_configuration_folder_id(server_secret: &str) -> FolderId {
    FolderId::new(format!("server_configuration-{}", sha1_hex(server_secret)))
}

/// `control-<sha1(server_secret:device_id)>` (spec.md §6).
pub fn control_folder_id(server_secret: &str, device_id: &DeviceId) -> FolderId {
    FolderId::new(format!(
        "control-{}",
        sha1_hex(&format!("{}:{}", server_secret, device_id.as_str()))
    ))
}

/// `folder-<16 random lowercase letters>`, used when a shared folder is
/// created without an externally-supplied id (spec.md §6).
pub fn random_folder_id() -> FolderId {
    FolderId::new(format!("folder-{}", random_ascii_letters(16)))
}

/// The config-sync state machine (spec.md §4.3.8). Every mutator below
/// refuses with [`SyncthingError::ConfigNotInSync`] unless `Synced`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSynced {
    /// This host has never successfully reconciled against a server.
    UnsyncedInitial,
    /// A reconciliation is in flight; roster queries are fine, mutation isn't.
    Changing,
    /// The in-memory roster matches the on-disk authoritative document.
    Synced,
}

/// This host's in-memory view of the device/folder roster (spec.md §3,
/// §4.3). Plain owned maps rather than the original's `Arc<RwLock<Device>>`
/// handles: `Device`/`Folder` already carry a `replace_with` that preserves
/// volatile data across reload, which gives the same observable identity
/// without needing shared mutable cells (documented as a simplification).
#[derive(Debug, Clone, Default)]
struct Model {
    servers: BTreeSet<DeviceId>,
    devices: BTreeMap<DeviceId, Device>,
    folders: BTreeMap<FolderId, Folder>,
    ignored_devices: BTreeSet<DeviceId>,
}

/// The sync-daemon handler (spec.md §4.3). One instance per [`crate::Server`],
/// driven as a [`Load`] by its own [`crate::worker::Worker`].
pub struct SyncthingHandler<C: SyncthingClient, CK: Clock = lance_core::SystemClock> {
    client: Arc<C>,
    clock: CK,
    bus: EventBus,
    pause_lock: SyncthingPauseLock<C>,
    data_root: PathBuf,
    my_id: DeviceId,
    server_secret: Option<String>,
    model: Model,
    config_synced: ConfigSynced,
    last_event_id: u64,
    /// Post-removal aggregate hash expected from each scheduled-for-deletion
    /// device's `config_sync/hash` (spec.md §4.3.7 step 4).
    expected_device_hashes: BTreeMap<DeviceId, String>,
    /// Nesting depth of an open `MethodBatch` (spec.md §4.3.4 "batch exit").
    batch_depth: u32,
    /// Set when a mutator ran inside a batch; the coalesced push happens
    /// once on the outermost `end_config_batch`.
    pending_native_push: bool,
}

impl<C: SyncthingClient, CK: Clock> SyncthingHandler<C, CK> {
    /// Construct a handler for a host whose identity has already been
    /// bootstrapped (spec.md §4.3.1 probe/generate-keys sequence lives in
    /// `lifecycle::startup`, ahead of this call).
    pub fn new(client: Arc<C>, clock: CK, bus: EventBus, data_root: PathBuf, my_id: DeviceId) -> Self {
        let pause_lock = SyncthingPauseLock::new(Arc::clone(&client));
        Self {
            client,
            clock,
            bus,
            pause_lock,
            data_root,
            my_id,
            server_secret: None,
            model: Model::default(),
            config_synced: ConfigSynced::UnsyncedInitial,
            last_event_id: 0,
            expected_device_hashes: BTreeMap::new(),
            batch_depth: 0,
            pending_native_push: false,
        }
    }

    /// Become the server for a brand-new roster: mint a `server_secret`,
    /// register self as the sole server and device, and create this
    /// host's own control folder (spec.md §4.3.1 "no prior configuration").
    pub fn bootstrap_as_server(&mut self, now: u64) -> Result<(), SyncthingError> {
        if self.server_secret.is_some() {
            return Err(SyncthingError::Configuration(
                "handler already has a server_secret".into(),
            ));
        }
        let secret = generate_server_secret();
        self.model.servers.insert(self.my_id.clone());
        self.model
            .devices
            .insert(self.my_id.clone(), Device::new(self.my_id.clone(), None, now));

        let control_id = control_folder_id(&secret, &self.my_id);
        let mut control = Folder::new(control_id.clone(), "control", None, [self.my_id.clone()], serde_json::Value::Null);
        control.add_device(self.my_id.clone());
        self.model.folders.insert(control_id, control);

        self.server_secret = Some(secret);
        self.config_synced = ConfigSynced::Synced;
        self.bus.publish(Event::ConfigSyncChanged { in_sync: true });
        self.persist_authoritative_document()?;
        Ok(())
    }

    pub fn is_server(&self) -> bool {
        self.model.servers.contains(&self.my_id)
    }

    pub fn get_devices(&self) -> Vec<Device> {
        self.model.devices.values().cloned().collect()
    }

    pub fn get_servers(&self) -> Vec<DeviceId> {
        self.model.servers.iter().cloned().collect()
    }

    pub fn get_folders(&self) -> Vec<Folder> {
        self.model.folders.values().cloned().collect()
    }

    pub fn config_synced(&self) -> ConfigSynced {
        self.config_synced
    }

    fn require_synced(&self) -> Result<(), SyncthingError> {
        match self.config_synced {
            ConfigSynced::Synced => Ok(()),
            _ => Err(SyncthingError::ConfigNotInSync),
        }
    }

    fn require_server(&self) -> Result<&str, SyncthingError> {
        self.require_synced()?;
        if !self.is_server() {
            return Err(SyncthingError::NotServer(self.my_id.to_string()));
        }
        self.server_secret
            .as_deref()
            .ok_or_else(|| SyncthingError::Configuration("server has no server_secret".into()))
    }

    /// Add another host as a co-server: its control folder must already be
    /// shared to it before it is trusted with roster mutation rights
    /// (spec.md §4.3.6).
    pub async fn add_server(&mut self, device_id: DeviceId) -> Result<(), SyncthingError> {
        self.require_server()?;
        self.model.servers.insert(device_id);
        self.after_mutation().await
    }

    pub async fn add_device(&mut self, device_id: DeviceId, name: Option<String>) -> Result<(), SyncthingError> {
        self.require_server()?;
        let now = self.clock.now();
        let secret = self.server_secret.clone().unwrap_or_default();
        self.model
            .devices
            .entry(device_id.clone())
            .or_insert_with(|| Device::new(device_id.clone(), name, now));

        let control_id = control_folder_id(&secret, &device_id);
        let mut members: BTreeSet<DeviceId> = self.model.servers.clone();
        members.insert(device_id.clone());
        let control = self
            .model
            .folders
            .entry(control_id.clone())
            .or_insert_with(|| Folder::new(control_id, "control", None, [], serde_json::Value::Null));
        for member in members {
            control.add_device(member);
        }
        self.after_mutation().await
    }

    /// Replace the removed device's folder entries, schedule it for
    /// physical deletion, record the aggregate hash its `config_sync/hash`
    /// must report back, and leave physical removal to
    /// [`Self::handle_device_deletion_ack`] or, failing that,
    /// [`Self::prune_deleted_devices`] (spec.md §4.3.7).
    pub async fn remove_device(&mut self, device_id: &DeviceId) -> Result<(), SyncthingError> {
        self.require_server()?;
        for folder in self.model.folders.values_mut() {
            folder.remove_device(device_id);
        }
        let now = self.clock.now();
        if let Some(device) = self.model.devices.get_mut(device_id) {
            device.schedule_for_deletion(now);
        }
        self.expected_device_hashes
            .insert(device_id.clone(), self.post_removal_hash(device_id));
        self.after_mutation().await
    }

    /// The aggregate hash the model would have if `removed` were gone
    /// entirely, not merely scheduled for deletion (spec.md §4.3.7 step 4).
    fn post_removal_hash(&self, removed: &DeviceId) -> String {
        let servers: Vec<&str> = self
            .model
            .servers
            .iter()
            .filter(|id| *id != removed)
            .map(DeviceId::as_str)
            .collect();
        let devices: Vec<Device> = self
            .model
            .devices
            .values()
            .filter(|d| &d.id != removed)
            .cloned()
            .collect();
        let folders: Vec<Folder> = self.model.folders.values().cloned().collect();
        lance_engine::aggregate_hash(&servers, &devices, &folders, &[])
    }

    pub async fn set_devices(&mut self, devices: Vec<(DeviceId, Option<String>)>) -> Result<(), SyncthingError> {
        self.require_server()?;
        self.begin_config_batch();
        let mut result = Ok(());
        for (id, name) in devices {
            if let Err(e) = self.add_device(id, name).await {
                result = Err(e);
                break;
            }
        }
        let end_result = self.end_config_batch().await;
        result.and(end_result)
    }

    pub async fn add_folder(
        &mut self,
        id: Option<FolderId>,
        label: String,
        local_path: Option<PathBuf>,
        devices: BTreeSet<DeviceId>,
        metadata: serde_json::Value,
    ) -> Result<FolderId, SyncthingError> {
        self.require_server()?;
        let folder_id = id.unwrap_or_else(random_folder_id);
        let mut all_devices = self.model.servers.clone();
        all_devices.extend(devices);
        let folder = Folder::new(folder_id.clone(), label, local_path, all_devices, metadata);
        self.model.folders.insert(folder_id.clone(), folder);
        self.after_mutation().await?;
        Ok(folder_id)
    }

    pub async fn remove_folder(&mut self, folder_id: &FolderId) -> Result<(), SyncthingError> {
        self.require_server()?;
        self.model
            .folders
            .remove(folder_id)
            .ok_or_else(|| SyncthingError::UnknownEntity(folder_id.to_string()))?;
        self.after_mutation().await
    }

    pub async fn add_device_to_folder(&mut self, folder_id: &FolderId, device_id: DeviceId) -> Result<(), SyncthingError> {
        self.require_server()?;
        let folder = self
            .model
            .folders
            .get_mut(folder_id)
            .ok_or_else(|| SyncthingError::UnknownEntity(folder_id.to_string()))?;
        folder.add_device(device_id);
        self.after_mutation().await
    }

    pub async fn remove_device_from_folder(&mut self, folder_id: &FolderId, device_id: &DeviceId) -> Result<(), SyncthingError> {
        self.require_server()?;
        let folder = self
            .model
            .folders
            .get_mut(folder_id)
            .ok_or_else(|| SyncthingError::UnknownEntity(folder_id.to_string()))?;
        folder.remove_device(device_id);
        self.after_mutation().await
    }

    /// Replace a shared folder's device set with `devices` plus the
    /// server set, which every shared folder always carries (spec.md §8
    /// invariant: "every shared folder's members = servers ∪ folder.devices").
    pub async fn set_folder_devices(&mut self, folder_id: &FolderId, devices: BTreeSet<DeviceId>) -> Result<(), SyncthingError> {
        self.require_server()?;
        let servers = self.model.servers.clone();
        let folder = self
            .model
            .folders
            .get_mut(folder_id)
            .ok_or_else(|| SyncthingError::UnknownEntity(folder_id.to_string()))?;
        folder.devices = devices;
        for server in servers {
            folder.add_device(server);
        }
        self.after_mutation().await
    }

    pub async fn set_device_name(&mut self, device_id: &DeviceId, name: String) -> Result<(), SyncthingError> {
        self.require_server()?;
        let device = self
            .model
            .devices
            .get_mut(device_id)
            .ok_or_else(|| SyncthingError::UnknownEntity(device_id.to_string()))?;
        device.name = Some(name);
        self.after_mutation().await
    }

    pub fn set_server_secret(&mut self, server_secret: String) -> Result<(), SyncthingError> {
        self.require_synced()?;
        if !self.is_server() {
            return Err(SyncthingError::NotServer(self.my_id.to_string()));
        }
        self.server_secret = Some(server_secret);
        Ok(())
    }

    /// Persist the roster and push the native config down to the sync
    /// daemon, or, inside an open batch, defer the push to
    /// [`Self::end_config_batch`] so a burst of mutators only emits one
    /// `save_st_config` (spec.md §4.3.4 "updates are coalesced").
    async fn after_mutation(&mut self) -> Result<(), SyncthingError> {
        self.persist_authoritative_document()?;
        self.config_synced = ConfigSynced::Synced;
        if self.batch_depth > 0 {
            self.pending_native_push = true;
            return Ok(());
        }
        self.push_native_config_with_pause().await
    }

    /// Open a configuration batch: mutators called before the matching
    /// [`Self::end_config_batch`] defer their native-config push.
    /// Reentrant; only the outermost `end_config_batch` actually pushes.
    pub fn begin_config_batch(&mut self) {
        self.batch_depth += 1;
    }

    /// Close a configuration batch opened with [`Self::begin_config_batch`],
    /// pushing the native configuration once if any mutator inside the
    /// batch requested it.
    pub async fn end_config_batch(&mut self) -> Result<(), SyncthingError> {
        self.batch_depth = self.batch_depth.saturating_sub(1);
        if self.batch_depth > 0 || !self.pending_native_push {
            return Ok(());
        }
        self.pending_native_push = false;
        self.push_native_config_with_pause().await
    }

    /// [`Self::push_native_config`], with every known device paused for the
    /// duration of the rewrite (spec.md §4.3.6: folder reconfiguration
    /// pauses the affected device for the edit).
    async fn push_native_config_with_pause(&self) -> Result<(), SyncthingError> {
        let mut guards = Vec::with_capacity(self.model.devices.len());
        for device_id in self.model.devices.keys() {
            guards.push(self.pause_lock.pause(device_id.clone()).await?);
        }
        let result = self.push_native_config().await;
        drop(guards);
        result
    }

    fn persist_authoritative_document(&self) -> Result<(), SyncthingError> {
        let Some(folder) = self.server_configuration_folder() else {
            return Ok(());
        };
        let Some(local_path) = &folder.local_path else {
            return Ok(());
        };
        let doc = lance_storage::ServerConfigDocument::new(
            self.model.devices.values().cloned().collect(),
            self.model.folders.values().cloned().collect(),
            Vec::<User>::new(),
        );
        doc.save(local_path)
            .map_err(|e| SyncthingError::Configuration(e.to_string()))
    }

    fn server_configuration_folder(&self) -> Option<&Folder> {
        self.model.folders.values().find(|f| f.is_server_configuration())
    }

    /// Push the current model down as the sync-daemon's native
    /// configuration (spec.md §4.3.4). Folder path/type changes require a
    /// restart; adding/removing devices from existing folders does not.
    pub async fn push_native_config(&self) -> Result<(), SyncthingError> {
        let base = self.client.get_config().await.unwrap_or_default();
        let devices: Vec<Device> = self.model.devices.values().cloned().collect();
        let folders: Vec<Folder> = self.model.folders.values().cloned().collect();
        let native: NativeConfig = lance_engine::materialize(&devices, &folders, &base);
        self.client.set_config(&native).await
    }

    /// Reconcile the in-memory model against the authoritative document on
    /// disk (spec.md §4.3.3). `use_bootstrap` lets the very first reload on
    /// a client pull the server's roster without first requiring a
    /// `ConfigSyncChanged` event (spec.md §4.3.1 initial-configuration path).
    pub async fn reload_configuration(&mut self, use_bootstrap: bool) -> Result<(), SyncthingError> {
        self.config_synced = ConfigSynced::Changing;

        let Some(folder) = self.server_configuration_folder().cloned() else {
            if !use_bootstrap {
                return Err(SyncthingError::NoInitialConfiguration(
                    "no server.configuration folder known yet".into(),
                ));
            }
            self.config_synced = ConfigSynced::UnsyncedInitial;
            return Ok(());
        };
        let Some(local_path) = &folder.local_path else {
            self.config_synced = ConfigSynced::UnsyncedInitial;
            return Ok(());
        };

        let doc = lance_storage::ServerConfigDocument::load(local_path)
            .map_err(|e| SyncthingError::Configuration(e.to_string()))?;
        let Some(doc) = doc else {
            self.config_synced = ConfigSynced::UnsyncedInitial;
            return Ok(());
        };

        let mut new_devices: BTreeMap<DeviceId, Device> = BTreeMap::new();
        for device in doc.devices {
            new_devices.insert(device.id.clone(), device);
        }
        let mut new_folders: BTreeMap<FolderId, Folder> = self.model.folders.clone();
        for mut folder in doc.folders {
            if let Some(existing) = new_folders.get(&folder.id) {
                folder.local_path = existing.local_path.clone();
            }
            new_folders.insert(folder.id.clone(), folder);
        }

        let device_diff = lance_engine::diff_devices(&self.model.devices, &new_devices);
        let folder_diff = lance_engine::diff_folders(&self.model.folders, &new_folders);

        for removed in &device_diff.removed {
            self.model.devices.remove(&removed.id);
        }
        for added in &device_diff.added {
            self.model.devices.insert(added.id.clone(), added.clone());
        }
        for changed in &device_diff.changed {
            if let Some(existing) = self.model.devices.get_mut(&changed.id) {
                existing.replace_with(changed);
            }
        }
        for removed in &folder_diff.removed {
            self.model.folders.remove(&removed.id);
        }
        for added in &folder_diff.added {
            self.model.folders.insert(added.id.clone(), added.clone());
        }
        for changed in &folder_diff.configuration_changed {
            if let Some(existing) = self.model.folders.get_mut(&changed.id) {
                existing.replace_with(changed);
            }
        }

        for event in device_diff.into_events(source()) {
            self.bus.publish(event);
        }
        for event in folder_diff.into_events(source()) {
            self.bus.publish(event);
        }

        self.recompute_config_synced()?;
        if self.is_server() {
            if let Err(e) = self.push_native_config_with_pause().await {
                warn!(error = %e, "failed to push native config after reload");
            }
        }
        Ok(())
    }

    /// Compare the aggregate configuration hash against the last one this
    /// host observed from its server, updating [`ConfigSynced`] and firing
    /// [`Event::ConfigSyncChanged`] on any change (spec.md §4.3.8, §6).
    fn recompute_config_synced(&mut self) -> Result<(), SyncthingError> {
        let servers: Vec<&str> = self.model.servers.iter().map(DeviceId::as_str).collect();
        let devices: Vec<Device> = self.model.devices.values().cloned().collect();
        let folders: Vec<Folder> = self.model.folders.values().cloned().collect();
        let ignored: Vec<FolderId> = Vec::new();
        let hash = lance_engine::aggregate_hash(&servers, &devices, &folders, &ignored);

        let stored = lance_storage::load_config_sync_hash(&self.data_root)
            .map_err(|e| SyncthingError::Configuration(e.to_string()))?;

        let in_sync = stored.as_deref() == Some(hash.as_str());
        let was_synced = matches!(self.config_synced, ConfigSynced::Synced);
        self.config_synced = if in_sync || self.is_server() {
            ConfigSynced::Synced
        } else {
            ConfigSynced::Changing
        };

        lance_storage::save_config_sync_hash(&self.data_root, &hash)
            .map_err(|e| SyncthingError::Configuration(e.to_string()))?;

        if was_synced != matches!(self.config_synced, ConfigSynced::Synced) {
            self.bus.publish(Event::ConfigSyncChanged {
                in_sync: matches!(self.config_synced, ConfigSynced::Synced),
            });
        }
        Ok(())
    }

    /// Physically drop devices whose deletion grace period has elapsed or
    /// whose removal every other client has already observed (spec.md
    /// §4.3.7, `lance_engine::ready_to_remove`). `all_clients_synced` is a
    /// deliberate simplification: this host only tracks its own aggregate
    /// config-sync state, not a per-client hash table, so "every client
    /// synced" degrades to "this host itself is caught up" — documented
    /// best-effort per spec.md §9.
    pub fn prune_deleted_devices(&mut self) -> bool {
        let now = self.clock.now();
        let all_clients_synced = matches!(self.config_synced, ConfigSynced::Synced);
        let to_remove: Vec<DeviceId> = self
            .model
            .devices
            .values()
            .filter(|d| lance_engine::ready_to_remove(d, now, all_clients_synced))
            .map(|d| d.id.clone())
            .collect();
        if to_remove.is_empty() {
            return false;
        }
        for id in &to_remove {
            self.model.devices.remove(id);
            self.model.servers.remove(id);
            self.model.ignored_devices.remove(id);
            self.expected_device_hashes.remove(id);
        }
        true
    }

    /// The device, if any, whose control folder id is `folder_id`.
    fn device_for_control_folder(&self, folder_id: &str) -> Option<DeviceId> {
        let secret = self.server_secret.as_deref()?;
        self.model
            .devices
            .keys()
            .find(|id| control_folder_id(secret, id).as_str() == folder_id)
            .cloned()
    }

    /// `StartupComplete` (spec.md §4.3.5): probe the configuration folder's
    /// db status; on a transition, reload if now in sync and publish
    /// `ConfigSyncChanged`; treat the probe failing (the 404 case) as the
    /// folder missing entirely and reinitialize + restart.
    async fn handle_startup_complete(&mut self) {
        let Some(folder) = self.server_configuration_folder().cloned() else {
            return;
        };
        match self.client.db_status(folder.id.as_str()).await {
            Ok(status) => {
                let in_sync = status.need_total_items == 0;
                let was_synced = matches!(self.config_synced, ConfigSynced::Synced);
                if in_sync == was_synced {
                    return;
                }
                if in_sync {
                    if let Err(e) = self.reload_configuration(false).await {
                        warn!(error = %e, "reload after startup complete failed");
                        return;
                    }
                }
                self.bus.publish(Event::ConfigSyncChanged { in_sync });
            }
            Err(e) => {
                warn!(error = %e, "configuration folder missing on startup; reinitializing");
                if let Err(e) = self.reload_configuration(true).await {
                    warn!(error = %e, "reinitialization after missing configuration folder failed");
                }
                if let Err(e) = self.client.restart().await {
                    warn!(error = %e, "restart after missing configuration folder failed");
                }
            }
        }
    }

    /// `ItemFinished` on either the configuration folder or a per-device
    /// control folder (spec.md §4.3.5).
    async fn handle_item_finished(&mut self, folder_id: &str, item: &str, data: &serde_json::Value) {
        match item {
            "config.cfg" => {
                self.bus.publish(Event::FoldersConfigurationChanged {
                    folders: self
                        .model
                        .folders
                        .get(&FolderId::new(folder_id))
                        .cloned()
                        .into_iter()
                        .collect(),
                    source: source(),
                });
                let is_server_configuration_folder = self
                    .server_configuration_folder()
                    .is_some_and(|f| f.id.as_str() == folder_id);
                if is_server_configuration_folder {
                    if let Err(e) = self.reload_configuration(false).await {
                        warn!(error = %e, "reload_configuration after ItemFinished(config.cfg) failed");
                    }
                }
            }
            "config_sync/hash" => {
                let hash = data.get("hash").and_then(|v| v.as_str());
                self.handle_device_deletion_ack(folder_id, hash);
            }
            _ => {}
        }
    }

    /// The client's `config_sync/hash` matching the expected post-removal
    /// hash (spec.md §4.3.7 step 4): physically remove the device instead
    /// of waiting for the retention-window timer.
    fn handle_device_deletion_ack(&mut self, folder_id: &str, observed_hash: Option<&str>) {
        let Some(observed_hash) = observed_hash else {
            return;
        };
        let Some(device_id) = self.device_for_control_folder(folder_id) else {
            return;
        };
        if self.expected_device_hashes.get(&device_id).map(String::as_str) != Some(observed_hash) {
            return;
        }
        self.expected_device_hashes.remove(&device_id);
        self.model.devices.remove(&device_id);
        self.model.servers.remove(&device_id);
        self.model.ignored_devices.remove(&device_id);
        let _ = self.persist_authoritative_document();
    }

    /// Translate one sync-daemon event into bus events (spec.md §4.3.5). A
    /// representative, not exhaustive, subset of the event table: the
    /// rows that drive visible roster/progress state. Anything else falls
    /// through to the `Syncthing` catch-all so downstream processors still
    /// see it (spec.md §9 allows best-effort coverage here).
    async fn handle_syncthing_event(&mut self, event: SyncthingEvent) {
        self.last_event_id = event.id;
        match event.event_type.as_str() {
            "StartupComplete" => {
                info!("sync daemon reported startup complete");
                self.handle_startup_complete().await;
            }
            "DeviceConnected" => {
                if let Some(id) = event.data.get("id").and_then(|v| v.as_str()) {
                    if let Some(device) = self.model.devices.get_mut(&DeviceId::new(id)) {
                        device.volatile.connected = true;
                    }
                }
            }
            "DeviceDisconnected" => {
                if let Some(id) = event.data.get("id").and_then(|v| v.as_str()) {
                    if let Some(device) = self.model.devices.get_mut(&DeviceId::new(id)) {
                        device.volatile.connected = false;
                    }
                }
            }
            "FolderSummary" => {
                if let Some(folder_id) = event.data.get("folder").and_then(|v| v.as_str()) {
                    if let Some(summary) = event.data.get("summary") {
                        if let Some(folder) = self.model.folders.get_mut(&FolderId::new(folder_id)) {
                            folder.volatile.need_total_items =
                                summary.get("needTotalItems").and_then(|v| v.as_u64()).unwrap_or(0);
                            folder.volatile.need_bytes =
                                summary.get("needBytes").and_then(|v| v.as_u64()).unwrap_or(0);
                            folder.volatile.global_bytes =
                                summary.get("globalBytes").and_then(|v| v.as_u64()).unwrap_or(0);
                            folder.volatile.in_sync_bytes =
                                summary.get("inSyncBytes").and_then(|v| v.as_u64()).unwrap_or(0);
                            if folder.is_synced() {
                                self.bus.publish(Event::FoldersSynced {
                                    folders: vec![folder.clone()],
                                    source: source(),
                                });
                            }
                        }
                    }
                }
            }
            "ItemStarted" => {
                if let Some(folder_id) = event.data.get("folder").and_then(|v| v.as_str()) {
                    let is_metadata_only = event.data.get("metadataOnly").and_then(|v| v.as_bool()).unwrap_or(false);
                    let matches_config_folder = event.data.get("item").and_then(|v| v.as_str()) == Some("config.cfg")
                        && self.server_configuration_folder().is_some_and(|f| f.id.as_str() == folder_id);
                    if matches_config_folder && !is_metadata_only {
                        let was_synced = matches!(self.config_synced, ConfigSynced::Synced);
                        self.config_synced = ConfigSynced::Changing;
                        if was_synced {
                            self.bus.publish(Event::ConfigSyncChanged { in_sync: false });
                        }
                    }
                }
            }
            "ItemFinished" => {
                if let Some(folder_id) = event.data.get("folder").and_then(|v| v.as_str()).map(str::to_string) {
                    if let Some(item) = event.data.get("item").and_then(|v| v.as_str()).map(str::to_string) {
                        let data = event.data.clone();
                        self.handle_item_finished(&folder_id, &item, &data).await;
                    }
                }
            }
            other => {
                self.bus.publish(Event::Syncthing {
                    event_type: other.to_string(),
                    data: event.data,
                });
            }
        }
    }
}

#[async_trait::async_trait]
impl<C: SyncthingClient, CK: Clock> Load for SyncthingHandler<C, CK> {
    /// The event-ingestion long-poll (spec.md §4.3.5): fetch events since
    /// the last seen id, translate each, and ask for more immediately if
    /// any arrived (there may be more already buffered), else idle for the
    /// configured long-poll timeout.
    async fn step(&mut self) -> LoadControl {
        match self.client.events(self.last_event_id).await {
            Ok(events) if events.is_empty() => LoadControl::Idle(Duration::from_secs(5)),
            Ok(events) => {
                for event in events {
                    self.handle_syncthing_event(event).await;
                }
                if self.prune_deleted_devices() {
                    let _ = self.persist_authoritative_document();
                }
                LoadControl::Continue
            }
            Err(e) => {
                warn!(error = %e, "sync-daemon event poll failed");
                LoadControl::Idle(Duration::from_secs(5))
            }
        }
    }
}

/// Queue a [`SyncthingHandler`] call through its [`crate::worker::WorkerHandle`].
/// A thin convenience so [`crate::server::Server`] doesn't need to spell out
/// the `Box::pin` boilerplate at every call site.
pub fn call<C, CK, F, T>(
    handle: &crate::worker::WorkerHandle<SyncthingHandler<C, CK>>,
    f: F,
) -> crate::worker::AsyncHandle<T, SyncthingError>
where
    C: SyncthingClient,
    CK: Clock + Send + 'static,
    F: for<'a> FnOnce(&'a mut SyncthingHandler<C, CK>) -> BoxFuture<'a, Result<T, SyncthingError>>
        + Send
        + 'static,
    T: Send + 'static,
{
    handle.call(f)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lance_adapters::http::FakeSyncthingClient;
    use lance_core::FakeClock;
    use tempfile::tempdir;

    fn handler(dir: &std::path::Path) -> SyncthingHandler<FakeSyncthingClient, FakeClock> {
        let client = Arc::new(FakeSyncthingClient::new());
        let (bus, _rx) = crate::event_bus::channel();
        SyncthingHandler::new(client, FakeClock::new(1_000), bus, dir.to_path_buf(), DeviceId::new("me"))
    }

    #[test]
    fn bootstrap_as_server_registers_self_and_control_folder() {
        let dir = tempdir().unwrap();
        let mut h = handler(dir.path());
        h.bootstrap_as_server(1_000).unwrap();
        assert!(h.is_server());
        assert_eq!(h.get_devices().len(), 1);
        assert_eq!(h.get_folders().len(), 1);
        assert_eq!(h.config_synced(), ConfigSynced::Synced);
    }

    #[tokio::test]
    async fn mutation_before_sync_is_rejected() {
        let dir = tempdir().unwrap();
        let mut h = handler(dir.path());
        let err = h.add_device(DeviceId::new("other"), None).await.unwrap_err();
        assert!(matches!(err, SyncthingError::ConfigNotInSync));
    }

    #[tokio::test]
    async fn non_server_cannot_mutate_roster() {
        let dir = tempdir().unwrap();
        let mut h = handler(dir.path());
        h.config_synced = ConfigSynced::Synced;
        let err = h.add_device(DeviceId::new("other"), None).await.unwrap_err();
        assert!(matches!(err, SyncthingError::NotServer(_)));
    }

    #[tokio::test]
    async fn add_device_creates_control_folder_with_servers_and_device() {
        let dir = tempdir().unwrap();
        let mut h = handler(dir.path());
        h.bootstrap_as_server(1_000).unwrap();
        let secret = h.server_secret.clone().unwrap();
        h.add_device(DeviceId::new("laptop"), Some("Laptop".into())).await.unwrap();

        let control_id = control_folder_id(&secret, &DeviceId::new("laptop"));
        let control = h.get_folders().into_iter().find(|f| f.id == control_id).unwrap();
        assert!(control.devices.contains(&DeviceId::new("laptop")));
        assert!(control.devices.contains(&DeviceId::new("me")));
    }

    #[tokio::test]
    async fn remove_device_schedules_deletion_and_strips_folder_membership() {
        let dir = tempdir().unwrap();
        let mut h = handler(dir.path());
        h.bootstrap_as_server(1_000).unwrap();
        h.add_device(DeviceId::new("laptop"), None).await.unwrap();
        h.remove_device(&DeviceId::new("laptop")).await.unwrap();

        let device = h
            .get_devices()
            .into_iter()
            .find(|d| d.id == DeviceId::new("laptop"))
            .unwrap();
        assert!(device.is_scheduled_for_deletion());
        for folder in h.get_folders() {
            assert!(!folder.devices.contains(&DeviceId::new("laptop")));
        }
    }

    #[tokio::test]
    async fn prune_removes_device_after_retention_window_even_if_unsynced() {
        let dir = tempdir().unwrap();
        let mut h = handler(dir.path());
        h.bootstrap_as_server(1_000).unwrap();
        h.add_device(DeviceId::new("gone"), None).await.unwrap();
        h.remove_device(&DeviceId::new("gone")).await.unwrap();
        h.config_synced = ConfigSynced::Changing;

        h.clock.set(1_000 + lance_engine::MAX_RETENTION_SECS);
        assert!(h.prune_deleted_devices());
        assert!(!h.model.devices.contains_key(&DeviceId::new("gone")));
    }

    #[tokio::test]
    async fn add_folder_always_includes_server_devices() {
        let dir = tempdir().unwrap();
        let mut h = handler(dir.path());
        h.bootstrap_as_server(1_000).unwrap();
        let id = h
            .add_folder(None, "shot01".into(), None, BTreeSet::new(), serde_json::Value::Null)
            .await
            .unwrap();
        let folder = h.get_folders().into_iter().find(|f| f.id == id).unwrap();
        assert!(folder.devices.contains(&DeviceId::new("me")));
    }

    #[tokio::test]
    async fn remove_device_is_physically_removed_once_hash_matches() {
        let dir = tempdir().unwrap();
        let client = Arc::new(FakeSyncthingClient::new());
        let (bus, _rx) = crate::event_bus::channel();
        let mut h = SyncthingHandler::new(
            Arc::clone(&client),
            FakeClock::new(1_000),
            bus,
            dir.path().to_path_buf(),
            DeviceId::new("me"),
        );
        h.bootstrap_as_server(1_000).unwrap();
        h.add_device(DeviceId::new("laptop"), None).await.unwrap();
        h.remove_device(&DeviceId::new("laptop")).await.unwrap();

        let expected = h.expected_device_hashes.get(&DeviceId::new("laptop")).cloned().unwrap();
        let secret = h.server_secret.clone().unwrap();
        let control_id = control_folder_id(&secret, &DeviceId::new("laptop"));

        client.push_event(SyncthingEvent {
            id: 1,
            event_type: "ItemFinished".into(),
            time: "t".into(),
            data: serde_json::json!({"folder": control_id.as_str(), "item": "config_sync/hash", "hash": expected}),
        });
        assert!(matches!(h.step().await, LoadControl::Continue));

        assert!(!h.model.devices.contains_key(&DeviceId::new("laptop")));
        assert!(h.expected_device_hashes.is_empty());
    }

    #[tokio::test]
    async fn batched_mutators_push_native_config_once() {
        let dir = tempdir().unwrap();
        let client = Arc::new(FakeSyncthingClient::new());
        let (bus, _rx) = crate::event_bus::channel();
        let mut h = SyncthingHandler::new(
            Arc::clone(&client),
            FakeClock::new(1_000),
            bus,
            dir.path().to_path_buf(),
            DeviceId::new("me"),
        );
        h.bootstrap_as_server(1_000).unwrap();
        h.set_devices(vec![
            (DeviceId::new("a"), None),
            (DeviceId::new("b"), None),
        ])
        .await
        .unwrap();
        assert_eq!(h.get_devices().len(), 3);
        let native = client.config();
        assert!(native.devices.iter().any(|d| d.device_id == "a"));
        assert!(native.devices.iter().any(|d| d.device_id == "b"));
    }

    #[tokio::test]
    async fn step_translates_device_connected_event() {
        let dir = tempdir().unwrap();
        let client = Arc::new(FakeSyncthingClient::new());
        let (bus, _rx) = crate::event_bus::channel();
        let mut h = SyncthingHandler::new(
            Arc::clone(&client),
            FakeClock::new(0),
            bus,
            dir.path().to_path_buf(),
            DeviceId::new("me"),
        );
        h.bootstrap_as_server(0).unwrap();
        h.add_device(DeviceId::new("laptop"), None).await.unwrap();

        client.push_event(SyncthingEvent {
            id: 1,
            event_type: "DeviceConnected".into(),
            time: "t".into(),
            data: serde_json::json!({"id": "laptop"}),
        });

        assert!(matches!(h.step().await, LoadControl::Continue));
        let device = h
            .get_devices()
            .into_iter()
            .find(|d| d.id == DeviceId::new("laptop"))
            .unwrap();
        assert!(device.volatile.connected);
    }

    #[test]
    fn folder_id_helpers_are_stable_for_same_inputs() {
        let secret = "abc";
        let id1 = server_configuration_folder_id(secret);
        let id2 = server_configuration_folder_id(secret);
        assert_eq!(id1, id2);
        assert_ne!(id1, control_folder_id(secret, &DeviceId::new("d1")));
    }
}
