// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-project event processor (spec.md §4.4): rebuilds one project's view
//! of the shot/shot-part roster from scratch on every folder-roster event,
//! materializes its users from the project's own `config.cfg`, and
//! reconciles every shot-part folder's device membership against the
//! resulting access grants in a single configuration batch (spec.md §9:
//! rebuild over patch).

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use lance_adapters::http::SyncthingClient;
use lance_core::{
    Access, Clock, DeviceId, Event, FolderId, ProjectManagerError, ProjectName, ShotId, ShotMap,
    ShotPartId, SyncthingError, User, UserId,
};
use lance_engine::ProjectView;
use tracing::warn;

use crate::processor::EventProcessor;
use crate::syncthing::SyncthingHandler;
use crate::worker::{self, AsyncHandle, Load, LoadControl, WorkerHandle};

/// How long a batched `set_devices`/`set_folder_devices` call keeps retrying
/// while the handler reports `ConfigNotInSync` (spec.md §4.4
/// "rescanConfiguration" step 7).
const RESCAN_RETRY_TIMEOUT: Duration = Duration::from_secs(5);
const RESCAN_RETRY_BACKOFF: Duration = Duration::from_millis(50);

fn load_or_default(
    project: &ProjectName,
    path: &Path,
) -> Result<lance_storage::ProjectConfigDocument, ProjectManagerError> {
    let loaded = lance_storage::ProjectConfigDocument::load(path)
        .map_err(|e| ProjectManagerError::Inconsistent(e.to_string()))?;
    Ok(loaded.unwrap_or_else(|| {
        lance_storage::ProjectConfigDocument::new(project.clone(), BTreeSet::new(), Vec::new())
    }))
}

/// One project's background state, driven as a [`Load`] by its own worker
/// exactly like [`SyncthingHandler`] — the request/response contract the
/// public API needs (spec.md §4.4) is the same one the sync-daemon handler
/// already uses.
struct ProjectManagerState<C: SyncthingClient, CK: Clock + Send + 'static> {
    name: ProjectName,
    view: ProjectView,
    users: Vec<User>,
    settings_folder_path: Option<PathBuf>,
    syncthing: WorkerHandle<SyncthingHandler<C, CK>>,
}

#[async_trait::async_trait]
impl<C: SyncthingClient, CK: Clock + Send + 'static> Load for ProjectManagerState<C, CK> {
    async fn step(&mut self) -> LoadControl {
        LoadControl::Idle(Duration::from_secs(3600))
    }
}

impl<C: SyncthingClient, CK: Clock + Send + 'static> ProjectManagerState<C, CK> {
    async fn handle_event(&mut self, event: &Event) -> Result<(), ProjectManagerError> {
        match event {
            Event::ConfigSyncChanged { in_sync: true } => self.rescan(true).await,
            Event::ConfigSyncChanged { in_sync: false } => Ok(()),
            _ if event.folders().is_some() => self.rescan(true).await,
            _ => Ok(()),
        }
    }

    /// `rescanConfiguration` (spec.md §4.4):
    /// 1. reclassify the full folder roster into this project's shots
    /// 2. note the `server.configuration` folder's local path
    /// 3. if server: materialize users from its `config.cfg`
    /// 4-6. compute the desired device set per shot-part folder, and their
    ///    union as the project's `allDevices`
    /// 7. push both in one configuration batch, retrying `ConfigNotInSync`
    async fn rescan(&mut self, rescan_project_settings: bool) -> Result<(), ProjectManagerError> {
        let folders = crate::syncthing::call(&self.syncthing, |h| {
            Box::pin(async move { Ok::<_, SyncthingError>(h.get_folders()) })
        })
        .wait()
        .await?;

        let classified = lance_engine::classify_folders(&folders);
        self.view = classified.get(&self.name).cloned().unwrap_or_default();

        if let Some(folder_id) = &self.view.server_configuration_folder {
            if let Some(folder) = folders.iter().find(|f| &f.id == folder_id) {
                self.settings_folder_path = folder.local_path.clone();
            }
        }

        let is_server = crate::syncthing::call(&self.syncthing, |h| {
            Box::pin(async move { Ok::<_, SyncthingError>(h.is_server()) })
        })
        .wait()
        .await?;
        if !is_server {
            return Ok(());
        }

        if rescan_project_settings {
            if let Some(path) = self.settings_folder_path.clone() {
                self.users = lance_storage::ProjectConfigDocument::load(&path)
                    .map_err(|e| ProjectManagerError::Inconsistent(e.to_string()))?
                    .map(|doc| doc.users)
                    .unwrap_or_default();
            }
        }

        let mut folder_devices: BTreeMap<FolderId, BTreeSet<DeviceId>> = BTreeMap::new();
        for ((shot_id, shot_part_id), folder_id) in &self.view.shot_part_folders {
            folder_devices.insert(
                folder_id.clone(),
                lance_engine::desired_folder_devices(shot_id, shot_part_id, &self.users),
            );
        }
        let mut all_devices: BTreeSet<DeviceId> = BTreeSet::new();
        for devices in folder_devices.values() {
            all_devices.extend(devices.iter().cloned());
        }
        let all_devices: Vec<(DeviceId, Option<String>)> =
            all_devices.into_iter().map(|d| (d, None)).collect();

        self.push_config_batch(all_devices, folder_devices).await?;
        Ok(())
    }

    /// Step 7's batch: `set_devices` then one `set_folder_devices` per
    /// shot-part folder, all queued atomically so no other caller's request
    /// interleaves, each retrying while the handler reports
    /// `ConfigNotInSync` (spec.md §4.4).
    async fn push_config_batch(
        &self,
        all_devices: Vec<(DeviceId, Option<String>)>,
        folder_devices: BTreeMap<FolderId, BTreeSet<DeviceId>>,
    ) -> Result<(), SyncthingError> {
        let mut batch = self.syncthing.batch();
        let mut handles: Vec<AsyncHandle<(), SyncthingError>> = Vec::new();

        handles.push(batch.push(|h: &mut SyncthingHandler<C, CK>| {
            Box::pin(async move {
                h.begin_config_batch();
                Ok(())
            })
        }));

        handles.push(batch.push(move |h: &mut SyncthingHandler<C, CK>| {
            Box::pin(async move {
                let start = Instant::now();
                loop {
                    match h.set_devices(all_devices.clone()).await {
                        Err(e) if e.is_retryable() && start.elapsed() < RESCAN_RETRY_TIMEOUT => {
                            tokio::time::sleep(RESCAN_RETRY_BACKOFF).await;
                        }
                        other => break other,
                    }
                }
            })
        }));

        for (folder_id, devices) in folder_devices {
            handles.push(batch.push(move |h: &mut SyncthingHandler<C, CK>| {
                Box::pin(async move {
                    let start = Instant::now();
                    loop {
                        match h.set_folder_devices(&folder_id, devices.clone()).await {
                            Err(e) if e.is_retryable() && start.elapsed() < RESCAN_RETRY_TIMEOUT => {
                                tokio::time::sleep(RESCAN_RETRY_BACKOFF).await;
                            }
                            other => break other,
                        }
                    }
                })
            }));
        }

        handles.push(batch.push(|h: &mut SyncthingHandler<C, CK>| {
            Box::pin(async move { h.end_config_batch().await })
        }));

        batch.commit();
        for handle in handles {
            handle.wait().await?;
        }
        Ok(())
    }

    /// The project's `server.configuration` folder's local path, looked up
    /// fresh from the roster if not yet cached — lets a mutator run without
    /// a prior `rescan` having already discovered it.
    async fn resolve_settings_path(&mut self) -> Result<PathBuf, ProjectManagerError> {
        if let Some(path) = &self.settings_folder_path {
            return Ok(path.clone());
        }
        let folders = crate::syncthing::call(&self.syncthing, |h| {
            Box::pin(async move { Ok::<_, SyncthingError>(h.get_folders()) })
        })
        .wait()
        .await?;
        let classified = lance_engine::classify_folders(&folders);
        let view = classified.get(&self.name).cloned().unwrap_or_default();
        let folder_id = view.server_configuration_folder.clone().ok_or_else(|| {
            ProjectManagerError::Inconsistent("project settings folder not yet known".into())
        })?;
        let folder = folders.iter().find(|f| f.id == folder_id).ok_or_else(|| {
            ProjectManagerError::Inconsistent("settings folder id not found in roster".into())
        })?;
        let path = folder.local_path.clone().ok_or_else(|| {
            ProjectManagerError::Inconsistent("settings folder has no local path".into())
        })?;
        self.settings_folder_path = Some(path.clone());
        Ok(path)
    }

    async fn add_shot(
        &mut self,
        shot_id: ShotId,
        shot_part_id: ShotPartId,
        local_path: Option<PathBuf>,
    ) -> Result<FolderId, ProjectManagerError> {
        let metadata = serde_json::json!({
            "__ProjectManager_data__": {
                "type": "shotpart",
                "project": self.name.as_str(),
                "shotid": shot_id.as_str(),
                "shotpartid": shot_part_id.as_str(),
            }
        });
        let label = format!("{}-{}-{}", self.name.as_str(), shot_id.as_str(), shot_part_id.as_str());
        let folder_id = crate::syncthing::call(&self.syncthing, move |h| {
            Box::pin(async move { h.add_folder(None, label, local_path, BTreeSet::new(), metadata).await })
        })
        .wait()
        .await?;
        self.rescan(true).await?;
        Ok(folder_id)
    }

    async fn remove_shot(&mut self, shot_id: ShotId) -> Result<(), ProjectManagerError> {
        let folder_ids: Vec<FolderId> = self
            .view
            .shot_part_folders
            .iter()
            .filter(|((sid, _), _)| *sid == shot_id)
            .map(|(_, fid)| fid.clone())
            .collect();
        if folder_ids.is_empty() {
            return Ok(());
        }

        let mut batch = self.syncthing.batch();
        let mut handles: Vec<AsyncHandle<(), SyncthingError>> = Vec::with_capacity(folder_ids.len());
        for folder_id in folder_ids {
            handles.push(batch.push(move |h: &mut SyncthingHandler<C, CK>| {
                Box::pin(async move { h.remove_folder(&folder_id).await })
            }));
        }
        batch.commit();
        for handle in handles {
            handle.wait().await?;
        }

        self.rescan(true).await
    }

    async fn remove_shotpart(
        &mut self,
        shot_id: ShotId,
        shot_part_id: ShotPartId,
    ) -> Result<(), ProjectManagerError> {
        let Some(folder_id) = self.view.shot_part_folders.get(&(shot_id, shot_part_id)).cloned() else {
            return Ok(());
        };
        crate::syncthing::call(&self.syncthing, move |h| {
            Box::pin(async move { h.remove_folder(&folder_id).await })
        })
        .wait()
        .await?;
        self.rescan(true).await
    }

    fn get_shots(&self) -> ShotMap {
        self.view.shots.clone()
    }

    fn get_users(&self) -> Vec<User> {
        self.users.clone()
    }

    async fn add_user(
        &mut self,
        id: UserId,
        name: String,
        devices: BTreeSet<DeviceId>,
        access: BTreeSet<Access>,
    ) -> Result<(), ProjectManagerError> {
        let path = self.resolve_settings_path().await?;
        let mut doc = load_or_default(&self.name, &path)?;
        if doc.users.iter().any(|u| u.id == id) {
            return Ok(());
        }
        let mut user = User::new(id, name);
        user.devices = devices;
        user.access = access;
        doc.users.push(user);
        doc.save(&path).map_err(|e| ProjectManagerError::Inconsistent(e.to_string()))?;
        self.rescan(true).await
    }

    async fn remove_user(&mut self, id: UserId) -> Result<(), ProjectManagerError> {
        let path = self.resolve_settings_path().await?;
        let mut doc = load_or_default(&self.name, &path)?;
        doc.users.retain(|u| u.id != id);
        doc.save(&path).map_err(|e| ProjectManagerError::Inconsistent(e.to_string()))?;
        self.rescan(true).await
    }

    async fn add_devices_to_user(
        &mut self,
        id: UserId,
        devices: BTreeSet<DeviceId>,
    ) -> Result<(), ProjectManagerError> {
        let path = self.resolve_settings_path().await?;
        let mut doc = load_or_default(&self.name, &path)?;
        if let Some(user) = doc.users.iter_mut().find(|u| u.id == id) {
            user.devices.extend(devices);
        }
        doc.save(&path).map_err(|e| ProjectManagerError::Inconsistent(e.to_string()))?;
        self.rescan(true).await
    }

    async fn remove_devices_from_user(
        &mut self,
        id: UserId,
        devices: BTreeSet<DeviceId>,
    ) -> Result<(), ProjectManagerError> {
        let path = self.resolve_settings_path().await?;
        let mut doc = load_or_default(&self.name, &path)?;
        if let Some(user) = doc.users.iter_mut().find(|u| u.id == id) {
            for device in &devices {
                user.devices.remove(device);
            }
        }
        doc.save(&path).map_err(|e| ProjectManagerError::Inconsistent(e.to_string()))?;
        self.rescan(true).await
    }
}

/// Handle to a running project manager (spec.md §4.4), registered with the
/// dispatcher as an [`EventProcessor`] and exposing the project's public
/// shot/user operations through the same worker request/response contract
/// [`SyncthingHandler`] uses.
pub struct ProjectManager<C: SyncthingClient, CK: Clock + Send + 'static> {
    name: ProjectName,
    inner: WorkerHandle<ProjectManagerState<C, CK>>,
    alive: Arc<std::sync::atomic::AtomicBool>,
}

impl<C: SyncthingClient, CK: Clock + Send + 'static> ProjectManager<C, CK> {
    pub fn spawn(name: ProjectName, syncthing: WorkerHandle<SyncthingHandler<C, CK>>) -> Arc<Self> {
        let state = ProjectManagerState {
            name: name.clone(),
            view: ProjectView::default(),
            users: Vec::new(),
            settings_folder_path: None,
            syncthing,
        };
        let (inner, join) = worker::spawn(state, 32);
        let alive = Arc::new(std::sync::atomic::AtomicBool::new(true));
        let alive_task = Arc::clone(&alive);
        tokio::spawn(async move {
            let _ = join.await;
            alive_task.store(false, std::sync::atomic::Ordering::SeqCst);
        });
        Arc::new(Self { name, inner, alive })
    }

    pub fn name(&self) -> &ProjectName {
        &self.name
    }

    pub async fn add_shot(
        &self,
        shot_id: ShotId,
        shot_part_id: ShotPartId,
        local_path: Option<PathBuf>,
    ) -> Result<FolderId, ProjectManagerError> {
        self.inner
            .call(move |state| Box::pin(async move { state.add_shot(shot_id, shot_part_id, local_path).await }))
            .wait()
            .await
    }

    pub async fn remove_shot(&self, shot_id: ShotId) -> Result<(), ProjectManagerError> {
        self.inner
            .call(move |state| Box::pin(async move { state.remove_shot(shot_id).await }))
            .wait()
            .await
    }

    pub async fn remove_shotpart(
        &self,
        shot_id: ShotId,
        shot_part_id: ShotPartId,
    ) -> Result<(), ProjectManagerError> {
        self.inner
            .call(move |state| Box::pin(async move { state.remove_shotpart(shot_id, shot_part_id).await }))
            .wait()
            .await
    }

    pub async fn get_shots(&self) -> Result<ShotMap, ProjectManagerError> {
        self.inner
            .call(|state| Box::pin(async move { Ok(state.get_shots()) }))
            .wait()
            .await
    }

    pub async fn get_users(&self) -> Result<Vec<User>, ProjectManagerError> {
        self.inner
            .call(|state| Box::pin(async move { Ok(state.get_users()) }))
            .wait()
            .await
    }

    pub async fn add_user(
        &self,
        id: UserId,
        name: String,
        devices: BTreeSet<DeviceId>,
        access: BTreeSet<Access>,
    ) -> Result<(), ProjectManagerError> {
        self.inner
            .call(move |state| Box::pin(async move { state.add_user(id, name, devices, access).await }))
            .wait()
            .await
    }

    pub async fn remove_user(&self, id: UserId) -> Result<(), ProjectManagerError> {
        self.inner
            .call(move |state| Box::pin(async move { state.remove_user(id).await }))
            .wait()
            .await
    }

    pub async fn add_devices_to_user(
        &self,
        id: UserId,
        devices: BTreeSet<DeviceId>,
    ) -> Result<(), ProjectManagerError> {
        self.inner
            .call(move |state| Box::pin(async move { state.add_devices_to_user(id, devices).await }))
            .wait()
            .await
    }

    pub async fn remove_devices_from_user(
        &self,
        id: UserId,
        devices: BTreeSet<DeviceId>,
    ) -> Result<(), ProjectManagerError> {
        self.inner
            .call(move |state| Box::pin(async move { state.remove_devices_from_user(id, devices).await }))
            .wait()
            .await
    }
}

impl<C: SyncthingClient, CK: Clock + Send + 'static> EventProcessor for ProjectManager<C, CK> {
    fn is_expected_event(&self, event: &Event) -> bool {
        event.is_project_manager_event()
    }

    fn add_event(&self, event: Event) {
        let _: AsyncHandle<(), ProjectManagerError> = self.inner.call(move |state| {
            Box::pin(async move {
                if let Err(e) = state.handle_event(&event).await {
                    warn!(error = %e, "project manager event handling failed");
                }
                Ok(())
            })
        });
    }

    fn is_alive(&self) -> bool {
        self.alive.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lance_adapters::http::FakeSyncthingClient;
    use lance_core::{FakeClock, Folder, FolderId};
    use serde_json::json;
    use std::sync::Arc as StdArc;

    #[tokio::test]
    async fn rescan_grants_access_by_pushing_folder_devices() {
        let dir = tempfile::tempdir().unwrap();
        let client = StdArc::new(FakeSyncthingClient::new());
        let (bus, _rx) = crate::event_bus::channel();
        let mut handler = SyncthingHandler::new(
            StdArc::clone(&client),
            FakeClock::new(0),
            bus,
            dir.path().to_path_buf(),
            DeviceId::new("me"),
        );
        handler.bootstrap_as_server(0).unwrap();
        handler
            .add_folder(
                Some(FolderId::new("f1")),
                "shot01-lighting".into(),
                None,
                BTreeSet::new(),
                json!({
                    "__ProjectManager_data__": {
                        "type": "shotpart",
                        "project": "proj-a",
                        "shotid": "sh01",
                        "shotpartid": "lighting",
                    }
                }),
            )
            .await
            .unwrap();
        let (syncthing, _join) = crate::worker::spawn(handler, 8);

        let mut alice = User::new(UserId::new("alice"), "Alice");
        alice.devices.insert(DeviceId::new("alice-laptop"));
        alice.grant(ShotId::new("sh01"), ShotPartId::new("lighting"));

        let mut state = ProjectManagerState {
            name: ProjectName::new("proj-a"),
            view: ProjectView::default(),
            users: vec![alice],
            settings_folder_path: None,
            syncthing,
        };
        state.rescan(false).await.unwrap();

        let folders: AsyncHandle<Vec<Folder>, SyncthingError> =
            state.syncthing.call(|h| Box::pin(async move { Ok::<_, SyncthingError>(h.get_folders()) }));
        let folders = folders.wait().await.unwrap();
        let folder = folders.into_iter().find(|f| f.id == FolderId::new("f1")).unwrap();
        assert!(folder.devices.contains(&DeviceId::new("alice-laptop")));
    }

    #[tokio::test]
    async fn add_user_then_add_shot_grants_access_through_public_api() {
        let dir = tempfile::tempdir().unwrap();
        let client = StdArc::new(FakeSyncthingClient::new());
        let (bus, _rx) = crate::event_bus::channel();
        let mut handler = SyncthingHandler::new(
            StdArc::clone(&client),
            FakeClock::new(0),
            bus,
            dir.path().to_path_buf(),
            DeviceId::new("me"),
        );
        handler.bootstrap_as_server(0).unwrap();

        let settings_path = dir.path().join("proj-a-configuration");
        std::fs::create_dir_all(&settings_path).unwrap();
        let seed = lance_storage::ProjectConfigDocument::new(ProjectName::new("proj-a"), BTreeSet::new(), Vec::new());
        seed.save(&settings_path).unwrap();
        handler
            .add_folder(
                None,
                "proj-a-configuration".into(),
                Some(settings_path),
                BTreeSet::new(),
                json!({ "type": "server.configuration", "project": "proj-a" }),
            )
            .await
            .unwrap();
        let (syncthing, _join) = crate::worker::spawn(handler, 8);

        let manager = ProjectManager::spawn(ProjectName::new("proj-a"), syncthing.clone());

        manager
            .add_user(
                UserId::new("alice"),
                "Alice".into(),
                BTreeSet::from([DeviceId::new("alice-laptop")]),
                BTreeSet::from([(ShotId::new("sh01"), ShotPartId::new("lighting"))]),
            )
            .await
            .unwrap();

        let users = manager.get_users().await.unwrap();
        assert_eq!(users.len(), 1);

        let folder_id = manager
            .add_shot(ShotId::new("sh01"), ShotPartId::new("lighting"), None)
            .await
            .unwrap();

        let folders: AsyncHandle<Vec<Folder>, SyncthingError> =
            syncthing.call(|h| Box::pin(async move { Ok::<_, SyncthingError>(h.get_folders()) }));
        let folders = folders.wait().await.unwrap();
        let folder = folders.into_iter().find(|f| f.id == folder_id).unwrap();
        assert!(folder.devices.contains(&DeviceId::new("alice-laptop")));

        let shots = manager.get_shots().await.unwrap();
        assert_eq!(shots.len(), 1);
    }

    #[tokio::test]
    async fn remove_user_drops_their_access_on_next_rescan() {
        let dir = tempfile::tempdir().unwrap();
        let client = StdArc::new(FakeSyncthingClient::new());
        let (bus, _rx) = crate::event_bus::channel();
        let mut handler = SyncthingHandler::new(
            StdArc::clone(&client),
            FakeClock::new(0),
            bus,
            dir.path().to_path_buf(),
            DeviceId::new("me"),
        );
        handler.bootstrap_as_server(0).unwrap();

        let settings_path = dir.path().join("proj-a-configuration");
        std::fs::create_dir_all(&settings_path).unwrap();
        let seed = lance_storage::ProjectConfigDocument::new(ProjectName::new("proj-a"), BTreeSet::new(), Vec::new());
        seed.save(&settings_path).unwrap();
        handler
            .add_folder(
                None,
                "proj-a-configuration".into(),
                Some(settings_path),
                BTreeSet::new(),
                json!({ "type": "server.configuration", "project": "proj-a" }),
            )
            .await
            .unwrap();
        let (syncthing, _join) = crate::worker::spawn(handler, 8);
        let manager = ProjectManager::spawn(ProjectName::new("proj-a"), syncthing.clone());

        manager
            .add_user(
                UserId::new("alice"),
                "Alice".into(),
                BTreeSet::from([DeviceId::new("alice-laptop")]),
                BTreeSet::from([(ShotId::new("sh01"), ShotPartId::new("lighting"))]),
            )
            .await
            .unwrap();
        let folder_id = manager
            .add_shot(ShotId::new("sh01"), ShotPartId::new("lighting"), None)
            .await
            .unwrap();

        manager.remove_user(UserId::new("alice")).await.unwrap();

        let folders: AsyncHandle<Vec<Folder>, SyncthingError> =
            syncthing.call(|h| Box::pin(async move { Ok::<_, SyncthingError>(h.get_folders()) }));
        let folders = folders.wait().await.unwrap();
        let folder = folders.into_iter().find(|f| f.id == folder_id).unwrap();
        assert!(!folder.devices.contains(&DeviceId::new("alice-laptop")));
    }
}
