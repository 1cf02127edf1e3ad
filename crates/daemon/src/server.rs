// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The server container (spec.md §4.5): wires the event bus, the
//! sync-daemon handler's worker, the dispatcher, and one [`ProjectManager`]
//! per project discovered in the folder roster.

use std::collections::{BTreeSet, HashMap};
use std::path::PathBuf;
use std::sync::Arc;

use lance_adapters::http::SyncthingClient;
use lance_core::{Clock, Device, Event, Folder, ProjectName};
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::info;

use crate::error::DaemonError;
use crate::event_bus::{self, EventBus};
use crate::processor::{AutoHandlerFactory, Dispatcher, DispatcherAttachHandle, EventProcessor};
use crate::project_manager::ProjectManager;
use crate::syncthing::SyncthingHandler;
use crate::worker::{self, WorkerHandle};

/// Auto-handler (spec.md §4.2, §4.4): spawns a [`ProjectManager`] the first
/// time a `server.configuration` folder names a project this server
/// hasn't seen yet.
struct ProjectManagerAutoHandler<C: SyncthingClient, CK: Clock + Send + 'static> {
    syncthing: WorkerHandle<SyncthingHandler<C, CK>>,
    projects: Arc<Mutex<HashMap<ProjectName, Arc<ProjectManager<C, CK>>>>>,
}

fn project_name_of(folder: &Folder) -> Option<ProjectName> {
    if !folder.is_server_configuration() {
        return None;
    }
    folder
        .metadata
        .get("project")
        .and_then(|v| v.as_str())
        .map(|s| ProjectName::new(s.to_string()))
}

#[async_trait::async_trait]
impl<C: SyncthingClient, CK: Clock + Send + 'static> AutoHandlerFactory
    for ProjectManagerAutoHandler<C, CK>
{
    fn is_init_event(&self, event: &Event) -> bool {
        let Some(folders) = event.folders() else {
            return false;
        };
        folders.iter().any(|f| {
            project_name_of(f)
                .map(|name| !self.projects.lock().contains_key(&name))
                .unwrap_or(false)
        })
    }

    async fn create(&self, event: &Event) -> Result<Arc<dyn EventProcessor>, DaemonError> {
        let folders = event.folders().unwrap_or(&[]);
        let name = folders
            .iter()
            .find_map(project_name_of)
            .ok_or_else(|| DaemonError::UnknownProject("no server.configuration folder in event".into()))?;

        let manager = ProjectManager::spawn(name.clone(), self.syncthing.clone());
        self.projects.lock().insert(name.clone(), Arc::clone(&manager));
        info!(project = %name, "started project manager");
        Ok(manager as Arc<dyn EventProcessor>)
    }
}

/// The running server: a handle to the sync-daemon worker plus the set of
/// project managers it has spawned so far.
pub struct Server<C: SyncthingClient, CK: Clock + Send + 'static> {
    bus: EventBus,
    syncthing: WorkerHandle<SyncthingHandler<C, CK>>,
    dispatcher_attach: DispatcherAttachHandle,
    projects: Arc<Mutex<HashMap<ProjectName, Arc<ProjectManager<C, CK>>>>>,
}

impl<C: SyncthingClient, CK: Clock + Send + 'static> Server<C, CK> {
    /// Build the server container and its dispatcher loop. Returns the
    /// server handle plus the dispatcher's join handle, which the caller
    /// (`lifecycle::startup`) keeps alive for the daemon's lifetime.
    pub fn spawn(
        client: Arc<C>,
        clock: CK,
        data_root: PathBuf,
        my_id: lance_core::DeviceId,
        queue_capacity: usize,
    ) -> (Self, JoinHandle<()>) {
        let (bus, events_rx) = event_bus::channel();
        let handler = SyncthingHandler::new(Arc::clone(&client), clock, bus.clone(), data_root, my_id);
        let (syncthing, _join) = worker::spawn(handler, queue_capacity);

        let projects = Arc::new(Mutex::new(HashMap::new()));
        let auto_handler: Arc<dyn AutoHandlerFactory> = Arc::new(ProjectManagerAutoHandler {
            syncthing: syncthing.clone(),
            projects: Arc::clone(&projects),
        });

        let dispatcher = Dispatcher::new(vec![auto_handler]);
        let dispatcher_attach = dispatcher.attach_handle();
        let dispatcher_join = tokio::spawn(dispatcher.run(events_rx));

        (
            Self {
                bus,
                syncthing,
                dispatcher_attach,
                projects,
            },
            dispatcher_join,
        )
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn syncthing(&self) -> &WorkerHandle<SyncthingHandler<C, CK>> {
        &self.syncthing
    }

    /// Create a new project (spec.md §4.5): mint its `server.configuration`
    /// folder under `local_path`, seed an empty [`lance_storage::ProjectConfigDocument`]
    /// in it, and spawn the project manager that will watch it. Only a
    /// server (spec.md §4.3.1) can host a project this way.
    pub async fn add_project(&self, name: ProjectName, local_path: PathBuf) -> Result<(), DaemonError> {
        if self.projects.lock().contains_key(&name) {
            return Ok(());
        }

        std::fs::create_dir_all(&local_path)?;
        let doc = lance_storage::ProjectConfigDocument::new(name.clone(), BTreeSet::new(), Vec::new());
        doc.save(&local_path)?;

        let metadata = serde_json::json!({ "type": "server.configuration", "project": name.as_str() });
        let label = format!("{}-configuration", name.as_str());
        let path_for_folder = local_path.clone();
        let handle = self.syncthing.call(move |h| {
            Box::pin(async move {
                h.add_folder(None, label, Some(path_for_folder), BTreeSet::new(), metadata).await
            })
        });
        handle.wait().await?;

        let manager = ProjectManager::spawn(name.clone(), self.syncthing.clone());
        self.projects.lock().insert(name.clone(), Arc::clone(&manager));
        self.dispatcher_attach.attach(manager);
        Ok(())
    }

    pub fn project_names(&self) -> Vec<ProjectName> {
        self.projects.lock().keys().cloned().collect()
    }
}

/// Devices known to this server, used by `lance-cli`'s status surface
/// without going through the admin protocol round trip during tests.
pub async fn snapshot_devices<C: SyncthingClient, CK: Clock + Send + 'static>(
    server: &Server<C, CK>,
) -> Result<Vec<Device>, lance_core::SyncthingError> {
    let handle = server
        .syncthing()
        .call(|h| Box::pin(async move { Ok::<_, lance_core::SyncthingError>(h.get_devices()) }));
    handle.wait().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use lance_adapters::http::FakeSyncthingClient;
    use lance_core::{DeviceId, FakeClock};

    #[tokio::test]
    async fn add_project_registers_it_in_project_names() {
        let client = Arc::new(FakeSyncthingClient::new());
        let dir = tempfile::tempdir().unwrap();
        let (server, _join) = Server::spawn(client, FakeClock::new(0), dir.path().to_path_buf(), DeviceId::new("me"), 8);
        let handle = server
            .syncthing()
            .call(|h| Box::pin(async move { h.bootstrap_as_server(0) }));
        handle.wait().await.unwrap();

        server
            .add_project(ProjectName::new("proj-a"), dir.path().join("proj-a"))
            .await
            .unwrap();
        assert_eq!(server.project_names(), vec![ProjectName::new("proj-a")]);
    }

    #[tokio::test]
    async fn bootstrap_then_snapshot_devices_reflects_self() {
        let client = Arc::new(FakeSyncthingClient::new());
        let dir = tempfile::tempdir().unwrap();
        let (server, _join) = Server::spawn(client, FakeClock::new(0), dir.path().to_path_buf(), DeviceId::new("me"), 8);
        let handle = server
            .syncthing()
            .call(|h| Box::pin(async move { h.bootstrap_as_server(0) }));
        handle.wait().await.unwrap();

        let devices = snapshot_devices(&server).await.unwrap();
        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].id, DeviceId::new("me"));
    }
}
