// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory [`SyncthingClient`] double for daemon/engine tests, so the
//! reconciliation and event-ingestion logic can be exercised without a
//! real `syncthing` binary (spec.md §8).

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use lance_core::SyncthingError;
use parking_lot::Mutex;
use std::sync::Arc;

use super::native_config::NativeConfig;
use super::rest::{DbStatus, SyncthingClient, SyncthingEvent};

struct FakeState {
    config: NativeConfig,
    events: Vec<SyncthingEvent>,
    db_status: HashMap<String, DbStatus>,
    paused: HashSet<String>,
    ready: bool,
    restart_count: u32,
    scan_calls: Vec<String>,
}

/// Shared handle to a fake sync-daemon. Clone to hand the same backing
/// state to both the handler under test and the test's assertions.
#[derive(Clone)]
pub struct FakeSyncthingClient {
    inner: Arc<Mutex<FakeState>>,
}

impl Default for FakeSyncthingClient {
    fn default() -> Self {
        Self {
            inner: Arc::new(Mutex::new(FakeState {
                config: NativeConfig::default(),
                events: Vec::new(),
                db_status: HashMap::new(),
                paused: HashSet::new(),
                ready: true,
                restart_count: 0,
                scan_calls: Vec::new(),
            })),
        }
    }
}

impl FakeSyncthingClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_ready(&self, ready: bool) {
        self.inner.lock().ready = ready;
    }

    pub fn push_event(&self, event: SyncthingEvent) {
        self.inner.lock().events.push(event);
    }

    pub fn set_db_status(&self, folder_id: &str, status: DbStatus) {
        self.inner
            .lock()
            .db_status
            .insert(folder_id.to_string(), status);
    }

    pub fn is_paused(&self, device_id: &str) -> bool {
        self.inner.lock().paused.contains(device_id)
    }

    pub fn restart_count(&self) -> u32 {
        self.inner.lock().restart_count
    }

    pub fn scan_calls(&self) -> Vec<String> {
        self.inner.lock().scan_calls.clone()
    }

    pub fn config(&self) -> NativeConfig {
        self.inner.lock().config.clone()
    }
}

#[async_trait]
impl SyncthingClient for FakeSyncthingClient {
    async fn events(&self, since: u64) -> Result<Vec<SyncthingEvent>, SyncthingError> {
        let state = self.inner.lock();
        if !state.ready {
            return Err(SyncthingError::NotReady("fake not ready".to_string()));
        }
        Ok(state
            .events
            .iter()
            .filter(|e| e.id > since)
            .cloned()
            .collect())
    }

    async fn get_config(&self) -> Result<NativeConfig, SyncthingError> {
        let state = self.inner.lock();
        if !state.ready {
            return Err(SyncthingError::NotReady("fake not ready".to_string()));
        }
        Ok(state.config.clone())
    }

    async fn set_config(&self, config: &NativeConfig) -> Result<(), SyncthingError> {
        self.inner.lock().config = config.clone();
        Ok(())
    }

    async fn restart(&self) -> Result<(), SyncthingError> {
        self.inner.lock().restart_count += 1;
        Ok(())
    }

    async fn db_status(&self, folder_id: &str) -> Result<DbStatus, SyncthingError> {
        Ok(self
            .inner
            .lock()
            .db_status
            .get(folder_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn scan(&self, folder_id: &str) -> Result<(), SyncthingError> {
        self.inner.lock().scan_calls.push(folder_id.to_string());
        Ok(())
    }

    async fn pause_device(&self, device_id: &str) -> Result<(), SyncthingError> {
        self.inner.lock().paused.insert(device_id.to_string());
        Ok(())
    }

    async fn resume_device(&self, device_id: &str) -> Result<(), SyncthingError> {
        self.inner.lock().paused.remove(device_id);
        Ok(())
    }

    async fn ping(&self) -> Result<(), SyncthingError> {
        if self.inner.lock().ready {
            Ok(())
        } else {
            Err(SyncthingError::NotReady("fake not ready".to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn not_ready_rejects_calls() {
        let fake = FakeSyncthingClient::new();
        fake.set_ready(false);
        assert!(matches!(
            fake.get_config().await,
            Err(SyncthingError::NotReady(_))
        ));
    }

    #[tokio::test]
    async fn events_filters_by_since() {
        let fake = FakeSyncthingClient::new();
        fake.push_event(SyncthingEvent {
            id: 1,
            event_type: "Ping".into(),
            time: "t".into(),
            data: serde_json::Value::Null,
        });
        fake.push_event(SyncthingEvent {
            id: 2,
            event_type: "Ping".into(),
            time: "t".into(),
            data: serde_json::Value::Null,
        });
        let events = fake.events(1).await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].id, 2);
    }

    #[tokio::test]
    async fn pause_and_resume_toggle_state() {
        let fake = FakeSyncthingClient::new();
        fake.pause_device("dev1").await.unwrap();
        assert!(fake.is_paused("dev1"));
        fake.resume_device("dev1").await.unwrap();
        assert!(!fake.is_paused("dev1"));
    }

    #[tokio::test]
    async fn restart_increments_counter() {
        let fake = FakeSyncthingClient::new();
        fake.restart().await.unwrap();
        fake.restart().await.unwrap();
        assert_eq!(fake.restart_count(), 2);
    }
}
