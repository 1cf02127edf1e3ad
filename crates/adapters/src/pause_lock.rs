// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Coalescing pause/resume guard for the sync-daemon's per-device pause
//! API (spec.md §4.3.6: folder reconfiguration pauses the affected device
//! for the duration of the edit). Several callers can want a device paused
//! at once (e.g. overlapping `MethodBatch` reconfigurations); the daemon
//! should only see one pause call and one matching resume call.

use std::collections::HashMap;
use std::sync::Arc;

use lance_core::{DeviceId, SyncthingError};
use parking_lot::Mutex;

use crate::http::SyncthingClient;

struct Counters {
    counts: HashMap<DeviceId, u32>,
}

/// Process-wide pause coordinator for one sync-daemon instance.
#[derive(Clone)]
pub struct SyncthingPauseLock<C: SyncthingClient> {
    client: Arc<C>,
    counters: Arc<Mutex<Counters>>,
}

/// RAII handle: resumes the device once every outstanding guard for it is
/// dropped.
pub struct PauseGuard<C: SyncthingClient> {
    device_id: DeviceId,
    client: Arc<C>,
    counters: Arc<Mutex<Counters>>,
}

impl<C: SyncthingClient> SyncthingPauseLock<C> {
    pub fn new(client: Arc<C>) -> Self {
        Self {
            client,
            counters: Arc::new(Mutex::new(Counters {
                counts: HashMap::new(),
            })),
        }
    }

    /// Pause `device_id`, issuing the REST call only on the 0→1 transition.
    pub async fn pause(&self, device_id: DeviceId) -> Result<PauseGuard<C>, SyncthingError> {
        let should_call = {
            let mut counters = self.counters.lock();
            let count = counters.counts.entry(device_id.clone()).or_insert(0);
            *count += 1;
            *count == 1
        };

        if should_call {
            if let Err(e) = self.client.pause_device(device_id.as_str()).await {
                let mut counters = self.counters.lock();
                if let Some(count) = counters.counts.get_mut(&device_id) {
                    *count -= 1;
                }
                return Err(e);
            }
        }

        Ok(PauseGuard {
            device_id,
            client: Arc::clone(&self.client),
            counters: Arc::clone(&self.counters),
        })
    }
}

impl<C: SyncthingClient> Drop for PauseGuard<C> {
    fn drop(&mut self) {
        let should_resume = {
            let mut counters = self.counters.lock();
            match counters.counts.get_mut(&self.device_id) {
                Some(count) if *count > 1 => {
                    *count -= 1;
                    false
                }
                Some(_) => {
                    counters.counts.remove(&self.device_id);
                    true
                }
                None => false,
            }
        };

        if should_resume {
            let client = Arc::clone(&self.client);
            let device_id = self.device_id.clone();
            tokio::spawn(async move {
                if let Err(e) = client.resume_device(device_id.as_str()).await {
                    tracing::warn!(%device_id, error = %e, "failed to resume device after pause guard drop");
                }
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::FakeSyncthingClient;

    #[tokio::test]
    async fn single_guard_pauses_and_resumes() {
        let fake = Arc::new(FakeSyncthingClient::new());
        let lock = SyncthingPauseLock::new(Arc::clone(&fake));
        let device = DeviceId::new("d1");

        let guard = lock.pause(device.clone()).await.unwrap();
        assert!(fake.is_paused("d1"));
        drop(guard);

        // resume is spawned; give the runtime a tick to run it.
        tokio::task::yield_now().await;
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        assert!(!fake.is_paused("d1"));
    }

    #[tokio::test]
    async fn overlapping_guards_only_resume_after_last_drop() {
        let fake = Arc::new(FakeSyncthingClient::new());
        let lock = SyncthingPauseLock::new(Arc::clone(&fake));
        let device = DeviceId::new("d1");

        let g1 = lock.pause(device.clone()).await.unwrap();
        let g2 = lock.pause(device.clone()).await.unwrap();
        assert!(fake.is_paused("d1"));

        drop(g1);
        tokio::task::yield_now().await;
        assert!(fake.is_paused("d1"), "still held by g2");

        drop(g2);
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        assert!(!fake.is_paused("d1"));
    }
}
