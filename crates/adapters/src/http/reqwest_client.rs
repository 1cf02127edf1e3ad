// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The real [`SyncthingClient`] implementation, talking to the sync-daemon
//! over its local loopback REST API (spec.md §4.3.1, §6).

use async_trait::async_trait;
use lance_core::SyncthingError;
use reqwest::{Client, StatusCode};
use std::time::Duration;

use super::native_config::NativeConfig;
use super::rest::{DbStatus, SyncthingClient, SyncthingEvent};

const EVENTS_LONG_POLL_TIMEOUT: Duration = Duration::from_secs(65);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone)]
pub struct ReqwestSyncthingClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl ReqwestSyncthingClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            client,
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn map_transport(err: reqwest::Error) -> SyncthingError {
        if err.is_connect() || err.is_timeout() {
            SyncthingError::NotReady(err.to_string())
        } else {
            SyncthingError::Transport(err.to_string())
        }
    }

    async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response, SyncthingError> {
        match resp.status() {
            StatusCode::OK => Ok(resp),
            StatusCode::SERVICE_UNAVAILABLE => Err(SyncthingError::NotReady(
                "sync daemon returned 503".to_string(),
            )),
            status => {
                let body = resp.text().await.unwrap_or_default();
                Err(SyncthingError::Transport(format!(
                    "unexpected status {status}: {body}"
                )))
            }
        }
    }
}

#[async_trait]
impl SyncthingClient for ReqwestSyncthingClient {
    async fn events(&self, since: u64) -> Result<Vec<SyncthingEvent>, SyncthingError> {
        let resp = self
            .client
            .get(self.url("/rest/events"))
            .query(&[("since", since.to_string())])
            .header("X-API-Key", &self.api_key)
            .timeout(EVENTS_LONG_POLL_TIMEOUT)
            .send()
            .await
            .map_err(Self::map_transport)?;
        let resp = Self::check_status(resp).await?;
        resp.json()
            .await
            .map_err(|e| SyncthingError::Transport(e.to_string()))
    }

    async fn get_config(&self) -> Result<NativeConfig, SyncthingError> {
        let resp = self
            .client
            .get(self.url("/rest/system/config"))
            .header("X-API-Key", &self.api_key)
            .send()
            .await
            .map_err(Self::map_transport)?;
        let resp = Self::check_status(resp).await?;
        resp.json()
            .await
            .map_err(|e| SyncthingError::Transport(e.to_string()))
    }

    async fn set_config(&self, config: &NativeConfig) -> Result<(), SyncthingError> {
        let resp = self
            .client
            .post(self.url("/rest/system/config"))
            .header("X-API-Key", &self.api_key)
            .json(config)
            .send()
            .await
            .map_err(Self::map_transport)?;
        Self::check_status(resp).await?;
        Ok(())
    }

    async fn restart(&self) -> Result<(), SyncthingError> {
        let resp = self
            .client
            .post(self.url("/rest/system/restart"))
            .header("X-API-Key", &self.api_key)
            .send()
            .await
            .map_err(Self::map_transport)?;
        Self::check_status(resp).await?;
        Ok(())
    }

    async fn db_status(&self, folder_id: &str) -> Result<DbStatus, SyncthingError> {
        let resp = self
            .client
            .get(self.url("/rest/db/status"))
            .query(&[("folder", folder_id)])
            .header("X-API-Key", &self.api_key)
            .send()
            .await
            .map_err(Self::map_transport)?;
        let resp = Self::check_status(resp).await?;
        resp.json()
            .await
            .map_err(|e| SyncthingError::Transport(e.to_string()))
    }

    async fn scan(&self, folder_id: &str) -> Result<(), SyncthingError> {
        let resp = self
            .client
            .post(self.url("/rest/db/scan"))
            .query(&[("folder", folder_id)])
            .header("X-API-Key", &self.api_key)
            .send()
            .await
            .map_err(Self::map_transport)?;
        Self::check_status(resp).await?;
        Ok(())
    }

    async fn pause_device(&self, device_id: &str) -> Result<(), SyncthingError> {
        let resp = self
            .client
            .post(self.url("/rest/system/pause"))
            .query(&[("device", device_id)])
            .header("X-API-Key", &self.api_key)
            .send()
            .await
            .map_err(Self::map_transport)?;
        Self::check_status(resp).await?;
        Ok(())
    }

    async fn resume_device(&self, device_id: &str) -> Result<(), SyncthingError> {
        let resp = self
            .client
            .post(self.url("/rest/system/resume"))
            .query(&[("device", device_id)])
            .header("X-API-Key", &self.api_key)
            .send()
            .await
            .map_err(Self::map_transport)?;
        Self::check_status(resp).await?;
        Ok(())
    }

    async fn ping(&self) -> Result<(), SyncthingError> {
        self.get_config().await.map(|_| ())
    }
}
