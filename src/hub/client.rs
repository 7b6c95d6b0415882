//! Home Assistant REST client
//!
//! Thin, read-only wrapper over the Core API. When running as an add-on
//! requests go through the Supervisor proxy (`http://supervisor/core/api`)
//! with the `SUPERVISOR_TOKEN` as bearer token.

use crate::errors::{DoctorError, Result};
use crate::hub::types::{HubInfo, HubSnapshot, Registry};
use crate::hub::SnapshotSource;
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// HTTP client for the hub's Core API
pub struct HubClient {
    client: Client,
    base_url: String,
    token: String,
    registry: Option<Registry>,
}

impl HubClient {
    /// Create a new hub client
    ///
    /// # Arguments
    /// * `base_url` - Core API base (e.g. `http://supervisor/core/api`)
    /// * `token` - Long-lived or Supervisor bearer token
    /// * `timeout` - Per-request timeout
    pub fn new(base_url: impl Into<String>, token: impl Into<String>, timeout: Duration) -> Result<Self> {
        let token = token.into();
        if token.trim().is_empty() {
            return Err(DoctorError::ConfigError(
                "hub token is empty (did you set homeassistant_api: true for the add-on?)".to_string(),
            ));
        }

        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token,
            registry: None,
        })
    }

    /// Attach registry data to every snapshot this client produces
    pub fn with_registry(mut self, registry: Registry) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.url(path);
        debug!(%url, "hub GET");

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .header("Content-Type", "application/json")
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    DoctorError::HubApiError(format!("Request to {} timed out", url))
                } else {
                    DoctorError::HttpError(e)
                }
            })?;

        if !response.status().is_success() {
            return Err(DoctorError::HubApiError(format!(
                "GET {} returned status: {}",
                path,
                response.status()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| DoctorError::HubApiError(format!("Failed to parse {} response: {}", path, e)))
    }

    /// Hub configuration (version, location, time zone)
    pub async fn get_config(&self) -> Result<HubInfo> {
        self.get_json("/config").await
    }

    /// All entity states, undecoded
    pub async fn get_states(&self) -> Result<Vec<Value>> {
        self.get_json("/states").await
    }
}

#[async_trait]
impl SnapshotSource for HubClient {
    async fn fetch_snapshot(&self) -> Result<HubSnapshot> {
        let hub = self.get_config().await?;
        let states = self.get_states().await?;
        debug!(entities = states.len(), version = ?hub.version, "fetched hub state");

        let mut snapshot = HubSnapshot::from_states(states).with_hub_info(hub);
        if let Some(registry) = &self.registry {
            snapshot = snapshot.with_registry(registry.clone());
        }

        Ok(snapshot)
    }

    fn describe(&self) -> String {
        format!("hub at {}", self.base_url)
    }
}
