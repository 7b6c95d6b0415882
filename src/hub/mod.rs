//! Hub access
//!
//! Everything that talks to the home-automation hub lives here. The analysis
//! engine never sees connection state; it only receives [`HubSnapshot`]s
//! produced by a [`SnapshotSource`].

pub mod client;
pub mod types;

pub use client::HubClient;
pub use types::{DeviceInfo, HubInfo, HubSnapshot, IntegrationInfo, RawEntityState, Registry};

use crate::errors::Result;
use async_trait::async_trait;

/// Something that can produce a fresh snapshot of hub state
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    /// Fetch one complete snapshot
    async fn fetch_snapshot(&self) -> Result<HubSnapshot>;

    /// Short name used in logs
    fn describe(&self) -> String;
}

/// Serves a fixed snapshot (exported diagnostics, tests)
#[derive(Debug, Clone)]
pub struct StaticSource {
    snapshot: HubSnapshot,
}

impl StaticSource {
    pub fn new(snapshot: HubSnapshot) -> Self {
        Self { snapshot }
    }
}

#[async_trait]
impl SnapshotSource for StaticSource {
    async fn fetch_snapshot(&self) -> Result<HubSnapshot> {
        Ok(self.snapshot.clone())
    }

    fn describe(&self) -> String {
        format!("static snapshot ({} entities)", self.snapshot.entities.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_static_source_returns_snapshot() {
        let snapshot = HubSnapshot::from_states(vec![json!({"entity_id": "light.a", "state": "on"})]);
        let source = StaticSource::new(snapshot.clone());

        let fetched = tokio_test::block_on(source.fetch_snapshot()).unwrap();
        assert_eq!(fetched, snapshot);
        assert!(source.describe().contains("1 entities"));
    }
}
