//! Type definitions for hub snapshots
//!
//! A snapshot is everything one poll learned from the hub: the raw
//! `/api/states` array, optional registry data used for causal grouping,
//! and hub metadata from `/api/config`.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;

/// One element of the hub's `/api/states` array.
///
/// Every field is optional so a single malformed entry can be skipped
/// and counted instead of failing the whole snapshot.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RawEntityState {
    #[serde(default)]
    pub entity_id: Option<String>,

    #[serde(default)]
    pub state: Option<String>,

    #[serde(default)]
    pub attributes: Value,

    /// RFC 3339 timestamp of the last state change
    #[serde(default)]
    pub last_changed: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<String>,

    /// Explicit availability flag, when the source provides one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub available: Option<bool>,

    /// Set when the entry could not be decoded at all
    #[serde(skip)]
    pub decode_error: Option<String>,
}

impl RawEntityState {
    /// Decode one `/api/states` element, keeping the failure instead of erroring
    pub fn from_value(value: Value) -> Self {
        match serde_json::from_value::<RawEntityState>(value) {
            Ok(raw) => raw,
            Err(e) => RawEntityState {
                decode_error: Some(e.to_string()),
                ..Default::default()
            },
        }
    }

    /// String attribute lookup
    pub fn attribute_str(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).and_then(Value::as_str)
    }
}

/// A device from the hub's device registry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeviceInfo {
    pub id: String,
    pub name: String,
    /// Entity ids owned by this device
    #[serde(default)]
    pub entities: BTreeSet<String>,
}

/// An integration (config entry) and the entities it provides
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IntegrationInfo {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub entities: BTreeSet<String>,
}

/// Hub metadata from `/api/config`
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct HubInfo {
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub location_name: Option<String>,
    #[serde(default)]
    pub time_zone: Option<String>,
    /// Unit system object as reported by the hub (length, mass, temperature...)
    #[serde(default)]
    pub unit_system: Option<Value>,
}

/// Registry data supplied separately from the states array
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Registry {
    #[serde(default)]
    pub devices: Option<Vec<DeviceInfo>>,
    #[serde(default)]
    pub integrations: Option<Vec<IntegrationInfo>>,
}

/// Everything one poll learned from the hub
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct HubSnapshot {
    #[serde(deserialize_with = "lenient_entities")]
    pub entities: Vec<RawEntityState>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub devices: Option<Vec<DeviceInfo>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub integrations: Option<Vec<IntegrationInfo>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hub: Option<HubInfo>,
}

impl HubSnapshot {
    /// Build a snapshot from a raw `/api/states` array
    pub fn from_states(states: Vec<Value>) -> Self {
        Self {
            entities: states.into_iter().map(RawEntityState::from_value).collect(),
            ..Default::default()
        }
    }

    /// Attach registry data
    pub fn with_registry(mut self, registry: Registry) -> Self {
        self.devices = registry.devices;
        self.integrations = registry.integrations;
        self
    }

    /// Attach hub metadata
    pub fn with_hub_info(mut self, hub: HubInfo) -> Self {
        self.hub = Some(hub);
        self
    }

    /// Same snapshot with all registry data removed
    pub fn without_registry(&self) -> Self {
        Self {
            entities: self.entities.clone(),
            devices: None,
            integrations: None,
            hub: self.hub.clone(),
        }
    }

    pub fn has_registry(&self) -> bool {
        self.devices.as_ref().is_some_and(|d| !d.is_empty())
            || self.integrations.as_ref().is_some_and(|i| !i.is_empty())
    }

    /// Entity counts per domain across the whole snapshot, busiest first
    pub fn domain_counts(&self, limit: usize) -> Vec<(String, usize)> {
        let mut counts = std::collections::BTreeMap::<String, usize>::new();
        for id in self.entities.iter().filter_map(|e| e.entity_id.as_deref()) {
            if let Some((domain, _)) = id.split_once('.') {
                *counts.entry(domain.to_string()).or_default() += 1;
            }
        }

        let mut counts: Vec<(String, usize)> = counts.into_iter().collect();
        counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        counts.truncate(limit);
        counts
    }
}

fn lenient_entities<'de, D>(deserializer: D) -> std::result::Result<Vec<RawEntityState>, D::Error>
where
    D: Deserializer<'de>,
{
    let values = Vec::<Value>::deserialize(deserializer)?;
    Ok(values.into_iter().map(RawEntityState::from_value).collect())
}
