//! Snapshot and registry files
//!
//! `analyze` accepts either a full snapshot object (as exported by
//! `report --format json` tooling) or a bare `/api/states` array.

use crate::errors::{DoctorError, Result};
use crate::hub::{HubSnapshot, Registry};
use serde_json::Value;
use std::path::Path;

/// Load a snapshot file: `{"entities": [...], ...}` or a bare states array
pub fn load_snapshot(path: &Path) -> Result<HubSnapshot> {
    let value = read_json(path)?;

    match value {
        Value::Array(states) => Ok(HubSnapshot::from_states(states)),
        Value::Object(_) => Ok(serde_json::from_value(value)?),
        _ => Err(DoctorError::HubApiError(format!(
            "{}: expected a snapshot object or a states array",
            path.display()
        ))),
    }
}

/// Load a registry export: `{"devices": [...], "integrations": [...]}`
pub fn load_registry(path: &Path) -> Result<Registry> {
    Ok(serde_json::from_value(read_json(path)?)?)
}

fn read_json(path: &Path) -> Result<Value> {
    let contents = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&contents)?)
}
