//! Error types for HomeOps Doctor
//!
//! Structural failures propagate as `DoctorError`. Bad single-entity data
//! never does: it is absorbed by the classifier as an `UnclassifiableEntity`
//! and only shows up in the report's counts.

use serde::Serialize;
use thiserror::Error;

/// Main error type for the doctor
#[derive(Error, Debug)]
pub enum DoctorError {
    /// The hub returned zero usable entities
    #[error("Hub returned no entities to analyze (is the API reachable and authorized?)")]
    EmptySnapshot,

    /// Invalid configuration, rejected at construction
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Hub API returned something we cannot use
    #[error("Hub API error: {0}")]
    HubApiError(String),

    /// HTTP client errors
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Timeout errors
    #[error("Operation timed out after {duration_ms}ms")]
    Timeout { duration_ms: u64 },
}

/// Result type alias for doctor operations
pub type Result<T> = std::result::Result<T, DoctorError>;

/// A snapshot entry that could not be classified.
///
/// Recoverable: the entity is skipped and counted, analysis continues.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnclassifiableEntity {
    /// Entity id, when the entry had one
    pub entity_id: Option<String>,
    pub reason: String,
}

impl UnclassifiableEntity {
    pub fn new(entity_id: Option<&str>, reason: impl Into<String>) -> Self {
        Self {
            entity_id: entity_id.map(str::to_string),
            reason: reason.into(),
        }
    }
}

impl std::fmt::Display for UnclassifiableEntity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.entity_id {
            Some(id) => write!(f, "{}: {}", id, self.reason),
            None => write!(f, "<no entity_id>: {}", self.reason),
        }
    }
}
