//! Configuration management for HomeOps Doctor
//!
//! TOML-based configuration with defaults and validation.
//! Location: ~/.homeops/config.toml

use crate::errors::{DoctorError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Complete configuration for HomeOps Doctor
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub hub: HubConfig,
    pub analysis: AnalysisConfig,
    pub poll: PollConfig,
    pub server: ServerConfig,
}

/// Hub connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HubConfig {
    /// Core API base, the Supervisor proxy when running as an add-on
    pub base_url: String,
    /// Name of the environment variable holding the bearer token
    pub token_env: String,
    pub timeout_secs: u64,
}

/// Analysis engine configuration.
///
/// This is the only part of the configuration the core sees. It is passed
/// to [`crate::analysis::Analyzer::new`], which rejects invalid values.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Domains whose outages matter most (locks, climate, lights...)
    pub critical_domains: BTreeSet<String>,
    /// Critical unavailable entities needed to call the system critical
    pub critical_threshold: usize,
    /// Entity states treated as unavailable
    pub unavailable_states: Vec<String>,
    /// Freshness window for stale detection; `None` disables it
    pub stale_after_secs: Option<u64>,
    /// Domains eligible for stale detection
    pub stale_domains: BTreeSet<String>,
    pub weights: SeverityWeights,
}

/// Severity weighting parameters
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SeverityWeights {
    pub unavailable: u32,
    pub stale: u32,
    pub pending_update: u32,
    /// Added per affected entity beyond the first
    pub per_entity: u32,
    /// Upper bound on entities counted for breadth
    pub breadth_cap: u32,
    /// Applied when an issue touches a critical domain
    pub critical_multiplier: u32,
}

/// Polling configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PollConfig {
    pub interval_secs: u64,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub port: u16,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            base_url: "http://supervisor/core/api".to_string(),
            token_env: "SUPERVISOR_TOKEN".to_string(),
            timeout_secs: 10,
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        let critical_domains = [
            "alarm_control_panel",
            "climate",
            "cover",
            "fan",
            "light",
            "lock",
            "media_player",
            "switch",
        ];

        Self {
            critical_domains: critical_domains.iter().map(|d| d.to_string()).collect(),
            critical_threshold: 5,
            unavailable_states: vec!["unavailable".to_string(), "unknown".to_string()],
            stale_after_secs: None,
            stale_domains: ["binary_sensor", "sensor"]
                .iter()
                .map(|d| d.to_string())
                .collect(),
            weights: SeverityWeights::default(),
        }
    }
}

impl Default for SeverityWeights {
    fn default() -> Self {
        Self {
            unavailable: 100,
            stale: 40,
            pending_update: 10,
            per_entity: 5,
            breadth_cap: 20,
            critical_multiplier: 2,
        }
    }
}

impl Default for PollConfig {
    fn default() -> Self {
        Self { interval_secs: 30 }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        // Ingress add-ons must listen on 8099
        Self {
            bind: "0.0.0.0".to_string(),
            port: 8099,
        }
    }
}

impl Config {
    /// Load configuration from file or use defaults
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        if let Some(config_path) = path {
            Self::load_from_file(&config_path)
        } else {
            Self::load_default()
        }
    }

    /// Load configuration from specific file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| DoctorError::ConfigError(format!("Failed to read config: {}", e)))?;

        let config: Config = toml::from_str(&contents)
            .map_err(|e| DoctorError::ConfigError(format!("Failed to parse config: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Load default configuration from standard location or use built-in defaults
    pub fn load_default() -> Result<Self> {
        if let Some(config_path) = Self::default_path() {
            if config_path.exists() {
                return Self::load_from_file(&config_path);
            }
        }

        Ok(Config::default())
    }

    /// Standard config location
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".homeops").join("config.toml"))
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if !self.hub.base_url.starts_with("http://") && !self.hub.base_url.starts_with("https://") {
            return Err(DoctorError::ConfigError(format!(
                "hub.base_url must be an http(s) URL, got '{}'",
                self.hub.base_url
            )));
        }

        if self.hub.timeout_secs == 0 {
            return Err(DoctorError::ConfigError(
                "hub.timeout_secs must be greater than 0".to_string(),
            ));
        }

        if self.hub.token_env.trim().is_empty() {
            return Err(DoctorError::ConfigError(
                "hub.token_env must name an environment variable".to_string(),
            ));
        }

        if self.poll.interval_secs == 0 {
            return Err(DoctorError::ConfigError(
                "poll.interval_secs must be greater than 0".to_string(),
            ));
        }

        self.analysis.validate()
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| DoctorError::ConfigError(format!("Failed to serialize config: {}", e)))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| DoctorError::ConfigError(format!("Failed to create config dir: {}", e)))?;
        }

        std::fs::write(path, contents)
            .map_err(|e| DoctorError::ConfigError(format!("Failed to write config: {}", e)))?;

        Ok(())
    }

    /// Hub request timeout
    pub fn hub_timeout(&self) -> Duration {
        Duration::from_secs(self.hub.timeout_secs)
    }

    /// Interval between polls
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll.interval_secs)
    }
}

impl AnalysisConfig {
    /// Validate thresholds and weights
    pub fn validate(&self) -> Result<()> {
        let w = &self.weights;

        if w.pending_update == 0 {
            return Err(DoctorError::ConfigError(
                "weights.pending_update must be greater than 0".to_string(),
            ));
        }

        if !(w.unavailable > w.stale && w.stale > w.pending_update) {
            return Err(DoctorError::ConfigError(format!(
                "weights must satisfy unavailable > stale > pending_update (got {} / {} / {})",
                w.unavailable, w.stale, w.pending_update
            )));
        }

        if w.critical_multiplier == 0 {
            return Err(DoctorError::ConfigError(
                "weights.critical_multiplier must be at least 1".to_string(),
            ));
        }

        if self.critical_threshold == 0 {
            return Err(DoctorError::ConfigError(
                "critical_threshold must be greater than 0".to_string(),
            ));
        }

        if self.unavailable_states.iter().all(|s| s.trim().is_empty()) {
            return Err(DoctorError::ConfigError(
                "unavailable_states must list at least one state".to_string(),
            ));
        }

        if self.stale_after_secs == Some(0) {
            return Err(DoctorError::ConfigError(
                "stale_after_secs must be greater than 0 (omit it to disable)".to_string(),
            ));
        }

        Ok(())
    }

    pub fn is_critical(&self, domain: &str) -> bool {
        self.critical_domains.contains(domain)
    }
}
