//! Configuration types.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Audit database settings.
    pub database: DatabaseConfig,
    /// Statement timeouts per query profile.
    pub query_timeouts: QueryTimeoutConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
}

/// Audit database settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite database file. An in-memory database is used when unset.
    pub path: Option<PathBuf>,
}

/// Statement timeouts keyed by query profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryTimeoutConfig {
    /// Timeout for unknown or absent profiles, in seconds.
    pub default_secs: u64,
    /// Timeout per named profile, in seconds.
    pub profiles: HashMap<String, u64>,
}

impl Default for QueryTimeoutConfig {
    fn default() -> Self {
        let mut profiles = HashMap::new();
        profiles.insert("default".to_string(), 10);
        profiles.insert("long".to_string(), 60);
        Self {
            default_secs: 10,
            profiles,
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Minimum level (`trace`, `debug`, `info`, `warn`, `error`).
    pub level: String,
    /// Output format (`pretty`, `compact`, `json`).
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}
