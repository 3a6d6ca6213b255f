//! Statement timeouts keyed by query profile.

use std::collections::HashMap;
use std::time::Duration;
use telemetry_config::QueryTimeoutConfig;

/// Timeout lookup for the query profile reported by the ambient context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryTimeouts {
    default: Duration,
    profiles: HashMap<String, Duration>,
}

impl QueryTimeouts {
    /// Create a table with only a default timeout.
    pub fn new(default: Duration) -> Self {
        Self {
            default,
            profiles: HashMap::new(),
        }
    }

    /// Add or replace the timeout for a named profile.
    pub fn with_profile(mut self, name: impl Into<String>, timeout: Duration) -> Self {
        self.profiles.insert(name.into(), timeout);
        self
    }

    /// Build from the `query_timeouts` config section.
    pub fn from_config(config: &QueryTimeoutConfig) -> Self {
        Self {
            default: Duration::from_secs(config.default_secs),
            profiles: config
                .profiles
                .iter()
                .map(|(name, secs)| (name.clone(), Duration::from_secs(*secs)))
                .collect(),
        }
    }

    /// Timeout for `profile`, or the default for unknown/absent profiles.
    pub fn for_profile(&self, profile: Option<&str>) -> Duration {
        profile
            .and_then(|name| self.profiles.get(name))
            .copied()
            .unwrap_or(self.default)
    }
}

impl Default for QueryTimeouts {
    fn default() -> Self {
        Self::from_config(&QueryTimeoutConfig::default())
    }
}
