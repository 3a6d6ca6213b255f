//! Configuration file loading and parsing.

use crate::env::{apply_env_overrides, load_dotenv, EnvError};
use crate::types::TelemetryConfig;
use regex::Regex;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Config loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {source}")]
    ReadError {
        #[from]
        source: std::io::Error,
    },

    #[error("invalid YAML at line {}: {message}", line.map(|l| l.to_string()).unwrap_or_else(|| "unknown".to_string()))]
    ParseError { line: Option<usize>, message: String },

    #[error("validation error: {message}")]
    ValidationError { message: String },

    #[error("environment variable not found: {var}")]
    EnvVarNotFound { var: String },

    #[error(transparent)]
    Env(#[from] EnvError),
}

/// Location of the config file relative to the project directory.
pub const CONFIG_FILE: &str = ".telemetry/config.yaml";

/// Configuration loader.
pub struct ConfigLoader {
    base_path: PathBuf,
}

impl ConfigLoader {
    /// Create a loader for the given project directory.
    pub fn new(project_dir: impl AsRef<Path>) -> Self {
        Self {
            base_path: project_dir.as_ref().to_path_buf(),
        }
    }

    /// Load configuration, falling back to defaults when no file exists.
    ///
    /// Dotenv files in the project directory are loaded first, so the YAML
    /// can reference their variables. Environment overrides are applied after
    /// the file is parsed.
    pub fn load(&self) -> Result<TelemetryConfig, ConfigError> {
        load_dotenv(&self.base_path)?;
        let config_path = self.base_path.join(CONFIG_FILE);

        let mut config = if config_path.exists() {
            let contents = std::fs::read_to_string(&config_path)?;
            self.parse(&contents)?
        } else {
            TelemetryConfig::default()
        };

        apply_env_overrides(&mut config)?;
        self.validate(&config)?;
        Ok(config)
    }

    /// Parse YAML text after expanding environment references.
    pub fn parse(&self, contents: &str) -> Result<TelemetryConfig, ConfigError> {
        let expanded = self.expand_env_vars(contents)?;
        serde_yaml::from_str(&expanded).map_err(|e| ConfigError::ParseError {
            line: e.location().map(|l| l.line()),
            message: e.to_string(),
        })
    }

    /// Expand environment variables in the form `${VAR}` or `${VAR:-default}`.
    fn expand_env_vars(&self, content: &str) -> Result<String, ConfigError> {
        let re = Regex::new(r"\$\{([^}:]+)(?::-([^}]*))?\}").map_err(|e| {
            ConfigError::ParseError {
                line: None,
                message: e.to_string(),
            }
        })?;

        let mut result = content.to_string();
        for cap in re.captures_iter(content) {
            let full_match = &cap[0];
            let var_name = &cap[1];
            let default = cap.get(2).map(|m| m.as_str());

            let value = match std::env::var(var_name) {
                Ok(v) => v,
                Err(_) => match default {
                    Some(d) => d.to_string(),
                    None => {
                        return Err(ConfigError::EnvVarNotFound {
                            var: var_name.to_string(),
                        })
                    }
                },
            };

            result = result.replace(full_match, &value);
        }

        Ok(result)
    }

    /// Validate configuration values.
    fn validate(&self, config: &TelemetryConfig) -> Result<(), ConfigError> {
        if config.query_timeouts.default_secs == 0 {
            return Err(ConfigError::ValidationError {
                message: "query_timeouts.default_secs must be greater than 0".to_string(),
            });
        }

        if let Some((name, _)) = config
            .query_timeouts
            .profiles
            .iter()
            .find(|(_, secs)| **secs == 0)
        {
            return Err(ConfigError::ValidationError {
                message: format!("query_timeouts.profiles.{name} must be greater than 0"),
            });
        }

        Ok(())
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new(std::env::current_dir().unwrap_or_default())
    }
}
