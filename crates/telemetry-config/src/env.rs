//! Environment variable handling.

use crate::types::TelemetryConfig;
use std::env;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Environment variable errors.
#[derive(Debug, Error)]
pub enum EnvError {
    #[error("invalid value for {var}: {message}")]
    InvalidValue { var: String, message: String },

    #[error("failed to load {}: {message}", .path.display())]
    DotEnv { path: PathBuf, message: String },
}

/// Environment variable names.
pub mod vars {
    pub const TELEMETRY_DB_PATH: &str = "TELEMETRY_DB_PATH";
    pub const TELEMETRY_QUERY_TIMEOUT_SECS: &str = "TELEMETRY_QUERY_TIMEOUT_SECS";
    pub const TELEMETRY_LOG_LEVEL: &str = "TELEMETRY_LOG_LEVEL";
    pub const TELEMETRY_LOG_FORMAT: &str = "TELEMETRY_LOG_FORMAT";
}

/// Dotenv files read from the project directory, highest precedence first.
pub const DOTENV_FILES: [&str; 2] = [".env.local", ".env"];

/// Load `.env.local` then `.env` from `dir` into the process environment.
///
/// Variables already set are never overwritten, so `.env.local` wins over
/// `.env` and the real environment wins over both. Missing files are
/// skipped.
pub fn load_dotenv(dir: &Path) -> Result<(), EnvError> {
    for name in DOTENV_FILES {
        let path = dir.join(name);
        match dotenvy::from_path(&path) {
            Ok(()) => {}
            Err(dotenvy::Error::Io(e)) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(EnvError::DotEnv {
                    path,
                    message: e.to_string(),
                })
            }
        }
    }
    Ok(())
}

/// Apply `TELEMETRY_*` overrides from the process environment.
pub fn apply_env_overrides(config: &mut TelemetryConfig) -> Result<(), EnvError> {
    apply_overrides_from(config, |var| env::var(var).ok())
}

/// Apply overrides using `lookup` to resolve variable names.
pub fn apply_overrides_from<F>(config: &mut TelemetryConfig, lookup: F) -> Result<(), EnvError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(path) = lookup(vars::TELEMETRY_DB_PATH) {
        config.database.path = Some(PathBuf::from(path));
    }

    if let Some(secs) = lookup(vars::TELEMETRY_QUERY_TIMEOUT_SECS) {
        config.query_timeouts.default_secs =
            secs.trim().parse().map_err(|_| EnvError::InvalidValue {
                var: vars::TELEMETRY_QUERY_TIMEOUT_SECS.to_string(),
                message: "expected integer".to_string(),
            })?;
    }

    if let Some(level) = lookup(vars::TELEMETRY_LOG_LEVEL) {
        config.logging.level = level;
    }

    if let Some(format) = lookup(vars::TELEMETRY_LOG_FORMAT) {
        config.logging.format = format;
    }

    Ok(())
}
