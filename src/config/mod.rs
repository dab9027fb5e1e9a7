//! Configuration
//!
//! The bot reads a single JSON5 file. A missing file is not an error: every
//! section has defaults.

pub mod schema;
pub mod types;

pub use schema::generate_config_schema;
pub use types::{BotConfig, BotSection, StorageConfig, ValidationError};

use std::path::{Path, PathBuf};

/// Environment variable that overrides the config file location
pub const CONFIG_PATH_ENV: &str = "BALLOTBOX_CONFIG_PATH";

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("invalid configuration: {}", format_errors(.0))]
    Invalid(Vec<ValidationError>),
}

fn format_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Resolve the config file path: `BALLOTBOX_CONFIG_PATH`, else
/// `<config dir>/ballotbox/ballotbox.json5`
pub fn get_config_path() -> PathBuf {
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("ballotbox")
        .join("ballotbox.json5")
}

/// Load the configuration from the resolved path
pub fn load_config() -> Result<BotConfig, ConfigError> {
    load_config_from(&get_config_path())
}

/// Load the configuration from `path`. A missing file yields defaults.
pub fn load_config_from(path: &Path) -> Result<BotConfig, ConfigError> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(BotConfig::default());
        }
        Err(source) => {
            return Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    parse_config(&raw).map_err(|e| match e {
        ConfigError::Parse { message, .. } => ConfigError::Parse {
            path: path.to_path_buf(),
            message,
        },
        other => other,
    })
}

/// Parse and validate a JSON5 document
pub fn parse_config(raw: &str) -> Result<BotConfig, ConfigError> {
    let config: BotConfig = json5::from_str(raw).map_err(|e| ConfigError::Parse {
        path: PathBuf::new(),
        message: e.to_string(),
    })?;
    config.validate().map_err(ConfigError::Invalid)?;
    Ok(config)
}
