//! Typed configuration structures
//!
//! Provides strongly-typed access to configuration values with validation
//! and default values.

use crate::logging::LoggingConfig;
use crate::polls::PollSettings;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BotConfig {
    /// Poll limits and policies
    #[serde(default)]
    pub polls: PollSettings,

    /// Snapshot storage
    #[serde(default)]
    pub storage: StorageConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Bot command surface
    #[serde(default)]
    pub bot: BotSection,
}

impl BotConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if let Err(e) = self.polls.validate() {
            errors.push(ValidationError {
                path: "polls".to_string(),
                message: e,
            });
        }

        let prefix = self.bot.command_prefix.trim();
        if prefix.is_empty() || prefix.chars().any(char::is_whitespace) {
            errors.push(ValidationError {
                path: "bot.commandPrefix".to_string(),
                message: "must be a non-empty token without whitespace".to_string(),
            });
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Validation error
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub path: String,
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// Snapshot storage configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageConfig {
    /// Directory holding `suggestions.json`, `votes.json` and `results.json`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
}

impl StorageConfig {
    /// Resolved data directory
    pub fn resolve_data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(default_data_dir)
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("ballotbox")
}

/// Bot command surface configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BotSection {
    /// Prefix of text commands
    #[serde(default = "default_command_prefix")]
    pub command_prefix: String,

    /// Only accept commands from this channel when set
    #[serde(skip_serializing_if = "Option::is_none")]
    pub management_channel: Option<String>,

    /// Suggest channel applied at startup
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggest_channel: Option<String>,
}

impl Default for BotSection {
    fn default() -> Self {
        Self {
            command_prefix: default_command_prefix(),
            management_channel: None,
            suggest_channel: None,
        }
    }
}

fn default_command_prefix() -> String {
    "!".to_string()
}
