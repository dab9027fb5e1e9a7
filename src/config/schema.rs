//! JSON Schema Generation
//!
//! Generates JSON Schema for ballotbox configuration validation.
//! Based on draft-07 of the JSON Schema specification.

use crate::polls::countdown::MAX_STEPS;
use serde_json::json;
use serde_json::Value;

/// Generate the complete JSON schema for ballotbox configuration
pub fn generate_config_schema() -> Value {
    json!({
        "$schema": "http://json-schema.org/draft-07/schema#",
        "title": "Ballotbox Configuration",
        "description": "Configuration schema for the ballotbox poll bot",
        "type": "object",
        "properties": {
            "polls": generate_polls_schema(),
            "storage": generate_storage_schema(),
            "logging": generate_logging_schema(),
            "bot": generate_bot_schema(),
        },
        "additionalProperties": false
    })
}

fn generate_polls_schema() -> Value {
    json!({
        "type": "object",
        "description": "Poll limits and policies",
        "properties": {
            "maxSuggestions": {
                "type": "integer",
                "minimum": 1,
                "description": "Maximum number of suggestions in one cycle",
                "default": 100
            },
            "maxSuggestionsPerUser": {
                "type": "integer",
                "minimum": 1,
                "description": "Maximum number of suggestions one user may submit",
                "default": 3
            },
            "maxVotesPerUser": {
                "type": "integer",
                "minimum": 1,
                "description": "Maximum number of suggestions one user may vote for",
                "default": 3
            },
            "maxSuggestionLen": {
                "type": "integer",
                "minimum": 1,
                "description": "Maximum suggestion length in characters",
                "default": 80
            },
            "forbidSelfVote": {
                "type": "boolean",
                "description": "Reject votes for the voter's own suggestion",
                "default": false
            },
            "countdownThresholdSecs": {
                "type": "integer",
                "minimum": 0,
                "description": "Phases longer than this get evenly spaced reminders",
                "default": 3000
            },
            "countdownSteps": {
                "type": "integer",
                "minimum": 2,
                "maximum": MAX_STEPS,
                "description": "Number of countdown points for long phases",
                "default": 10
            }
        },
        "additionalProperties": false
    })
}

fn generate_storage_schema() -> Value {
    json!({
        "type": "object",
        "description": "Snapshot storage",
        "properties": {
            "dataDir": {
                "type": "string",
                "description": "Directory for suggestion, vote and result snapshots"
            }
        },
        "additionalProperties": false
    })
}

fn generate_logging_schema() -> Value {
    json!({
        "type": "object",
        "description": "Logging configuration",
        "properties": {
            "level": {
                "type": "string",
                "description": "Log filter directive; RUST_LOG takes precedence",
                "default": "info"
            },
            "format": {
                "type": "string",
                "enum": ["text", "json"],
                "description": "Log output format",
                "default": "text"
            }
        },
        "additionalProperties": false
    })
}

fn generate_bot_schema() -> Value {
    json!({
        "type": "object",
        "description": "Bot command surface",
        "properties": {
            "commandPrefix": {
                "type": "string",
                "description": "Prefix of text commands",
                "default": "!"
            },
            "managementChannel": {
                "type": "string",
                "description": "Only accept commands from this channel"
            },
            "suggestChannel": {
                "type": "string",
                "description": "Suggest channel applied at startup"
            }
        },
        "additionalProperties": false
    })
}
