//! Poll Configuration
//!
//! Limits and policies applied to a poll cycle.

use super::countdown::MAX_STEPS;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Poll policy settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollSettings {
    /// Maximum number of suggestions in one cycle
    #[serde(default = "default_max_suggestions")]
    pub max_suggestions: usize,
    /// Maximum number of suggestions a single user may own
    #[serde(default = "default_per_user")]
    pub max_suggestions_per_user: usize,
    /// Maximum number of distinct suggestions a single user may vote for
    #[serde(default = "default_per_user")]
    pub max_votes_per_user: usize,
    /// Maximum suggestion length in characters (button labels are capped)
    #[serde(default = "default_max_suggestion_len")]
    pub max_suggestion_len: usize,
    /// Reject votes for a suggestion the voter submitted
    #[serde(default)]
    pub forbid_self_vote: bool,
    /// Phases longer than this get evenly spaced reminders instead of one
    #[serde(default = "default_countdown_threshold_secs")]
    pub countdown_threshold_secs: u64,
    /// Number of evenly spaced countdown points for long phases
    #[serde(default = "default_countdown_steps")]
    pub countdown_steps: u32,
}

fn default_max_suggestions() -> usize {
    100
}

fn default_per_user() -> usize {
    3
}

fn default_max_suggestion_len() -> usize {
    80
}

fn default_countdown_threshold_secs() -> u64 {
    50 * 60
}

fn default_countdown_steps() -> u32 {
    10
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            max_suggestions: default_max_suggestions(),
            max_suggestions_per_user: default_per_user(),
            max_votes_per_user: default_per_user(),
            max_suggestion_len: default_max_suggestion_len(),
            forbid_self_vote: false,
            countdown_threshold_secs: default_countdown_threshold_secs(),
            countdown_steps: default_countdown_steps(),
        }
    }
}

impl PollSettings {
    /// Set the global suggestion cap
    pub fn with_max_suggestions(mut self, max: usize) -> Self {
        self.max_suggestions = max;
        self
    }

    /// Set the per-user suggestion cap
    pub fn with_max_suggestions_per_user(mut self, max: usize) -> Self {
        self.max_suggestions_per_user = max;
        self
    }

    /// Set the per-user vote cap
    pub fn with_max_votes_per_user(mut self, max: usize) -> Self {
        self.max_votes_per_user = max;
        self
    }

    /// Enable or disable the self-vote exclusion
    pub fn forbid_self_vote(mut self, forbid: bool) -> Self {
        self.forbid_self_vote = forbid;
        self
    }

    /// Countdown threshold as a [`Duration`]
    pub fn countdown_threshold(&self) -> Duration {
        Duration::from_secs(self.countdown_threshold_secs)
    }

    /// Validate the settings
    pub fn validate(&self) -> Result<(), String> {
        if self.max_suggestions == 0 {
            return Err("maxSuggestions must be at least 1".to_string());
        }
        if self.max_suggestions_per_user == 0 {
            return Err("maxSuggestionsPerUser must be at least 1".to_string());
        }
        if self.max_votes_per_user == 0 {
            return Err("maxVotesPerUser must be at least 1".to_string());
        }
        if self.max_suggestion_len == 0 {
            return Err("maxSuggestionLen must be at least 1".to_string());
        }
        if !(2..=MAX_STEPS).contains(&self.countdown_steps) {
            return Err(format!("countdownSteps must be between 2 and {}", MAX_STEPS));
        }
        Ok(())
    }
}
