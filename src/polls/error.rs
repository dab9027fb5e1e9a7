//! Poll Errors
//!
//! Every rejection the poll lifecycle can produce. The `Display` text is the
//! reply shown to the user who triggered it.

use super::duration::DurationError;
use serde::{Deserialize, Serialize};

/// Which of the two timed phases an operation refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseKind {
    /// Free-text suggestion collection
    Suggestions,
    /// Button voting over the collected suggestions
    Voting,
}

impl PhaseKind {
    /// Capitalized label used at the start of notifications
    pub fn title(&self) -> &'static str {
        match self {
            Self::Suggestions => "Suggestion",
            Self::Voting => "Voting",
        }
    }
}

impl std::fmt::Display for PhaseKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Suggestions => write!(f, "suggestion"),
            Self::Voting => write!(f, "voting"),
        }
    }
}

/// Broad class of a [`PollError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The request itself was invalid (bad duration, duplicate text, quota...)
    UserInput,
    /// The request was well-formed but conflicts with the current phase
    StateConflict,
}

/// Errors returned by poll operations. None of them mutate state.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PollError {
    #[error("Invalid time format ({0}). Use `xxdxxhxxm`, e.g. `1h30m`.")]
    InvalidDuration(#[from] DurationError),

    #[error("Suggestions cannot be empty.")]
    EmptySuggestion,

    #[error("Suggestions are limited to {max} characters.")]
    SuggestionTooLong { max: usize },

    #[error("This suggestion already exists: {0}")]
    DuplicateSuggestion(String),

    #[error("The maximum number of suggestions ({max}) has been reached.")]
    SuggestionCapacityExceeded { max: usize },

    #[error("You can only submit up to {max} suggestions.")]
    SubmitterQuotaExceeded { max: usize },

    #[error("You have already voted for {0}.")]
    AlreadyVotedForThis(String),

    #[error("You can only vote for up to {max} suggestions.")]
    VoterQuotaExceeded { max: usize },

    #[error("This voting option is no longer available.")]
    UnknownSuggestion,

    #[error("You cannot vote for your own suggestion.")]
    SelfVoteForbidden,

    #[error("Invalid format: \"{0}\". Use \"Suggestion - Username\".")]
    MalformedPredefinedLine(String),

    #[error("A {0} period is already active.")]
    AlreadyActive(PhaseKind),

    #[error("No active {0} period to stop.")]
    NothingActive(PhaseKind),

    #[error("No combined poll is running.")]
    NoCombinedActive,

    #[error("Suggest channel is not set. Use `!set-suggest-channel` first.")]
    NoChannelConfigured,

    #[error("There are no suggestions to vote on.")]
    NoSuggestions,

    #[error("Suggestions are not being collected right now.")]
    SuggestionsClosed,

    #[error("Voting is not open right now.")]
    VotingClosed,

    #[error("The last poll has finished. Start a new suggestion period or `!reset` first.")]
    CycleClosed,
}

impl PollError {
    /// Classify the error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidDuration(_)
            | Self::EmptySuggestion
            | Self::SuggestionTooLong { .. }
            | Self::DuplicateSuggestion(_)
            | Self::SuggestionCapacityExceeded { .. }
            | Self::SubmitterQuotaExceeded { .. }
            | Self::AlreadyVotedForThis(_)
            | Self::VoterQuotaExceeded { .. }
            | Self::UnknownSuggestion
            | Self::SelfVoteForbidden
            | Self::MalformedPredefinedLine(_) => ErrorKind::UserInput,
            Self::AlreadyActive(_)
            | Self::NothingActive(_)
            | Self::NoCombinedActive
            | Self::NoChannelConfigured
            | Self::NoSuggestions
            | Self::SuggestionsClosed
            | Self::VotingClosed
            | Self::CycleClosed => ErrorKind::StateConflict,
        }
    }
}

/// Result type for poll operations
pub type PollResult<T> = Result<T, PollError>;
