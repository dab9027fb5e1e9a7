//! Polling Module
//!
//! The suggestion-then-vote poll lifecycle: duration parsing, the
//! suggestion and vote stores, the ballot, countdowns, result aggregation
//! and the phase controller that ties them together.

pub mod ballot;
pub mod config;
pub mod countdown;
pub mod duration;
pub mod engine;
pub mod error;
pub mod results;
pub mod suggestions;
pub mod votes;

pub use ballot::{parse_choice_id, Ballot, BallotEntry, VOTE_ID_PREFIX};
pub use config::PollSettings;
pub use duration::{format_duration, format_remaining, parse_duration, DurationError};
pub use engine::{CycleStatus, Phase, PollController, PollSession};
pub use error::{ErrorKind, PhaseKind, PollError, PollResult};
pub use results::{aggregate, Outcome, PollResults, ResultRow, ResultsReport};
pub use suggestions::{Suggestion, SuggestionStore};
pub use votes::VoteStore;
