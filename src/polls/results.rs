//! Results Aggregator
//!
//! First-past-the-post tally with tie detection.

use super::votes::VoteStore;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Vote count for one suggestion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultRow {
    /// Position of the suggestion in submission order
    pub index: usize,
    /// Suggestion text
    pub text: String,
    /// Votes received
    pub votes: u32,
}

/// Who won
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "suggestions", rename_all = "snake_case")]
pub enum Outcome {
    /// A single suggestion has the most votes
    Winner(String),
    /// Several suggestions share the most votes, in submission order
    Tie(Vec<String>),
}

/// Sorted tally of a voting phase
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollResults {
    /// Rows sorted by votes descending, then submission order
    pub rows: Vec<ResultRow>,
    /// Winner or tie
    pub outcome: Outcome,
    /// Total votes cast
    pub total_votes: usize,
    /// Distinct voters
    pub voters: usize,
    /// When the tally was computed
    pub generated_at: DateTime<Utc>,
}

/// Result of aggregation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResultsReport {
    /// Nobody voted; there is nothing to tally
    NoVotesRecorded,
    /// A full tally
    Tally(PollResults),
}

/// Tally `votes` over `universe` (suggestion texts in submission order)
pub fn aggregate(universe: &[String], votes: &VoteStore) -> ResultsReport {
    if votes.is_empty() || universe.is_empty() {
        return ResultsReport::NoVotesRecorded;
    }

    let mut rows: Vec<ResultRow> = votes
        .tally(universe)
        .into_iter()
        .enumerate()
        .map(|(index, (text, votes))| ResultRow { index, text, votes })
        .collect();
    rows.sort_by(|a, b| b.votes.cmp(&a.votes).then(a.index.cmp(&b.index)));

    let max = rows.first().map(|r| r.votes).unwrap_or(0);
    let mut leaders: Vec<String> = rows
        .iter()
        .take_while(|r| r.votes == max)
        .map(|r| r.text.clone())
        .collect();
    let outcome = if leaders.len() > 1 {
        Outcome::Tie(leaders)
    } else {
        Outcome::Winner(leaders.remove(0))
    };

    ResultsReport::Tally(PollResults {
        rows,
        outcome,
        total_votes: votes.total_votes(),
        voters: votes.voter_count(),
        generated_at: Utc::now(),
    })
}

impl ResultsReport {
    /// Render the report for the suggest channel
    pub fn render(&self) -> String {
        match self {
            Self::NoVotesRecorded => "No votes have been recorded.".to_string(),
            Self::Tally(results) => results.render(),
        }
    }

    /// The tally, if any
    pub fn results(&self) -> Option<&PollResults> {
        match self {
            Self::NoVotesRecorded => None,
            Self::Tally(results) => Some(results),
        }
    }
}

impl PollResults {
    /// Render the tally as a chat message
    pub fn render(&self) -> String {
        let mut out = String::from("**Poll Results**\n\n");
        for row in &self.rows {
            out.push_str(&format!("- **{}** : {} vote(s)\n", row.text, row.votes));
        }
        match &self.outcome {
            Outcome::Tie(names) => {
                let names: Vec<String> = names.iter().map(|n| format!("**{}**", n)).collect();
                out.push_str(&format!("\nIt's a tie between: {}", names.join(", ")));
            }
            Outcome::Winner(name) => {
                out.push_str(&format!("\nWinner: **{}**", name));
            }
        }
        out
    }
}
