//! Ballot
//!
//! The immutable `(index, suggestion)` table built when voting opens. Vote
//! buttons carry `vote_{index}` and are resolved only through this table,
//! never through the live suggestion store.

use super::suggestions::Suggestion;
use serde::{Deserialize, Serialize};

/// Prefix of every vote button identifier
pub const VOTE_ID_PREFIX: &str = "vote_";

/// One clickable choice
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BallotEntry {
    /// Zero-based position in the suggestion order at voting start
    pub index: usize,
    /// Suggestion text (button label)
    pub text: String,
    /// Submitter of the suggestion
    pub submitter_id: String,
}

impl BallotEntry {
    /// Identifier embedded in the rendered button
    pub fn choice_id(&self) -> String {
        choice_id(self.index)
    }
}

/// Snapshot of the suggestions offered in one voting phase
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ballot {
    entries: Vec<BallotEntry>,
}

impl Ballot {
    /// Build the table from the suggestion order at this instant
    pub fn snapshot(suggestions: &[Suggestion]) -> Self {
        let entries = suggestions
            .iter()
            .enumerate()
            .map(|(index, s)| BallotEntry {
                index,
                text: s.text.clone(),
                submitter_id: s.submitter_id.clone(),
            })
            .collect();
        Self { entries }
    }

    /// Resolve a choice index
    pub fn get(&self, index: usize) -> Option<&BallotEntry> {
        self.entries.get(index)
    }

    /// All entries in index order
    pub fn entries(&self) -> &[BallotEntry] {
        &self.entries
    }

    /// Suggestion texts in index order (the tally universe)
    pub fn texts(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.text.clone()).collect()
    }

    /// Number of choices
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the ballot has no choices
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Button identifier for a choice index
pub fn choice_id(index: usize) -> String {
    format!("{}{}", VOTE_ID_PREFIX, index)
}

/// Parse a `vote_{index}` identifier
pub fn parse_choice_id(id: &str) -> Option<usize> {
    let digits = id.strip_prefix(VOTE_ID_PREFIX)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_assigns_positional_indices() {
        let ballot = Ballot::snapshot(&[
            Suggestion::new("Pizza", "u1"),
            Suggestion::new("Tacos", "u2"),
        ]);
        assert_eq!(ballot.len(), 2);
        let tacos = ballot.get(1).unwrap();
        assert_eq!(tacos.text, "Tacos");
        assert_eq!(tacos.submitter_id, "u2");
        assert_eq!(tacos.choice_id(), "vote_1");
        assert!(ballot.get(2).is_none());
    }

    #[test]
    fn test_snapshot_is_detached_from_source() {
        let mut source = vec![Suggestion::new("Pizza", "u1")];
        let ballot = Ballot::snapshot(&source);
        source.insert(0, Suggestion::new("Late", "u3"));
        assert_eq!(ballot.get(0).unwrap().text, "Pizza");
    }

    #[test]
    fn test_parse_choice_id() {
        assert_eq!(parse_choice_id("vote_0"), Some(0));
        assert_eq!(parse_choice_id("vote_42"), Some(42));
        assert_eq!(parse_choice_id("vote_"), None);
        assert_eq!(parse_choice_id("vote_-1"), None);
        assert_eq!(parse_choice_id("vote_+1"), None);
        assert_eq!(parse_choice_id("poll_1"), None);
        assert_eq!(parse_choice_id("vote_99999999999999999999999"), None);
    }
}
