//! Suggestion Store
//!
//! Ordered suggestions for the current cycle. Insertion order is the
//! ballot order and the tie-break order of the results.

use super::config::PollSettings;
use super::error::{PollError, PollResult};
use crate::storage::{load_or_default, persist_best_effort, DynSnapshotStore, SUGGESTIONS_KEY};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A submitted candidate option
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Suggestion {
    /// Trimmed suggestion text
    pub text: String,
    /// User who submitted it
    pub submitter_id: String,
}

impl Suggestion {
    /// Create a suggestion
    pub fn new(text: impl Into<String>, submitter_id: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            submitter_id: submitter_id.into(),
        }
    }
}

fn fold(text: &str) -> String {
    text.to_lowercase()
}

/// Suggestions of the live cycle
#[derive(Debug)]
pub struct SuggestionStore {
    entries: Vec<Suggestion>,
    /// Case-folded texts for duplicate detection
    folded: HashSet<String>,
    settings: PollSettings,
    snapshots: DynSnapshotStore,
}

impl SuggestionStore {
    /// Create an empty store
    pub fn new(settings: PollSettings, snapshots: DynSnapshotStore) -> Self {
        Self {
            entries: Vec::new(),
            folded: HashSet::new(),
            settings,
            snapshots,
        }
    }

    /// Restore the store from its last snapshot.
    ///
    /// Entries that would break the uniqueness invariant are dropped.
    pub fn restore(settings: PollSettings, snapshots: DynSnapshotStore) -> Self {
        let saved: Vec<Suggestion> = load_or_default(snapshots.as_ref(), SUGGESTIONS_KEY);
        let mut store = Self::new(settings, snapshots);
        for suggestion in saved {
            let text = suggestion.text.trim().to_string();
            if text.is_empty() || !store.folded.insert(fold(&text)) {
                tracing::warn!(text = %suggestion.text, "dropping invalid suggestion from snapshot");
                continue;
            }
            store.entries.push(Suggestion::new(text, suggestion.submitter_id));
        }
        store
    }

    /// Submit a suggestion, returning its normalized text
    pub fn submit(&mut self, text: &str, submitter_id: &str) -> PollResult<String> {
        let text = text.trim();
        if text.is_empty() {
            return Err(PollError::EmptySuggestion);
        }
        if text.chars().count() > self.settings.max_suggestion_len {
            return Err(PollError::SuggestionTooLong {
                max: self.settings.max_suggestion_len,
            });
        }
        let folded = fold(text);
        if self.folded.contains(&folded) {
            return Err(PollError::DuplicateSuggestion(text.to_string()));
        }
        if self.entries.len() >= self.settings.max_suggestions {
            return Err(PollError::SuggestionCapacityExceeded {
                max: self.settings.max_suggestions,
            });
        }
        if self.count_by(submitter_id) >= self.settings.max_suggestions_per_user {
            return Err(PollError::SubmitterQuotaExceeded {
                max: self.settings.max_suggestions_per_user,
            });
        }

        self.folded.insert(folded);
        self.entries.push(Suggestion::new(text, submitter_id));
        self.persist();
        Ok(text.to_string())
    }

    /// Replace the whole store with a predefined list.
    ///
    /// The list is validated for emptiness and case-insensitive duplicates
    /// before anything is replaced. Caps do not apply: an operator chose it.
    pub fn replace_all(&mut self, suggestions: Vec<Suggestion>) -> PollResult<()> {
        let mut folded = HashSet::new();
        let mut entries = Vec::with_capacity(suggestions.len());
        for suggestion in suggestions {
            let text = suggestion.text.trim();
            if text.is_empty() {
                return Err(PollError::EmptySuggestion);
            }
            if !folded.insert(fold(text)) {
                return Err(PollError::DuplicateSuggestion(text.to_string()));
            }
            entries.push(Suggestion::new(text, suggestion.submitter_id.trim()));
        }
        if entries.is_empty() {
            return Err(PollError::NoSuggestions);
        }

        self.entries = entries;
        self.folded = folded;
        self.persist();
        Ok(())
    }

    /// Suggestions in insertion order
    pub fn list(&self) -> &[Suggestion] {
        &self.entries
    }

    /// Suggestion texts in insertion order
    pub fn texts(&self) -> Vec<String> {
        self.entries.iter().map(|s| s.text.clone()).collect()
    }

    /// Number of suggestions owned by a submitter
    pub fn count_by(&self, submitter_id: &str) -> usize {
        self.entries
            .iter()
            .filter(|s| s.submitter_id == submitter_id)
            .count()
    }

    /// Number of suggestions
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the store is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Remove every suggestion
    pub fn clear(&mut self) {
        self.entries.clear();
        self.folded.clear();
        self.persist();
    }

    fn persist(&self) {
        persist_best_effort(self.snapshots.as_ref(), SUGGESTIONS_KEY, &self.entries);
    }
}
