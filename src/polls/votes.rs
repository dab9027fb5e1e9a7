//! Vote Store
//!
//! Tracks which suggestions each voter backed, in the order they voted.

use super::config::PollSettings;
use super::error::{PollError, PollResult};
use crate::storage::{load_or_default, persist_best_effort, DynSnapshotStore, VOTES_KEY};
use std::collections::{BTreeMap, HashMap, HashSet};

/// All votes of the live cycle (voter_id -> chosen suggestions)
#[derive(Debug)]
pub struct VoteStore {
    records: BTreeMap<String, Vec<String>>,
    settings: PollSettings,
    snapshots: DynSnapshotStore,
}

impl VoteStore {
    /// Create an empty store
    pub fn new(settings: PollSettings, snapshots: DynSnapshotStore) -> Self {
        Self {
            records: BTreeMap::new(),
            settings,
            snapshots,
        }
    }

    /// Restore the store from its last snapshot
    pub fn restore(settings: PollSettings, snapshots: DynSnapshotStore) -> Self {
        let mut records: BTreeMap<String, Vec<String>> =
            load_or_default(snapshots.as_ref(), VOTES_KEY);
        for chosen in records.values_mut() {
            let mut seen = HashSet::new();
            chosen.retain(|s| seen.insert(s.clone()));
        }
        records.retain(|_, chosen| !chosen.is_empty());
        Self {
            records,
            settings,
            snapshots,
        }
    }

    /// Record a vote.
    ///
    /// `submitter_id` is the owner of the suggestion, checked against the
    /// voter when self-votes are forbidden.
    pub fn cast_vote(
        &mut self,
        voter_id: &str,
        suggestion: &str,
        submitter_id: Option<&str>,
    ) -> PollResult<()> {
        if self.settings.forbid_self_vote && submitter_id == Some(voter_id) {
            return Err(PollError::SelfVoteForbidden);
        }

        let chosen = self.records.get(voter_id).map(Vec::as_slice).unwrap_or_default();
        if chosen.iter().any(|s| s == suggestion) {
            return Err(PollError::AlreadyVotedForThis(suggestion.to_string()));
        }
        if chosen.len() >= self.settings.max_votes_per_user {
            return Err(PollError::VoterQuotaExceeded {
                max: self.settings.max_votes_per_user,
            });
        }

        self.records
            .entry(voter_id.to_string())
            .or_default()
            .push(suggestion.to_string());
        self.persist();
        Ok(())
    }

    /// Count votes per suggestion of `universe`, in universe order.
    ///
    /// Every suggestion appears, zero when nobody voted for it. Votes for
    /// text outside the universe are ignored.
    pub fn tally(&self, universe: &[String]) -> Vec<(String, u32)> {
        let mut counts: HashMap<&str, u32> = universe.iter().map(|s| (s.as_str(), 0)).collect();
        for chosen in self.records.values() {
            for suggestion in chosen {
                if let Some(count) = counts.get_mut(suggestion.as_str()) {
                    *count += 1;
                }
            }
        }
        universe
            .iter()
            .map(|s| (s.clone(), counts.get(s.as_str()).copied().unwrap_or(0)))
            .collect()
    }

    /// Suggestions a voter has backed, in cast order
    pub fn votes_of(&self, voter_id: &str) -> &[String] {
        self.records.get(voter_id).map(Vec::as_slice).unwrap_or_default()
    }

    /// Number of distinct voters
    pub fn voter_count(&self) -> usize {
        self.records.len()
    }

    /// Total number of votes cast
    pub fn total_votes(&self) -> usize {
        self.records.values().map(Vec::len).sum()
    }

    /// Whether nobody has voted
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Remove every vote
    pub fn clear(&mut self) {
        self.records.clear();
        self.persist();
    }

    fn persist(&self) {
        persist_best_effort(self.snapshots.as_ref(), VOTES_KEY, &self.records);
    }
}
