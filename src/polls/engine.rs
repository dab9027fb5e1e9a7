//! Poll Engine
//!
//! The phase controller: owns the cycle state and drives it through
//! suggestion and voting phases. It is synchronous. Timers come back in
//! as [`TimerEvent`]s and notifications go out through the [`Outbox`].

use super::ballot::Ballot;
use super::config::PollSettings;
use super::countdown::{
    final_warning_message, final_warning_offset, reminder_message, reminder_offsets, remaining_ms,
    terminal_message,
};
use super::duration::{format_duration, format_remaining, parse_duration};
use super::error::{PhaseKind, PollError, PollResult};
use super::results::{aggregate, ResultsReport};
use super::suggestions::{Suggestion, SuggestionStore};
use super::votes::VoteStore;
use crate::messages::{Choice, MessageContent, OutboundMessage, Outbox};
use crate::scheduler::{millis, Clock, DynScheduler, TimerEvent, TimerId, TimerKind};
use crate::storage::{persist_best_effort, DynSnapshotStore, RESULTS_KEY};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Lifecycle state of the cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// No phase running; suggestions from an earlier phase may be retained
    Idle,
    /// Collecting suggestions
    SuggestionOpen,
    /// Collecting votes
    VotingOpen,
    /// Voting finished; results published
    Closed,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::SuggestionOpen => write!(f, "collecting suggestions"),
            Self::VotingOpen => write!(f, "voting"),
            Self::Closed => write!(f, "closed"),
        }
    }
}

/// A running timed phase
#[derive(Debug, Clone)]
struct ActivePhase {
    epoch: u64,
    timers: Vec<TimerId>,
    deadline_ms: i64,
    /// Channel the phase announces into, fixed when it opened
    channel: String,
}

/// Cycle state owned by the controller
#[derive(Debug)]
pub struct PollSession {
    phase: Phase,
    suggest_channel: Option<String>,
    /// Voting duration of a running combined cycle
    combined_voting: Option<Duration>,
    ballot: Option<Ballot>,
    suggestion_phase: Option<ActivePhase>,
    voting_phase: Option<ActivePhase>,
}

impl PollSession {
    fn new() -> Self {
        Self {
            phase: Phase::Idle,
            suggest_channel: None,
            combined_voting: None,
            ballot: None,
            suggestion_phase: None,
            voting_phase: None,
        }
    }

    fn active(&self, phase: PhaseKind) -> Option<&ActivePhase> {
        match phase {
            PhaseKind::Suggestions => self.suggestion_phase.as_ref(),
            PhaseKind::Voting => self.voting_phase.as_ref(),
        }
    }

    fn slot(&mut self, phase: PhaseKind) -> &mut Option<ActivePhase> {
        match phase {
            PhaseKind::Suggestions => &mut self.suggestion_phase,
            PhaseKind::Voting => &mut self.voting_phase,
        }
    }
}

/// Point-in-time view of the cycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CycleStatus {
    pub phase: Phase,
    pub suggest_channel: Option<String>,
    pub combined: bool,
    pub suggestions: usize,
    pub voters: usize,
    pub total_votes: usize,
    /// Time left in the open phase, if any
    pub remaining_ms: Option<u64>,
}

impl CycleStatus {
    /// Render for the `status` command
    pub fn render(&self) -> String {
        let mut out = format!("Poll status: {}", self.phase);
        if self.combined {
            out.push_str(" (combined)");
        }
        if let Some(ms) = self.remaining_ms {
            out.push_str(&format!("\nTime remaining: {}", format_remaining(ms)));
        }
        match &self.suggest_channel {
            Some(channel) => out.push_str(&format!("\nSuggest channel: #{}", channel)),
            None => out.push_str("\nSuggest channel: not set"),
        }
        out.push_str(&format!(
            "\nSuggestions: {}\nVotes: {} from {} voter(s)",
            self.suggestions, self.total_votes, self.voters
        ));
        out
    }
}

/// Drives one poll cycle at a time
#[derive(Debug)]
pub struct PollController {
    session: PollSession,
    suggestions: SuggestionStore,
    votes: VoteStore,
    settings: PollSettings,
    clock: Arc<dyn Clock>,
    scheduler: DynScheduler,
    snapshots: DynSnapshotStore,
    outbox: Outbox,
    next_epoch: u64,
}

impl PollController {
    /// Create a controller, restoring suggestions and votes from the
    /// snapshot store. The cycle always starts idle; timers do not survive
    /// a restart.
    pub fn new(
        settings: PollSettings,
        clock: Arc<dyn Clock>,
        scheduler: DynScheduler,
        snapshots: DynSnapshotStore,
    ) -> Self {
        let suggestions = SuggestionStore::restore(settings.clone(), snapshots.clone());
        let votes = VoteStore::restore(settings.clone(), snapshots.clone());
        info!(
            suggestions = suggestions.len(),
            voters = votes.voter_count(),
            "poll controller ready"
        );
        Self {
            session: PollSession::new(),
            suggestions,
            votes,
            settings,
            clock,
            scheduler,
            snapshots,
            outbox: Outbox::new(),
            next_epoch: 1,
        }
    }

    /// Current phase
    pub fn phase(&self) -> Phase {
        self.session.phase
    }

    /// Configured suggest channel
    pub fn suggest_channel(&self) -> Option<&str> {
        self.session.suggest_channel.as_deref()
    }

    /// Suggestion store
    pub fn suggestions(&self) -> &SuggestionStore {
        &self.suggestions
    }

    /// Vote store
    pub fn votes(&self) -> &VoteStore {
        &self.votes
    }

    /// Ballot of the current or last voting phase
    pub fn ballot(&self) -> Option<&Ballot> {
        self.session.ballot.as_ref()
    }

    /// Whether a combined cycle is running
    pub fn is_combined(&self) -> bool {
        self.session.combined_voting.is_some()
    }

    /// Take every queued notification
    pub fn take_outbox(&mut self) -> Vec<OutboundMessage> {
        self.outbox.drain()
    }

    /// Set the channel suggestions are collected in
    pub fn set_suggest_channel(&mut self, channel_id: &str) -> PollResult<String> {
        let channel_id = channel_id.trim().trim_start_matches('#');
        if channel_id.is_empty() {
            return Err(PollError::NoChannelConfigured);
        }
        self.session.suggest_channel = Some(channel_id.to_string());
        info!(channel = %channel_id, "suggest channel set");
        Ok(format!("Suggest channel set to #{}.", channel_id))
    }

    /// Open a suggestion period
    pub fn start_suggestions(&mut self, duration: &str) -> PollResult<String> {
        let channel = self.require_channel()?;
        let duration = parse_duration(duration)?;
        self.ensure_nothing_open()?;

        self.begin_cycle_if_closed();
        self.open_suggestions(duration, &channel);
        Ok(format!(
            "Suggestion period started for {}.",
            format_duration(duration)
        ))
    }

    /// Stop the running suggestion period early
    pub fn stop_suggestions(&mut self) -> PollResult<String> {
        if self.session.phase != Phase::SuggestionOpen {
            return Err(PollError::NothingActive(PhaseKind::Suggestions));
        }
        let channel = self.cancel_phase(PhaseKind::Suggestions);
        self.session.combined_voting = None;
        self.session.phase = Phase::Idle;
        if let Some(channel) = channel {
            self.outbox.text(&channel, "Suggestion period was stopped.");
        }
        info!(suggestions = self.suggestions.len(), "suggestion period stopped");
        Ok("Suggestion period stopped.".to_string())
    }

    /// Open a voting period over the stored suggestions
    pub fn start_voting(&mut self, duration: &str) -> PollResult<String> {
        let channel = self.require_channel()?;
        let duration = parse_duration(duration)?;
        match self.session.phase {
            Phase::VotingOpen => return Err(PollError::AlreadyActive(PhaseKind::Voting)),
            Phase::Closed => return Err(PollError::CycleClosed),
            Phase::Idle | Phase::SuggestionOpen => {}
        }
        if self.suggestions.is_empty() {
            return Err(PollError::NoSuggestions);
        }

        if self.session.phase == Phase::SuggestionOpen {
            if let Some(channel) = self.cancel_phase(PhaseKind::Suggestions) {
                self.outbox.text(&channel, terminal_message(PhaseKind::Suggestions));
            }
        }
        self.session.combined_voting = None;
        self.open_voting(duration, &channel);
        Ok(format!(
            "Voting period started for {}.",
            format_duration(duration)
        ))
    }

    /// Stop the running voting period early and publish the results
    pub fn stop_voting(&mut self) -> PollResult<String> {
        if self.session.phase != Phase::VotingOpen {
            return Err(PollError::NothingActive(PhaseKind::Voting));
        }
        let channel = self.cancel_phase(PhaseKind::Voting);
        if let Some(channel) = &channel {
            self.outbox.text(channel, "Voting period was stopped.");
        }
        self.close_voting(channel);
        Ok("Voting stopped and results published.".to_string())
    }

    /// Run a suggestion period that chains into voting automatically
    pub fn start_combined(&mut self, suggest: &str, vote: &str) -> PollResult<String> {
        let channel = self.require_channel()?;
        let suggest_duration = parse_duration(suggest)?;
        let vote_duration = parse_duration(vote)?;
        self.ensure_nothing_open()?;

        self.begin_cycle_if_closed();
        self.session.combined_voting = Some(vote_duration);
        self.open_suggestions(suggest_duration, &channel);
        Ok(format!(
            "Combined poll started: {} of suggestions, then {} of voting.",
            format_duration(suggest_duration),
            format_duration(vote_duration)
        ))
    }

    /// Stop whichever phase of the combined cycle is running
    pub fn stop_combined(&mut self) -> PollResult<String> {
        if self.session.combined_voting.is_none() {
            return Err(PollError::NoCombinedActive);
        }
        match self.session.phase {
            Phase::SuggestionOpen => {
                self.stop_suggestions()?;
            }
            Phase::VotingOpen => {
                self.stop_voting()?;
            }
            Phase::Idle | Phase::Closed => {
                self.session.combined_voting = None;
            }
        }
        info!("combined poll stopped");
        Ok("Combined poll stopped.".to_string())
    }

    /// Record a suggestion from the suggest channel
    pub fn submit_suggestion(&mut self, text: &str, submitter_id: &str) -> PollResult<String> {
        if self.session.phase != Phase::SuggestionOpen {
            return Err(PollError::SuggestionsClosed);
        }
        let text = self.suggestions.submit(text, submitter_id)?;
        debug!(submitter = %submitter_id, total = self.suggestions.len(), "suggestion accepted");
        Ok(format!("Suggestion added: **{}**", text))
    }

    /// Record a vote for ballot entry `index`
    pub fn cast_vote(&mut self, voter_id: &str, index: usize) -> PollResult<String> {
        if self.session.phase != Phase::VotingOpen {
            return Err(PollError::VotingClosed);
        }
        let entry = self
            .session
            .ballot
            .as_ref()
            .and_then(|b| b.get(index))
            .ok_or(PollError::UnknownSuggestion)?;
        self.votes
            .cast_vote(voter_id, &entry.text, Some(&entry.submitter_id))?;
        debug!(voter = %voter_id, choice = index, "vote accepted");
        Ok(format!("Your vote for **{}** has been recorded.", entry.text))
    }

    /// Start a fresh cycle voting directly on operator-supplied lines of
    /// the form `Suggestion - Submitter`
    pub fn start_voting_predefined(&mut self, duration: &str, lines: &[&str]) -> PollResult<String> {
        let channel = self.require_channel()?;
        let duration = parse_duration(duration)?;
        self.ensure_nothing_open()?;
        let entries = parse_predefined(lines)?;

        self.suggestions.replace_all(entries)?;
        self.session.ballot = None;
        self.session.combined_voting = None;
        self.open_voting(duration, &channel);
        Ok(format!(
            "Voting period started for {} with {} predefined suggestion(s).",
            format_duration(duration),
            self.suggestions.len()
        ))
    }

    /// Tally the current stores. A tally is also persisted for audit.
    pub fn results(&mut self) -> PollResult<String> {
        let report = self.aggregate();
        if let Some(results) = report.results() {
            persist_best_effort(self.snapshots.as_ref(), RESULTS_KEY, results);
        }
        Ok(report.render())
    }

    /// Cancel everything and empty the stores. The suggest channel is kept.
    pub fn reset(&mut self) -> PollResult<String> {
        self.cancel_phase(PhaseKind::Suggestions);
        self.cancel_phase(PhaseKind::Voting);
        self.suggestions.clear();
        self.votes.clear();
        self.session.ballot = None;
        self.session.combined_voting = None;
        self.session.phase = Phase::Idle;
        info!("poll state reset");
        Ok("Poll state has been reset.".to_string())
    }

    /// Snapshot of the cycle
    pub fn status(&self) -> CycleStatus {
        let now = self.clock.now_ms();
        let remaining_ms = match self.session.phase {
            Phase::SuggestionOpen => self.session.active(PhaseKind::Suggestions),
            Phase::VotingOpen => self.session.active(PhaseKind::Voting),
            Phase::Idle | Phase::Closed => None,
        }
        .map(|active| remaining_ms(active.deadline_ms, now));

        CycleStatus {
            phase: self.session.phase,
            suggest_channel: self.session.suggest_channel.clone(),
            combined: self.is_combined(),
            suggestions: self.suggestions.len(),
            voters: self.votes.voter_count(),
            total_votes: self.votes.total_votes(),
            remaining_ms,
        }
    }

    /// Handle a fired timer. Events from cancelled or replaced phases are
    /// ignored.
    pub fn on_timer(&mut self, event: TimerEvent) {
        let Some(active) = self
            .session
            .active(event.phase)
            .filter(|active| active.epoch == event.epoch)
        else {
            debug!(phase = %event.phase, epoch = event.epoch, "ignoring stale timer");
            return;
        };

        match event.kind {
            TimerKind::Reminder => {
                let remaining = remaining_ms(active.deadline_ms, self.clock.now_ms());
                if remaining > 0 {
                    let message = OutboundMessage::new(
                        active.channel.clone(),
                        MessageContent::Countdown {
                            phase: event.phase,
                            epoch: event.epoch,
                            text: reminder_message(event.phase, remaining),
                        },
                    );
                    self.outbox.push(message);
                }
            }
            TimerKind::FinalWarning => {
                if remaining_ms(active.deadline_ms, self.clock.now_ms()) > 0 {
                    let channel = active.channel.clone();
                    self.outbox.text(&channel, final_warning_message(event.phase));
                }
            }
            TimerKind::Deadline => self.finish_phase(event.phase),
        }
    }

    fn finish_phase(&mut self, phase: PhaseKind) {
        let channel = self.cancel_phase(phase);
        if let Some(channel) = &channel {
            self.outbox.text(channel, terminal_message(phase));
        }
        info!(phase = %phase, "phase deadline reached");

        match phase {
            PhaseKind::Suggestions => {
                let Some(vote_duration) = self.session.combined_voting else {
                    self.session.phase = Phase::Idle;
                    return;
                };
                let channel = channel
                    .or_else(|| self.session.suggest_channel.clone())
                    .unwrap_or_default();
                if self.suggestions.is_empty() {
                    self.session.combined_voting = None;
                    self.session.phase = Phase::Closed;
                    self.outbox.text(
                        &channel,
                        "No suggestions were submitted, so there is nothing to vote on. The poll has been closed.",
                    );
                    info!("combined poll closed without suggestions");
                } else {
                    self.open_voting(vote_duration, &channel);
                }
            }
            PhaseKind::Voting => self.close_voting(channel),
        }
    }

    fn open_suggestions(&mut self, duration: Duration, channel: &str) {
        self.open_phase(PhaseKind::Suggestions, duration, channel);
        self.session.phase = Phase::SuggestionOpen;
        self.outbox.text(
            channel,
            format!(
                "Suggestion period is open for {}! Post your suggestions in this channel (up to {} each).",
                format_duration(duration),
                self.settings.max_suggestions_per_user
            ),
        );
        info!(channel = %channel, duration = %format_duration(duration), "suggestion period opened");
    }

    fn open_voting(&mut self, duration: Duration, channel: &str) {
        let ballot = Ballot::snapshot(self.suggestions.list());
        self.votes.clear();
        self.open_phase(PhaseKind::Voting, duration, channel);
        self.session.phase = Phase::VotingOpen;

        let choices = ballot
            .entries()
            .iter()
            .map(|entry| Choice {
                id: entry.choice_id(),
                label: entry.text.clone(),
            })
            .collect();
        self.outbox.push(OutboundMessage::new(
            channel,
            MessageContent::Choices {
                header: format!(
                    "Voting is open for {}! Pick up to {} suggestions:",
                    format_duration(duration),
                    self.settings.max_votes_per_user
                ),
                choices,
            },
        ));
        info!(
            channel = %channel,
            choices = ballot.len(),
            duration = %format_duration(duration),
            "voting period opened"
        );
        self.session.ballot = Some(ballot);
    }

    /// Schedule the reminders and the deadline of a new phase instance
    fn open_phase(&mut self, phase: PhaseKind, duration: Duration, channel: &str) {
        let epoch = self.next_epoch;
        self.next_epoch += 1;

        let now = self.clock.now_ms();

        let mut timers = Vec::new();
        for offset in reminder_offsets(
            duration,
            self.settings.countdown_threshold(),
            self.settings.countdown_steps,
        ) {
            let event = TimerEvent {
                phase,
                epoch,
                kind: TimerKind::Reminder,
            };
            timers.push(self.scheduler.schedule(offset, event));
        }
        if let Some(offset) = final_warning_offset(duration) {
            let warning = TimerEvent {
                phase,
                epoch,
                kind: TimerKind::FinalWarning,
            };
            timers.push(self.scheduler.schedule(offset, warning));
        }
        let deadline = TimerEvent {
            phase,
            epoch,
            kind: TimerKind::Deadline,
        };
        timers.push(self.scheduler.schedule(duration, deadline));

        *self.session.slot(phase) = Some(ActivePhase {
            epoch,
            timers,
            deadline_ms: now.saturating_add(millis(duration)),
            channel: channel.to_string(),
        });
    }

    /// Cancel a phase's timers and forget it. Returns its channel.
    fn cancel_phase(&mut self, phase: PhaseKind) -> Option<String> {
        let active = self.session.slot(phase).take()?;
        for timer in &active.timers {
            self.scheduler.cancel(*timer);
        }
        debug!(phase = %phase, epoch = active.epoch, "phase timers cancelled");
        Some(active.channel)
    }

    fn close_voting(&mut self, channel: Option<String>) {
        self.session.phase = Phase::Closed;
        self.session.combined_voting = None;

        let report = self.aggregate();
        if let Some(results) = report.results() {
            persist_best_effort(self.snapshots.as_ref(), RESULTS_KEY, results);
        }
        if let Some(channel) = channel.or_else(|| self.session.suggest_channel.clone()) {
            self.outbox.text(&channel, report.render());
        }
        info!(
            voters = self.votes.voter_count(),
            votes = self.votes.total_votes(),
            "voting closed"
        );
    }

    /// Tally over the ballot if voting has opened, else the stored suggestions
    fn aggregate(&self) -> ResultsReport {
        let universe = match &self.session.ballot {
            Some(ballot) => ballot.texts(),
            None => self.suggestions.texts(),
        };
        aggregate(&universe, &self.votes)
    }

    fn require_channel(&self) -> PollResult<String> {
        self.session
            .suggest_channel
            .clone()
            .ok_or(PollError::NoChannelConfigured)
    }

    fn ensure_nothing_open(&self) -> PollResult<()> {
        match self.session.phase {
            Phase::SuggestionOpen => Err(PollError::AlreadyActive(PhaseKind::Suggestions)),
            Phase::VotingOpen => Err(PollError::AlreadyActive(PhaseKind::Voting)),
            Phase::Idle | Phase::Closed => Ok(()),
        }
    }

    /// A finished cycle is discarded when a new one starts
    fn begin_cycle_if_closed(&mut self) {
        if self.session.phase == Phase::Closed {
            self.suggestions.clear();
            self.votes.clear();
            self.session.ballot = None;
            self.session.phase = Phase::Idle;
            debug!("previous cycle discarded");
        }
    }
}

/// Parse `Suggestion - Submitter` lines. Blank lines are skipped.
pub fn parse_predefined(lines: &[&str]) -> PollResult<Vec<Suggestion>> {
    let mut entries = Vec::new();
    for line in lines {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let (text, submitter) = line
            .rsplit_once(" - ")
            .map(|(text, submitter)| (text.trim(), submitter.trim()))
            .filter(|(text, submitter)| !text.is_empty() && !submitter.is_empty())
            .ok_or_else(|| PollError::MalformedPredefinedLine(line.to_string()))?;
        entries.push(Suggestion::new(text, submitter));
    }
    if entries.is_empty() {
        return Err(PollError::NoSuggestions);
    }
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::{ManualClock, ManualScheduler};
    use crate::storage::{MemoryStore, VOTES_KEY};

    struct Harness {
        controller: PollController,
        clock: Arc<ManualClock>,
        scheduler: Arc<ManualScheduler>,
        store: Arc<MemoryStore>,
    }

    fn harness_with(settings: PollSettings) -> Harness {
        let clock = Arc::new(ManualClock::new(0));
        let scheduler = Arc::new(ManualScheduler::new(clock.clone()));
        let store = Arc::new(MemoryStore::new());
        let mut controller =
            PollController::new(settings, clock.clone(), scheduler.clone(), store.clone());
        controller.set_suggest_channel("polls").unwrap();
        controller.take_outbox();
        Harness {
            controller,
            clock,
            scheduler,
            store,
        }
    }

    fn harness() -> Harness {
        harness_with(PollSettings::default())
    }

    impl Harness {
        /// Fire every timer due up to `ms`
        fn advance_to(&mut self, ms: i64) {
            while let Some((due, event)) = self.scheduler.pop_due(ms) {
                self.clock.set(due);
                self.controller.on_timer(event);
            }
            self.clock.set(ms);
        }

        fn texts(&mut self) -> Vec<String> {
            self.controller
                .take_outbox()
                .into_iter()
                .map(|m| m.content.as_text().to_string())
                .collect()
        }
    }

    #[test]
    fn test_start_requires_channel() {
        let clock = Arc::new(ManualClock::new(0));
        let scheduler = Arc::new(ManualScheduler::new(clock.clone()));
        let mut controller = PollController::new(
            PollSettings::default(),
            clock,
            scheduler,
            Arc::new(MemoryStore::new()),
        );
        assert_eq!(
            controller.start_suggestions("1h").unwrap_err(),
            PollError::NoChannelConfigured
        );
        assert_eq!(controller.phase(), Phase::Idle);
    }

    #[test]
    fn test_invalid_duration_leaves_state_alone() {
        let mut h = harness();
        assert!(matches!(
            h.controller.start_suggestions("soon"),
            Err(PollError::InvalidDuration(_))
        ));
        assert_eq!(h.controller.phase(), Phase::Idle);
        assert_eq!(h.scheduler.pending(), 0);
    }

    #[test]
    fn test_second_start_is_rejected() {
        let mut h = harness();
        h.controller.start_suggestions("10m").unwrap();
        assert_eq!(
            h.controller.start_suggestions("10m").unwrap_err(),
            PollError::AlreadyActive(PhaseKind::Suggestions)
        );
        assert_eq!(
            h.controller.start_combined("10m", "10m").unwrap_err(),
            PollError::AlreadyActive(PhaseKind::Suggestions)
        );
    }

    #[test]
    fn test_suggestion_deadline_returns_to_idle() {
        let mut h = harness();
        h.controller.start_suggestions("10m").unwrap();
        h.controller.submit_suggestion("Pizza", "u1").unwrap();
        h.texts();

        h.advance_to(600_000);
        assert_eq!(h.controller.phase(), Phase::Idle);
        assert_eq!(h.controller.suggestions().len(), 1);
        assert_eq!(
            h.texts(),
            vec![
                "Suggestion period: time remaining 1m 0s",
                "Suggestion period: less than 1 minute remaining!",
                "Suggestion period has ended.",
            ]
        );
        assert_eq!(
            h.controller.submit_suggestion("Tacos", "u1").unwrap_err(),
            PollError::SuggestionsClosed
        );
    }

    #[test]
    fn test_short_phase_single_reminder() {
        let mut h = harness();
        h.controller.start_suggestions("10m").unwrap();
        h.texts();
        // One reminder at 9m, the final warning, the deadline
        assert_eq!(h.scheduler.pending(), 3);

        h.advance_to(540_000);
        assert_eq!(
            h.texts(),
            vec![
                "Suggestion period: time remaining 1m 0s",
                "Suggestion period: less than 1 minute remaining!",
            ]
        );
    }

    #[test]
    fn test_long_phase_reminders() {
        let mut h = harness();
        h.controller.start_suggestions("1h40m").unwrap();
        // Nine reminders, the final warning, the deadline
        assert_eq!(h.scheduler.pending(), 11);
    }

    #[test]
    fn test_final_warning_fires_once_before_deadline() {
        let mut h = harness();
        h.controller.start_suggestions("1h40m").unwrap();
        h.texts();

        h.advance_to(99 * 60_000 - 1);
        let texts = h.texts();
        assert!(!texts.iter().any(|t| t.contains("less than 1 minute")));

        h.advance_to(99 * 60_000);
        assert_eq!(
            h.texts(),
            vec!["Suggestion period: less than 1 minute remaining!"]
        );
    }

    #[test]
    fn test_minute_long_phase_has_no_final_warning() {
        let mut h = harness();
        h.controller.start_suggestions("1m").unwrap();
        // Reminder at 54s plus the deadline
        assert_eq!(h.scheduler.pending(), 2);
    }

    #[test]
    fn test_oversized_duration_is_rejected() {
        let mut h = harness();
        assert!(matches!(
            h.controller.start_suggestions("30000000000d"),
            Err(PollError::InvalidDuration(_))
        ));
        assert!(matches!(
            h.controller.start_combined("10m", "30000000000d"),
            Err(PollError::InvalidDuration(_))
        ));
        assert_eq!(h.controller.phase(), Phase::Idle);
        assert_eq!(h.scheduler.pending(), 0);

        h.controller.start_suggestions("365d").unwrap();
        assert_eq!(h.scheduler.pending(), 11);
        assert_eq!(
            h.controller.status().remaining_ms,
            Some(365 * 24 * 3_600_000)
        );
    }

    #[test]
    fn test_vote_through_ballot() {
        let mut h = harness();
        h.controller.start_suggestions("10m").unwrap();
        h.controller.submit_suggestion("Pizza", "u1").unwrap();
        h.controller.submit_suggestion("Tacos", "u2").unwrap();
        h.controller.start_voting("5m").unwrap();
        assert_eq!(h.controller.phase(), Phase::VotingOpen);

        h.controller.cast_vote("v1", 1).unwrap();
        assert_eq!(h.controller.votes().votes_of("v1"), ["Tacos".to_string()]);
        assert_eq!(
            h.controller.cast_vote("v1", 1).unwrap_err(),
            PollError::AlreadyVotedForThis("Tacos".to_string())
        );
        assert_eq!(
            h.controller.cast_vote("v1", 7).unwrap_err(),
            PollError::UnknownSuggestion
        );
    }

    #[test]
    fn test_start_voting_closes_suggestion_phase() {
        let mut h = harness();
        h.controller.start_suggestions("10m").unwrap();
        h.controller.submit_suggestion("Pizza", "u1").unwrap();
        h.texts();
        h.controller.start_voting("5m").unwrap();

        let texts = h.texts();
        assert_eq!(texts[0], "Suggestion period has ended.");
        // Old suggestion timers are gone: only the voting phase's remain
        assert_eq!(h.scheduler.pending(), 3);
    }

    #[test]
    fn test_start_voting_without_suggestions() {
        let mut h = harness();
        assert_eq!(
            h.controller.start_voting("5m").unwrap_err(),
            PollError::NoSuggestions
        );
    }

    #[test]
    fn test_self_vote_policy() {
        let mut h = harness_with(PollSettings::default().forbid_self_vote(true));
        h.controller.start_suggestions("10m").unwrap();
        h.controller.submit_suggestion("Pizza", "u1").unwrap();
        h.controller.start_voting("5m").unwrap();
        assert_eq!(
            h.controller.cast_vote("u1", 0).unwrap_err(),
            PollError::SelfVoteForbidden
        );
        h.controller.cast_vote("u2", 0).unwrap();
    }

    #[test]
    fn test_voting_deadline_publishes_results() {
        let mut h = harness();
        h.controller.start_suggestions("10m").unwrap();
        h.controller.submit_suggestion("Pizza", "u1").unwrap();
        h.controller.start_voting("5m").unwrap();
        h.controller.cast_vote("v1", 0).unwrap();
        h.texts();

        let now = h.clock.now_ms();
        h.advance_to(now + 300_000);
        assert_eq!(h.controller.phase(), Phase::Closed);
        let texts = h.texts();
        assert!(texts.contains(&"Voting period has ended.".to_string()));
        assert!(texts.last().unwrap().contains("Winner: **Pizza**"));
        assert!(h.store.get(RESULTS_KEY).is_some());
    }

    #[test]
    fn test_closed_cycle_blocks_voting_until_new_cycle() {
        let mut h = harness();
        h.controller.start_suggestions("10m").unwrap();
        h.controller.submit_suggestion("Pizza", "u1").unwrap();
        h.controller.start_voting("5m").unwrap();
        h.controller.stop_voting().unwrap();
        assert_eq!(h.controller.phase(), Phase::Closed);

        assert_eq!(
            h.controller.start_voting("5m").unwrap_err(),
            PollError::CycleClosed
        );
        h.controller.start_suggestions("10m").unwrap();
        assert!(h.controller.suggestions().is_empty());
        assert!(h.controller.ballot().is_none());
    }

    #[test]
    fn test_stop_without_phase() {
        let mut h = harness();
        assert_eq!(
            h.controller.stop_suggestions().unwrap_err(),
            PollError::NothingActive(PhaseKind::Suggestions)
        );
        assert_eq!(
            h.controller.stop_voting().unwrap_err(),
            PollError::NothingActive(PhaseKind::Voting)
        );
        assert_eq!(
            h.controller.stop_combined().unwrap_err(),
            PollError::NoCombinedActive
        );
    }

    #[test]
    fn test_stale_timer_after_stop_is_ignored() {
        let mut h = harness();
        h.controller.start_suggestions("10m").unwrap();
        let (_, reminder) = h.scheduler.pop_due(i64::MAX).unwrap();
        h.controller.stop_suggestions().unwrap();
        h.texts();

        h.controller.on_timer(reminder);
        h.controller.on_timer(TimerEvent {
            kind: TimerKind::Deadline,
            ..reminder
        });
        assert!(h.texts().is_empty());
        assert_eq!(h.controller.phase(), Phase::Idle);
    }

    #[test]
    fn test_predefined_voting() {
        let mut h = harness();
        h.controller.start_suggestions("10m").unwrap();
        h.controller.submit_suggestion("Old", "u1").unwrap();
        h.controller.stop_suggestions().unwrap();

        h.controller
            .start_voting_predefined("5m", &["Pizza - alice", "", "Tacos - bob"])
            .unwrap();
        assert_eq!(h.controller.phase(), Phase::VotingOpen);
        assert_eq!(h.controller.suggestions().texts(), vec!["Pizza", "Tacos"]);
        assert_eq!(h.controller.ballot().unwrap().len(), 2);
    }

    #[test]
    fn test_predefined_voting_clears_votes_once() {
        let mut h = harness();
        h.controller
            .start_voting_predefined("5m", &["Pizza - alice", "Tacos - bob"])
            .unwrap();
        h.controller.cast_vote("v1", 0).unwrap();
        h.controller.stop_voting().unwrap();

        let before = h.store.write_count(VOTES_KEY);
        h.controller
            .start_voting_predefined("5m", &["Sushi - carol"])
            .unwrap();
        assert_eq!(h.store.write_count(VOTES_KEY), before + 1);
        assert!(h.controller.votes().is_empty());
    }

    #[test]
    fn test_predefined_rejections() {
        let mut h = harness();
        assert_eq!(
            h.controller
                .start_voting_predefined("5m", &["Pizza alice"])
                .unwrap_err(),
            PollError::MalformedPredefinedLine("Pizza alice".to_string())
        );
        assert_eq!(
            h.controller.start_voting_predefined("5m", &[]).unwrap_err(),
            PollError::NoSuggestions
        );
        assert_eq!(
            h.controller
                .start_voting_predefined("5m", &["Pizza - a", "pizza - b"])
                .unwrap_err(),
            PollError::DuplicateSuggestion("pizza".to_string())
        );
        assert_eq!(h.controller.phase(), Phase::Idle);
    }

    #[test]
    fn test_parse_predefined_keeps_dashes_in_text() {
        let entries = parse_predefined(&["Spider - Man - peter"]).unwrap();
        assert_eq!(entries[0], Suggestion::new("Spider - Man", "peter"));
    }

    #[test]
    fn test_reset_keeps_channel() {
        let mut h = harness();
        h.controller.start_combined("10m", "5m").unwrap();
        h.controller.submit_suggestion("Pizza", "u1").unwrap();
        h.controller.reset().unwrap();

        assert_eq!(h.controller.phase(), Phase::Idle);
        assert!(!h.controller.is_combined());
        assert!(h.controller.suggestions().is_empty());
        assert_eq!(h.scheduler.pending(), 0);
        assert_eq!(h.controller.suggest_channel(), Some("polls"));
    }

    #[test]
    fn test_status() {
        let mut h = harness();
        h.controller.start_suggestions("10m").unwrap();
        h.clock.advance(Duration::from_secs(60));
        let status = h.controller.status();
        assert_eq!(status.phase, Phase::SuggestionOpen);
        assert_eq!(status.remaining_ms, Some(540_000));
        assert!(status.render().contains("Time remaining: 9m 0s"));
    }
}
