//! Poll lifecycle integration tests
//!
//! Drives the controller end to end with a manual clock and scheduler, and
//! the bot runtime over an in-memory channel.

use ballotbox::bot::{BotEvent, InboundMessage, PollBot, VoteInteraction};
use ballotbox::channels::{MemoryChannel, Sent};
use ballotbox::config::BotSection;
use ballotbox::messages::MessageContent;
use ballotbox::polls::{Phase, PhaseKind, PollController, PollError, PollSettings};
use ballotbox::scheduler::{Clock, ManualClock, ManualScheduler};
use ballotbox::storage::{MemoryStore, SUGGESTIONS_KEY, VOTES_KEY};
use serde_json::json;
use std::sync::Arc;

const MINUTE: i64 = 60_000;

struct World {
    controller: PollController,
    clock: Arc<ManualClock>,
    scheduler: Arc<ManualScheduler>,
    store: Arc<MemoryStore>,
}

impl World {
    fn new() -> Self {
        Self::with_store(Arc::new(MemoryStore::new()))
    }

    fn with_store(store: Arc<MemoryStore>) -> Self {
        let clock = Arc::new(ManualClock::new(1_700_000_000_000));
        let scheduler = Arc::new(ManualScheduler::new(clock.clone()));
        let mut controller = PollController::new(
            PollSettings::default(),
            clock.clone(),
            scheduler.clone(),
            store.clone(),
        );
        controller.set_suggest_channel("ideas").unwrap();
        Self {
            controller,
            clock,
            scheduler,
            store,
        }
    }

    fn now(&self) -> i64 {
        self.clock.now_ms()
    }

    /// Fire every timer due up to `ms`, in order
    fn run_until(&mut self, ms: i64) {
        while let Some((due, event)) = self.scheduler.pop_due(ms) {
            self.clock.set(due);
            self.controller.on_timer(event);
        }
        self.clock.set(ms);
    }

    fn drain(&mut self) -> Vec<MessageContent> {
        self.controller
            .take_outbox()
            .into_iter()
            .map(|m| m.content)
            .collect()
    }

    fn drain_texts(&mut self) -> Vec<String> {
        self.drain()
            .iter()
            .map(|c| c.as_text().to_string())
            .collect()
    }
}

#[test]
fn test_combined_cycle_chains_into_voting() {
    let mut w = World::new();
    let start = w.now();
    w.controller.start_combined("10m", "5m").unwrap();
    w.controller.submit_suggestion("Pizza", "alice").unwrap();
    w.controller.submit_suggestion("Tacos", "bob").unwrap();
    w.controller.submit_suggestion("Sushi", "carol").unwrap();
    w.drain();

    w.run_until(start + 10 * MINUTE);
    assert_eq!(w.controller.phase(), Phase::VotingOpen);
    let contents = w.drain();
    assert!(contents
        .iter()
        .any(|c| c.as_text() == "Suggestion period has ended."));
    let choices = contents
        .iter()
        .find_map(|c| match c {
            MessageContent::Choices { choices, .. } => Some(choices.clone()),
            _ => None,
        })
        .expect("voting buttons");
    let ids: Vec<&str> = choices.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, vec!["vote_0", "vote_1", "vote_2"]);

    for voter in ["v1", "v2", "v3"] {
        w.controller.cast_vote(voter, 1).unwrap();
    }
    w.controller.cast_vote("v1", 0).unwrap();

    w.run_until(start + 15 * MINUTE);
    assert_eq!(w.controller.phase(), Phase::Closed);
    assert!(!w.controller.is_combined());
    let texts = w.drain_texts();
    let report = texts.last().unwrap();
    assert!(report.starts_with("**Poll Results**"));
    assert!(report.contains("- **Tacos** : 3 vote(s)"));
    assert!(report.contains("- **Sushi** : 0 vote(s)"));
    assert!(report.ends_with("Winner: **Tacos**"));
}

#[test]
fn test_combined_cycle_without_suggestions_closes() {
    let mut w = World::new();
    let start = w.now();
    w.controller.start_combined("10m", "5m").unwrap();
    w.run_until(start + 10 * MINUTE);

    assert_eq!(w.controller.phase(), Phase::Closed);
    assert_eq!(w.scheduler.pending(), 0);
    let texts = w.drain_texts();
    assert!(texts.last().unwrap().starts_with("No suggestions were submitted"));
}

#[test]
fn test_stop_voting_just_before_deadline() {
    let mut w = World::new();
    w.controller.start_suggestions("10m").unwrap();
    w.controller.submit_suggestion("Pizza", "alice").unwrap();
    w.controller.start_voting("5m").unwrap();
    let voting_start = w.now();
    w.controller.cast_vote("v1", 0).unwrap();

    w.run_until(voting_start + 5 * MINUTE - 1);
    w.drain();
    w.controller.stop_voting().unwrap();
    let texts = w.drain_texts();
    assert_eq!(texts.len(), 2);
    assert_eq!(texts[0], "Voting period was stopped.");
    assert!(texts[1].ends_with("Winner: **Pizza**"));

    // The deadline instant passes without a terminal notification or a
    // second report
    w.run_until(voting_start + 10 * MINUTE);
    assert!(w.drain().is_empty());
    assert_eq!(w.scheduler.pending(), 0);
}

#[test]
fn test_countdown_reminders_for_long_phase() {
    let mut w = World::new();
    let start = w.now();
    w.controller.start_suggestions("1h40m").unwrap();
    w.drain();

    w.run_until(start + 10 * MINUTE);
    let contents = w.drain();
    assert_eq!(contents.len(), 1);
    match &contents[0] {
        MessageContent::Countdown { phase, text, .. } => {
            assert_eq!(*phase, PhaseKind::Suggestions);
            assert_eq!(text, "Suggestion period: time remaining 1h 30m 0s");
        }
        other => panic!("expected countdown, got {:?}", other),
    }

    w.run_until(start + 100 * MINUTE);
    let texts = w.drain_texts();
    // Eight more reminders, the final warning, then the terminal message
    assert_eq!(texts.len(), 10);
    assert_eq!(texts[7], "Suggestion period: time remaining 10m 0s");
    assert_eq!(texts[8], "Suggestion period: less than 1 minute remaining!");
    assert_eq!(texts[9], "Suggestion period has ended.");
}

#[test]
fn test_year_long_cycle_runs_to_completion() {
    let mut w = World::new();
    let start = w.now();
    w.controller.start_suggestions("365d").unwrap();
    w.controller.submit_suggestion("Pizza", "alice").unwrap();
    w.drain();

    let year = 365 * 24 * 60 * MINUTE;
    w.run_until(start + year);
    assert_eq!(w.controller.phase(), Phase::Idle);
    let texts = w.drain_texts();
    assert_eq!(texts.len(), 11);
    assert_eq!(texts.last().unwrap(), "Suggestion period has ended.");
}

#[test]
fn test_reset_is_idempotent() {
    let mut w = World::new();
    w.controller.reset().unwrap();
    w.controller.reset().unwrap();
    assert_eq!(w.controller.phase(), Phase::Idle);

    w.controller.start_combined("10m", "5m").unwrap();
    w.controller.submit_suggestion("Pizza", "alice").unwrap();
    w.controller.reset().unwrap();
    w.controller.reset().unwrap();
    assert_eq!(w.controller.phase(), Phase::Idle);
    assert!(w.controller.suggestions().is_empty());
    assert!(w.controller.votes().is_empty());
    assert_eq!(w.scheduler.pending(), 0);
    assert_eq!(w.store.get(SUGGESTIONS_KEY), Some(json!([])));
}

#[test]
fn test_restart_restores_stores_but_not_phase() {
    let store = Arc::new(MemoryStore::new());
    store.insert_raw(
        SUGGESTIONS_KEY,
        json!([
            {"text": "Pizza", "submitterId": "alice"},
            {"text": "pizza", "submitterId": "bob"},
            {"text": "Tacos", "submitterId": "bob"}
        ]),
    );
    store.insert_raw(VOTES_KEY, json!({"v1": ["Pizza", "Pizza"]}));

    let w = World::with_store(store);
    assert_eq!(w.controller.phase(), Phase::Idle);
    assert_eq!(w.controller.suggestions().texts(), vec!["Pizza", "Tacos"]);
    assert_eq!(w.controller.votes().total_votes(), 1);
}

#[test]
fn test_storage_failure_does_not_block_the_cycle() {
    let mut w = World::new();
    w.store.set_failing(true);
    w.controller.start_suggestions("10m").unwrap();
    w.controller.submit_suggestion("Pizza", "alice").unwrap();
    assert_eq!(w.controller.suggestions().len(), 1);
}

#[test]
fn test_quota_rejections_leave_state_unchanged() {
    let mut w = World::new();
    w.controller.start_suggestions("10m").unwrap();
    for text in ["a", "b", "c", "d"] {
        w.controller.submit_suggestion(text, "alice").ok();
    }
    assert_eq!(w.controller.suggestions().count_by("alice"), 3);

    w.controller.start_voting("5m").unwrap();
    w.controller.cast_vote("v1", 0).unwrap();
    assert_eq!(
        w.controller.cast_vote("v1", 0).unwrap_err(),
        PollError::AlreadyVotedForThis("a".to_string())
    );
    assert_eq!(w.controller.votes().total_votes(), 1);
}

#[test]
fn test_tie_report() {
    let mut w = World::new();
    w.controller
        .start_voting_predefined("5m", &["A - x", "B - y", "C - z"])
        .unwrap();
    for voter in ["v1", "v2", "v3"] {
        w.controller.cast_vote(voter, 0).unwrap();
        w.controller.cast_vote(voter, 1).unwrap();
    }
    w.controller.cast_vote("v4", 2).unwrap();

    let report = w.controller.results().unwrap();
    assert!(report.ends_with("It's a tie between: **A**, **B**"));
    assert!(!report.contains("Winner"));
}

#[tokio::test]
async fn test_bot_countdown_is_edited_in_place() {
    let clock = Arc::new(ManualClock::new(0));
    let scheduler = Arc::new(ManualScheduler::new(clock.clone()));
    let controller = PollController::new(
        PollSettings::default(),
        clock.clone(),
        scheduler.clone(),
        Arc::new(MemoryStore::new()),
    );
    let channel = Arc::new(MemoryChannel::new());
    let settings = BotSection {
        suggest_channel: Some("ideas".to_string()),
        ..BotSection::default()
    };
    let mut bot = PollBot::new(controller, channel.clone(), settings);

    bot.handle_event(BotEvent::Message(InboundMessage::new(
        "admin",
        "mod",
        "!start-suggestions 2h",
    )))
    .await;
    channel.clear();

    while let Some((due, event)) = scheduler.pop_due(2 * 60 * MINUTE) {
        clock.set(due);
        bot.handle_timer(event).await;
    }

    let sent = channel.sent();
    assert_eq!(sent.len(), 11);
    assert!(matches!(&sent[0], Sent::Message { .. }));
    for op in &sent[1..9] {
        assert!(matches!(op, Sent::Edit { .. }), "expected edit, got {:?}", op);
    }
    // The final warning is a fresh message, not a countdown edit
    assert!(matches!(&sent[9], Sent::Message { text, .. } if text.contains("less than 1 minute")));
    assert!(matches!(&sent[10], Sent::Message { text, .. } if text == "Suggestion period has ended."));
    assert_eq!(bot.controller().phase(), Phase::Idle);

    let reply = bot.handle_vote(&VoteInteraction::new("ideas", "v1", "vote_0"));
    assert_eq!(reply, PollError::VotingClosed.to_string());
}
