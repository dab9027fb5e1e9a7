//! Bot runtime
//!
//! One task owns the [`PollController`]. Chat events and timer firings are
//! handled strictly one at a time; after each, queued notifications are
//! delivered through the channel.

use super::commands::{help_text, parse_command, Command};
use crate::channels::DynChannel;
use crate::config::BotSection;
use crate::messages::delivery::{deliver_all, CountdownBoard};
use crate::polls::{parse_choice_id, ErrorKind, PollController, PollError, PollResult};
use crate::scheduler::TimerEvent;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// A chat message seen by the bot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub channel_id: String,
    pub user_id: String,
    pub text: String,
}

impl InboundMessage {
    /// Create a message
    pub fn new(
        channel_id: impl Into<String>,
        user_id: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            channel_id: channel_id.into(),
            user_id: user_id.into(),
            text: text.into(),
        }
    }
}

/// A click on a vote button
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoteInteraction {
    pub channel_id: String,
    pub voter_id: String,
    /// `vote_{index}` identifier carried by the button
    pub choice_id: String,
}

impl VoteInteraction {
    /// Create an interaction
    pub fn new(
        channel_id: impl Into<String>,
        voter_id: impl Into<String>,
        choice_id: impl Into<String>,
    ) -> Self {
        Self {
            channel_id: channel_id.into(),
            voter_id: voter_id.into(),
            choice_id: choice_id.into(),
        }
    }
}

/// Input to the bot loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BotEvent {
    Message(InboundMessage),
    Vote(VoteInteraction),
}

/// The poll bot: controller plus the channel it talks through
pub struct PollBot {
    controller: PollController,
    channel: DynChannel,
    board: CountdownBoard,
    settings: BotSection,
}

impl PollBot {
    /// Create a bot. The configured suggest channel, if any, is applied.
    pub fn new(mut controller: PollController, channel: DynChannel, settings: BotSection) -> Self {
        if let Some(suggest) = &settings.suggest_channel {
            if let Err(e) = controller.set_suggest_channel(suggest) {
                warn!(channel = %suggest, error = %e, "ignoring configured suggest channel");
            }
        }
        Self {
            controller,
            channel,
            board: CountdownBoard::new(),
            settings,
        }
    }

    /// The controller
    pub fn controller(&self) -> &PollController {
        &self.controller
    }

    /// Handle one chat event and deliver what it produced
    pub async fn handle_event(&mut self, event: BotEvent) {
        match event {
            BotEvent::Message(message) => {
                if let Some(reply) = self.handle_message(&message) {
                    self.reply(&message.channel_id, &reply).await;
                }
            }
            BotEvent::Vote(vote) => {
                let reply = self.handle_vote(&vote);
                self.reply(&vote.channel_id, &reply).await;
            }
        }
        self.flush().await;
    }

    /// Handle a timer firing and deliver what it produced
    pub async fn handle_timer(&mut self, event: TimerEvent) {
        self.controller.on_timer(event);
        self.flush().await;
    }

    /// Route a chat message. Returns the reply, if any.
    pub fn handle_message(&mut self, message: &InboundMessage) -> Option<String> {
        if let Some(parsed) = parse_command(&self.settings.command_prefix, &message.text) {
            if let Some(management) = &self.settings.management_channel {
                if management != &message.channel_id {
                    debug!(channel = %message.channel_id, "ignoring command outside management channel");
                    return None;
                }
            }
            let reply = match parsed {
                Ok(command) => {
                    let name = command.name();
                    info!(command = name, user = %message.user_id, "command received");
                    self.execute(command)
                        .unwrap_or_else(|e| rejection(name, &e))
                }
                Err(e) => e.to_string(),
            };
            return Some(reply);
        }

        if self.controller.suggest_channel() == Some(message.channel_id.as_str()) {
            return match self
                .controller
                .submit_suggestion(&message.text, &message.user_id)
            {
                Ok(reply) => Some(reply),
                // Ordinary chatter outside a suggestion period
                Err(PollError::SuggestionsClosed) => None,
                Err(e) => Some(rejection("suggest", &e)),
            };
        }
        None
    }

    /// Resolve a vote button click. Returns the reply to the voter.
    pub fn handle_vote(&mut self, vote: &VoteInteraction) -> String {
        let result = parse_choice_id(&vote.choice_id)
            .ok_or(PollError::UnknownSuggestion)
            .and_then(|index| self.controller.cast_vote(&vote.voter_id, index));
        result.unwrap_or_else(|e| rejection("vote", &e))
    }

    fn execute(&mut self, command: Command) -> PollResult<String> {
        match command {
            Command::SetSuggestChannel(channel) => self.controller.set_suggest_channel(&channel),
            Command::StartSuggestions(duration) => self.controller.start_suggestions(&duration),
            Command::StopSuggestions => self.controller.stop_suggestions(),
            Command::StartVoting(duration) => self.controller.start_voting(&duration),
            Command::StopVoting => self.controller.stop_voting(),
            Command::StartCombined { suggest, vote } => {
                self.controller.start_combined(&suggest, &vote)
            }
            Command::StopCombined => self.controller.stop_combined(),
            Command::StartVotingPredefined { duration, lines } => {
                let lines: Vec<&str> = lines.iter().map(String::as_str).collect();
                self.controller.start_voting_predefined(&duration, &lines)
            }
            Command::Results => self.controller.results(),
            Command::Reset => self.controller.reset(),
            Command::Status => Ok(self.controller.status().render()),
            Command::Help => Ok(help_text(&self.settings.command_prefix)),
        }
    }

    async fn reply(&self, channel_id: &str, text: &str) {
        if let Err(e) = self.channel.send_message(channel_id, text).await {
            warn!(channel = %channel_id, error = %e, "failed to send reply");
        }
    }

    /// Deliver every queued notification
    pub async fn flush(&mut self) {
        let messages = self.controller.take_outbox();
        if messages.is_empty() {
            return;
        }
        let report = deliver_all(self.channel.as_ref(), &mut self.board, messages).await;
        if report.failed > 0 {
            warn!(
                delivered = report.delivered,
                failed = report.failed,
                "some notifications were not delivered"
            );
        }
    }

    /// Run until `shutdown` fires or both queues close
    pub async fn run(
        mut self,
        mut events: mpsc::Receiver<BotEvent>,
        mut timers: mpsc::UnboundedReceiver<TimerEvent>,
        shutdown: CancellationToken,
    ) {
        info!("poll bot running");
        loop {
            // Queued input is drained before a shutdown request is honored
            tokio::select! {
                biased;
                Some(event) = events.recv() => self.handle_event(event).await,
                Some(timer) = timers.recv() => self.handle_timer(timer).await,
                _ = shutdown.cancelled() => break,
                else => break,
            }
        }
        info!("poll bot stopped");
    }
}

fn rejection(action: &str, error: &PollError) -> String {
    match error.kind() {
        ErrorKind::UserInput => debug!(action, error = %error, "request rejected"),
        ErrorKind::StateConflict => info!(action, error = %error, "request conflicts with poll state"),
    }
    error.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channels::{MemoryChannel, Sent};
    use crate::polls::PollSettings;
    use crate::scheduler::{ManualClock, ManualScheduler};
    use crate::storage::MemoryStore;
    use std::sync::Arc;

    fn bot(settings: BotSection) -> (PollBot, Arc<MemoryChannel>) {
        let clock = Arc::new(ManualClock::new(0));
        let scheduler = Arc::new(ManualScheduler::new(clock.clone()));
        let controller = PollController::new(
            PollSettings::default(),
            clock,
            scheduler,
            Arc::new(MemoryStore::new()),
        );
        let channel = Arc::new(MemoryChannel::new());
        (PollBot::new(controller, channel.clone(), settings), channel)
    }

    fn msg(channel: &str, user: &str, text: &str) -> BotEvent {
        BotEvent::Message(InboundMessage::new(channel, user, text))
    }

    #[tokio::test]
    async fn test_command_flow_over_channel() {
        let (mut bot, channel) = bot(BotSection::default());
        bot.handle_event(msg("admin", "mod", "!set-suggest-channel ideas")).await;
        bot.handle_event(msg("admin", "mod", "!start-suggestions 10m")).await;
        bot.handle_event(msg("ideas", "u1", "Pizza")).await;

        let texts = channel.texts();
        assert_eq!(texts[0], "Suggest channel set to #ideas.");
        assert_eq!(texts[1], "Suggestion period started for 10m.");
        assert!(texts[2].starts_with("Suggestion period is open for 10m!"));
        assert_eq!(texts[3], "Suggestion added: **Pizza**");
    }

    #[tokio::test]
    async fn test_chatter_outside_period_is_ignored() {
        let settings = BotSection {
            suggest_channel: Some("ideas".to_string()),
            ..BotSection::default()
        };
        let (mut bot, channel) = bot(settings);
        bot.handle_event(msg("ideas", "u1", "hello everyone")).await;
        assert!(channel.sent().is_empty());
    }

    #[tokio::test]
    async fn test_management_channel_filter() {
        let settings = BotSection {
            management_channel: Some("admin".to_string()),
            ..BotSection::default()
        };
        let (mut bot, channel) = bot(settings);
        bot.handle_event(msg("general", "u1", "!reset")).await;
        assert!(channel.sent().is_empty());

        bot.handle_event(msg("admin", "mod", "!reset")).await;
        assert_eq!(channel.texts(), vec!["Poll state has been reset."]);
    }

    #[tokio::test]
    async fn test_vote_buttons() {
        let settings = BotSection {
            suggest_channel: Some("ideas".to_string()),
            ..BotSection::default()
        };
        let (mut bot, channel) = bot(settings);
        bot.handle_event(msg("admin", "mod", "!start-voting-predefined 5m\nPizza - a\nTacos - b"))
            .await;

        let choices = channel
            .sent()
            .into_iter()
            .find_map(|s| match s {
                Sent::Choices { choices, .. } => Some(choices),
                _ => None,
            })
            .unwrap();
        assert_eq!(choices[1].id, "vote_1");

        let reply = bot.handle_vote(&VoteInteraction::new("ideas", "v1", "vote_1"));
        assert_eq!(reply, "Your vote for **Tacos** has been recorded.");
        let reply = bot.handle_vote(&VoteInteraction::new("ideas", "v1", "bogus"));
        assert_eq!(reply, PollError::UnknownSuggestion.to_string());
    }

    #[tokio::test]
    async fn test_errors_become_replies() {
        let (mut bot, channel) = bot(BotSection::default());
        bot.handle_event(msg("admin", "mod", "!start-suggestions 1h")).await;
        bot.handle_event(msg("admin", "mod", "!start-voting")).await;
        let texts = channel.texts();
        assert_eq!(texts[0], PollError::NoChannelConfigured.to_string());
        assert_eq!(texts[1], "Usage: `!start-voting <duration>`");
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let (bot, _channel) = bot(BotSection::default());
        let (_tx, rx) = mpsc::channel(8);
        let (_timer_tx, timer_rx) = mpsc::unbounded_channel();
        let shutdown = CancellationToken::new();
        shutdown.cancel();
        bot.run(rx, timer_rx, shutdown).await;
    }
}
