//! Console Channel
//!
//! Prints bot output to stdout. Backs the `ballot run` command, where the
//! terminal stands in for the chat platform.
//!
//! Input lines have the form `<channel> <user> <text>`. A button click is
//! `click <channel> <user> <vote id>`. A literal `\n` in the text becomes
//! a line break so multi-line commands fit on one line.

use super::r#trait::{Channel, ChannelResult, MessageRef};
use crate::bot::{BotEvent, InboundMessage, VoteInteraction};
use crate::messages::Choice;
use async_trait::async_trait;
use tokio::io::{AsyncWriteExt, Stdout};
use tokio::sync::Mutex;
use uuid::Uuid;

/// Channel that writes to the terminal
pub struct ConsoleChannel {
    out: Mutex<Stdout>,
}

impl Default for ConsoleChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl ConsoleChannel {
    /// Create a console channel on stdout
    pub fn new() -> Self {
        Self {
            out: Mutex::new(tokio::io::stdout()),
        }
    }

    async fn write(&self, text: String) -> ChannelResult<()> {
        let mut out = self.out.lock().await;
        out.write_all(text.as_bytes())
            .await
            .map_err(|e| super::ChannelError::SendFailed(e.to_string()))?;
        out.flush()
            .await
            .map_err(|e| super::ChannelError::SendFailed(e.to_string()))
    }
}

/// Parse one console input line into a bot event
pub fn parse_console_line(line: &str) -> Option<BotEvent> {
    let line = line.trim();
    if let Some(rest) = line.strip_prefix("click ") {
        let mut parts = rest.split_whitespace();
        let (channel, user, choice) = (parts.next()?, parts.next()?, parts.next()?);
        if parts.next().is_some() {
            return None;
        }
        return Some(BotEvent::Vote(VoteInteraction::new(channel, user, choice)));
    }

    let (channel, rest) = line.split_once(char::is_whitespace)?;
    let (user, text) = rest.trim_start().split_once(char::is_whitespace)?;
    let text = text.trim().replace("\\n", "\n");
    if text.is_empty() {
        return None;
    }
    Some(BotEvent::Message(InboundMessage::new(channel, user, text)))
}

fn new_ref(channel_id: &str) -> MessageRef {
    MessageRef::new(channel_id, Uuid::new_v4().simple().to_string())
}

fn short(message: &MessageRef) -> &str {
    message.message_id.get(..8).unwrap_or(&message.message_id)
}

#[async_trait]
impl Channel for ConsoleChannel {
    async fn send_message(&self, channel_id: &str, content: &str) -> ChannelResult<MessageRef> {
        let message = new_ref(channel_id);
        self.write(format!("[#{} {}] {}\n", channel_id, short(&message), content))
            .await?;
        Ok(message)
    }

    async fn edit_message(&self, message: &MessageRef, content: &str) -> ChannelResult<()> {
        self.write(format!(
            "[#{} {} edited] {}\n",
            message.channel_id,
            short(message),
            content
        ))
        .await
    }

    async fn send_choices(
        &self,
        channel_id: &str,
        header: &str,
        choices: &[Choice],
    ) -> ChannelResult<MessageRef> {
        let message = new_ref(channel_id);
        let mut text = format!("[#{} {}] {}\n", channel_id, short(&message), header);
        for choice in choices {
            text.push_str(&format!("    [{}] {}\n", choice.id, choice.label));
        }
        self.write(text).await?;
        Ok(message)
    }
}
