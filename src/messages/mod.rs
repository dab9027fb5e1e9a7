//! Outbound notifications
//!
//! The poll engine never talks to a channel directly. Every notification it
//! produces is queued in an [`Outbox`] and delivered by the bot runtime
//! after the event that produced it has been fully handled.

pub mod delivery;

use crate::polls::PhaseKind;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// A clickable voting option
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choice {
    /// Stable identifier (`vote_{index}`)
    pub id: String,
    /// Button label
    pub label: String,
}

/// Type of message content
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessageContent {
    /// Plain text message
    Text { text: String },
    /// Countdown reminder; edited in place for the same phase instance
    Countdown {
        phase: PhaseKind,
        epoch: u64,
        text: String,
    },
    /// A set of voting buttons
    Choices { header: String, choices: Vec<Choice> },
}

impl MessageContent {
    /// Create a text message content
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    /// Text shown for this content (header for choices)
    pub fn as_text(&self) -> &str {
        match self {
            Self::Text { text } | Self::Countdown { text, .. } => text,
            Self::Choices { header, .. } => header,
        }
    }
}

/// An outbound message to be delivered
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundMessage {
    /// Target channel ID
    pub channel_id: String,
    /// Message content
    pub content: MessageContent,
}

impl OutboundMessage {
    /// Create a new outbound message
    pub fn new(channel_id: impl Into<String>, content: MessageContent) -> Self {
        Self {
            channel_id: channel_id.into(),
            content,
        }
    }
}

/// FIFO of notifications waiting for delivery
#[derive(Debug, Default)]
pub struct Outbox {
    queue: VecDeque<OutboundMessage>,
}

impl Outbox {
    /// Create an empty outbox
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a message
    pub fn push(&mut self, message: OutboundMessage) {
        self.queue.push_back(message);
    }

    /// Queue a plain text message
    pub fn text(&mut self, channel_id: &str, text: impl Into<String>) {
        self.push(OutboundMessage::new(channel_id, MessageContent::text(text)));
    }

    /// Take everything queued so far
    pub fn drain(&mut self) -> Vec<OutboundMessage> {
        self.queue.drain(..).collect()
    }

    /// Number of queued messages
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Whether nothing is queued
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}
