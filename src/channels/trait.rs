//! Channel Trait
//!
//! Defines the interface the bot needs from a chat platform.

use crate::messages::Choice;
use async_trait::async_trait;
use std::sync::Arc;

/// Result type for channel operations
pub type ChannelResult<T> = Result<T, ChannelError>;

/// Errors that can occur in channel operations
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("Message send failed: {0}")]
    SendFailed(String),

    #[error("Message edit failed: {0}")]
    EditFailed(String),

    #[error("Unknown channel: {0}")]
    UnknownChannel(String),

    #[error("Rate limited: retry after {0}s")]
    RateLimited(u64),

    #[error("Channel error: {0}")]
    Other(String),
}

/// Reference to a delivered message, used for edits
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MessageRef {
    /// Channel the message lives in
    pub channel_id: String,
    /// Platform message ID
    pub message_id: String,
}

impl MessageRef {
    /// Create a message reference
    pub fn new(channel_id: impl Into<String>, message_id: impl Into<String>) -> Self {
        Self {
            channel_id: channel_id.into(),
            message_id: message_id.into(),
        }
    }
}

impl std::fmt::Display for MessageRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.channel_id, self.message_id)
    }
}

/// Messaging operations the poll bot relies on
#[async_trait]
pub trait Channel: Send + Sync {
    /// Post a text message
    async fn send_message(&self, channel_id: &str, content: &str) -> ChannelResult<MessageRef>;

    /// Replace the text of a previously sent message
    async fn edit_message(&self, message: &MessageRef, content: &str) -> ChannelResult<()>;

    /// Post a header with one clickable element per choice
    async fn send_choices(
        &self,
        channel_id: &str,
        header: &str,
        choices: &[Choice],
    ) -> ChannelResult<MessageRef>;
}

/// Type-erased channel for storage
pub type DynChannel = Arc<dyn Channel>;
