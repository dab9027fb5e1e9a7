//! In-memory Channel
//!
//! Records everything sent through it. Used by tests and by callers that
//! want to inspect bot output programmatically.

use super::r#trait::{Channel, ChannelError, ChannelResult, MessageRef};
use crate::messages::Choice;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// One recorded channel operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sent {
    /// A new message
    Message {
        message: MessageRef,
        text: String,
    },
    /// An edit of an earlier message
    Edit {
        message: MessageRef,
        text: String,
    },
    /// A choice set
    Choices {
        message: MessageRef,
        header: String,
        choices: Vec<Choice>,
    },
}

impl Sent {
    /// Text carried by the operation
    pub fn text(&self) -> &str {
        match self {
            Self::Message { text, .. } | Self::Edit { text, .. } => text,
            Self::Choices { header, .. } => header,
        }
    }
}

/// Channel that keeps a log of operations
#[derive(Debug, Default)]
pub struct MemoryChannel {
    log: Mutex<Vec<Sent>>,
    next_id: AtomicU64,
    failing: AtomicBool,
}

impl MemoryChannel {
    /// Create an empty channel
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent operation fail
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Snapshot of the log
    pub fn sent(&self) -> Vec<Sent> {
        self.log.lock().clone()
    }

    /// Texts of every operation, in order
    pub fn texts(&self) -> Vec<String> {
        self.log.lock().iter().map(|s| s.text().to_string()).collect()
    }

    /// Clear the log
    pub fn clear(&self) {
        self.log.lock().clear();
    }

    fn check(&self) -> ChannelResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            Err(ChannelError::SendFailed("channel offline".to_string()))
        } else {
            Ok(())
        }
    }

    fn next_ref(&self, channel_id: &str) -> MessageRef {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        MessageRef::new(channel_id, format!("m{}", id))
    }
}

#[async_trait]
impl Channel for MemoryChannel {
    async fn send_message(&self, channel_id: &str, content: &str) -> ChannelResult<MessageRef> {
        self.check()?;
        let message = self.next_ref(channel_id);
        self.log.lock().push(Sent::Message {
            message: message.clone(),
            text: content.to_string(),
        });
        Ok(message)
    }

    async fn edit_message(&self, message: &MessageRef, content: &str) -> ChannelResult<()> {
        self.check()?;
        self.log.lock().push(Sent::Edit {
            message: message.clone(),
            text: content.to_string(),
        });
        Ok(())
    }

    async fn send_choices(
        &self,
        channel_id: &str,
        header: &str,
        choices: &[Choice],
    ) -> ChannelResult<MessageRef> {
        self.check()?;
        let message = self.next_ref(channel_id);
        self.log.lock().push(Sent::Choices {
            message: message.clone(),
            header: header.to_string(),
            choices: choices.to_vec(),
        });
        Ok(message)
    }
}
