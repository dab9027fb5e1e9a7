//! Message delivery.
//!
//! Drains outbound messages into a [`Channel`]. Failures are logged and
//! skipped; they never reach back into poll state.

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::channels::{Channel, ChannelResult, MessageRef};
use crate::messages::{MessageContent, OutboundMessage};
use crate::polls::PhaseKind;

/// Tracks the countdown message of each running phase so reminders edit
/// it in place instead of flooding the channel.
#[derive(Debug, Default)]
pub struct CountdownBoard {
    slots: HashMap<PhaseKind, (u64, MessageRef)>,
}

impl CountdownBoard {
    /// Create an empty board
    pub fn new() -> Self {
        Self::default()
    }

    /// Countdown message of a phase instance, if one was posted
    pub fn get(&self, phase: PhaseKind, epoch: u64) -> Option<&MessageRef> {
        self.slots
            .get(&phase)
            .filter(|(slot_epoch, _)| *slot_epoch == epoch)
            .map(|(_, message)| message)
    }

    fn set(&mut self, phase: PhaseKind, epoch: u64, message: MessageRef) {
        self.slots.insert(phase, (epoch, message));
    }
}

/// Counts from one delivery pass
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryReport {
    pub delivered: usize,
    pub failed: usize,
}

/// Deliver messages in order.
pub async fn deliver_all(
    channel: &dyn Channel,
    board: &mut CountdownBoard,
    messages: Vec<OutboundMessage>,
) -> DeliveryReport {
    let mut report = DeliveryReport::default();
    for message in messages {
        match deliver_message(channel, board, &message).await {
            Ok(()) => report.delivered += 1,
            Err(e) => {
                report.failed += 1;
                warn!(
                    channel = %message.channel_id,
                    error = %e,
                    "failed to deliver notification"
                );
            }
        }
    }
    report
}

/// Deliver one message, dispatching on its content.
async fn deliver_message(
    channel: &dyn Channel,
    board: &mut CountdownBoard,
    message: &OutboundMessage,
) -> ChannelResult<()> {
    match &message.content {
        MessageContent::Text { text } => {
            channel.send_message(&message.channel_id, text).await?;
        }
        MessageContent::Choices { header, choices } => {
            channel
                .send_choices(&message.channel_id, header, choices)
                .await?;
        }
        MessageContent::Countdown { phase, epoch, text } => {
            if let Some(existing) = board.get(*phase, *epoch).cloned() {
                match channel.edit_message(&existing, text).await {
                    Ok(()) => return Ok(()),
                    Err(e) => {
                        // The message may have been deleted; post a fresh one
                        debug!(message = %existing, error = %e, "countdown edit failed, reposting");
                    }
                }
            }
            let posted = channel.send_message(&message.channel_id, text).await?;
            board.set(*phase, *epoch, posted);
        }
    }
    Ok(())
}
