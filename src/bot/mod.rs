//! Poll bot
//!
//! Text commands, suggestion messages and vote clicks in; replies and
//! poll notifications out.

pub mod commands;
pub mod runtime;

pub use commands::{help_text, parse_command, Command, CommandError};
pub use runtime::{BotEvent, InboundMessage, PollBot, VoteInteraction};
