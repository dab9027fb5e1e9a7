//! Messaging channels
//!
//! The chat platform is an external collaborator; the bot only needs to
//! send, edit and render choices.

pub mod console;
pub mod memory;
pub mod r#trait;

pub use console::ConsoleChannel;
pub use memory::{MemoryChannel, Sent};
pub use r#trait::{Channel, ChannelError, ChannelResult, DynChannel, MessageRef};
