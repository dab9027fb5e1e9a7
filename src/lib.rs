//! ballotbox poll bot library
//!
//! Runs suggestion-then-vote polls in a chat channel: a timed suggestion
//! period, button voting over the collected suggestions and a tally of the
//! results. The chat platform sits behind the [`channels::Channel`] trait.

pub mod bot;
pub mod channels;
pub mod cli;
pub mod config;
pub mod logging;
pub mod messages;
pub mod polls;
pub mod scheduler;
pub mod storage;
