//! CLI subcommand definitions and handlers.
//!
//! Uses clap derive to define the subcommand hierarchy:
//! - `run` (default) -- run the poll bot on the console
//! - `parse-duration` -- check a duration string
//! - `results` -- tally the persisted suggestions and votes
//! - `config show|path|schema` -- inspect configuration
//! - `version` -- print build/version info

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Poll bot: timed suggestions, button voting, result tallies.
#[derive(Parser, Debug)]
#[command(
    name = "ballot",
    version = env!("CARGO_PKG_VERSION"),
    about = "ballot - a poll bot for suggestion and voting rounds"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the bot with the terminal as chat (default when no subcommand is given).
    ///
    /// Input lines: `<channel> <user> <text>`, or `click <channel> <user> vote_<n>`.
    Run,

    /// Parse a duration such as `1d2h30m` and print it in milliseconds.
    ParseDuration {
        /// Duration string
        input: String,
    },

    /// Print the tally of the persisted suggestions and votes.
    Results {
        /// Snapshot directory (default: from config).
        #[arg(long)]
        data_dir: Option<PathBuf>,
    },

    /// Inspect configuration.
    #[command(subcommand)]
    Config(ConfigCommand),

    /// Print version information.
    Version,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Print the fully loaded configuration as JSON.
    Show,

    /// Print the resolved configuration file path.
    Path,

    /// Print the configuration JSON schema.
    Schema,
}

// ---------------------------------------------------------------------------
// Subcommand handlers
// ---------------------------------------------------------------------------

use crate::bot::PollBot;
use crate::channels::console::parse_console_line;
use crate::channels::ConsoleChannel;
use crate::config::{self, BotConfig};
use crate::polls::{aggregate, format_duration, parse_duration, PollController, SuggestionStore, VoteStore};
use crate::scheduler::{SystemClock, TokioScheduler};
use crate::storage::JsonFileStore;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Run the `config show` subcommand.
pub fn handle_config_show() -> Result<(), Box<dyn std::error::Error>> {
    let cfg = config::load_config()?;
    let pretty = serde_json::to_string_pretty(&cfg)?;
    println!("{}", pretty);
    Ok(())
}

/// Run the `config path` subcommand.
pub fn handle_config_path() {
    println!("{}", config::get_config_path().display());
}

/// Run the `config schema` subcommand.
pub fn handle_config_schema() -> Result<(), Box<dyn std::error::Error>> {
    let schema = config::generate_config_schema();
    println!("{}", serde_json::to_string_pretty(&schema)?);
    Ok(())
}

/// Run the `parse-duration` subcommand.
pub fn handle_parse_duration(input: &str) -> Result<(), Box<dyn std::error::Error>> {
    let duration = parse_duration(input)?;
    println!("{} ms ({})", duration.as_millis(), format_duration(duration));
    Ok(())
}

/// Run the `results` subcommand.
pub fn handle_results(data_dir: Option<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    let cfg = config::load_config()?;
    println!("{}", render_persisted_results(&cfg, data_dir));
    Ok(())
}

/// Tally the snapshots in the configured (or given) data directory
pub fn render_persisted_results(cfg: &BotConfig, data_dir: Option<PathBuf>) -> String {
    let dir = data_dir.unwrap_or_else(|| cfg.storage.resolve_data_dir());
    let store = Arc::new(JsonFileStore::new(dir));
    let suggestions = SuggestionStore::restore(cfg.polls.clone(), store.clone());
    let votes = VoteStore::restore(cfg.polls.clone(), store);
    aggregate(&suggestions.texts(), &votes).render()
}

/// Run the `run` subcommand: the bot on stdin/stdout until EOF or Ctrl-C.
pub async fn handle_run(cfg: BotConfig) -> Result<(), Box<dyn std::error::Error>> {
    let data_dir = cfg.storage.resolve_data_dir();
    info!(data_dir = %data_dir.display(), "starting console poll bot");

    let store = Arc::new(JsonFileStore::new(data_dir));
    let (scheduler, timers) = TokioScheduler::new();
    let controller = PollController::new(
        cfg.polls.clone(),
        Arc::new(SystemClock),
        Arc::new(scheduler),
        store,
    );
    let bot = PollBot::new(controller, Arc::new(ConsoleChannel::new()), cfg.bot.clone());

    let (tx, rx) = mpsc::channel(64);
    let shutdown = CancellationToken::new();

    let reader_shutdown = shutdown.clone();
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => match parse_console_line(&line) {
                    Some(event) => {
                        if tx.send(event).await.is_err() {
                            break;
                        }
                    }
                    None if line.trim().is_empty() => {}
                    None => warn!(line = %line, "unrecognized input line"),
                },
                Ok(None) => break,
                Err(e) => {
                    warn!(error = %e, "failed to read stdin");
                    break;
                }
            }
        }
        reader_shutdown.cancel();
    });

    let signal_shutdown = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            signal_shutdown.cancel();
        }
    });

    bot.run(rx, timers, shutdown).await;
    Ok(())
}

/// Run the `version` subcommand.
pub fn handle_version() {
    println!("ballot {}", env!("CARGO_PKG_VERSION"));
    println!(
        "  Platform:   {} ({})",
        std::env::consts::OS,
        std::env::consts::ARCH
    );
}
