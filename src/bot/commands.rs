//! Text command parsing
//!
//! Commands are single messages starting with the configured prefix
//! (`!` by default). `start-voting-predefined` carries its suggestions on
//! the lines after the command line.

use thiserror::Error;

/// A parsed bot command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    SetSuggestChannel(String),
    StartSuggestions(String),
    StopSuggestions,
    StartVoting(String),
    StopVoting,
    StartCombined { suggest: String, vote: String },
    StopCombined,
    StartVotingPredefined { duration: String, lines: Vec<String> },
    Results,
    Reset,
    Status,
    Help,
}

impl Command {
    /// Command name as typed after the prefix
    pub fn name(&self) -> &'static str {
        match self {
            Self::SetSuggestChannel(_) => "set-suggest-channel",
            Self::StartSuggestions(_) => "start-suggestions",
            Self::StopSuggestions => "stop-suggestions",
            Self::StartVoting(_) => "start-voting",
            Self::StopVoting => "stop-voting",
            Self::StartCombined { .. } => "start-combined",
            Self::StopCombined => "stop-combined",
            Self::StartVotingPredefined { .. } => "start-voting-predefined",
            Self::Results => "results",
            Self::Reset => "reset",
            Self::Status => "status",
            Self::Help => "help",
        }
    }
}

/// Command parse failures, shown to the caller as the reply
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("Unknown command `{prefix}{name}`. Try `{prefix}help`.")]
    Unknown { prefix: String, name: String },

    #[error("Usage: `{prefix}{usage}`")]
    Usage { prefix: String, usage: &'static str },
}

fn usage(name: &str) -> &'static str {
    match name {
        "set-suggest-channel" => "set-suggest-channel <channel>",
        "start-suggestions" => "start-suggestions <duration>",
        "start-voting" => "start-voting <duration>",
        "start-combined" => "start-combined <suggest duration> <vote duration>",
        "start-voting-predefined" => {
            "start-voting-predefined <duration>, then one `Suggestion - Submitter` per line"
        }
        _ => "help",
    }
}

/// Parse a message. Returns `None` when it is not a command at all.
pub fn parse_command(prefix: &str, text: &str) -> Option<Result<Command, CommandError>> {
    let text = text.trim_start();
    let rest = text.strip_prefix(prefix)?;
    let (first_line, body) = match rest.split_once('\n') {
        Some((first, body)) => (first, Some(body)),
        None => (rest, None),
    };
    let mut words = first_line.split_whitespace();
    let name = words.next()?.to_lowercase();
    let args: Vec<&str> = words.collect();

    let bad_usage = || CommandError::Usage {
        prefix: prefix.to_string(),
        usage: usage(&name),
    };
    let one_arg = || match args.as_slice() {
        [arg] => Ok(arg.to_string()),
        _ => Err(bad_usage()),
    };
    let no_args = |command: Command| {
        if args.is_empty() {
            Ok(command)
        } else {
            Err(CommandError::Usage {
                prefix: prefix.to_string(),
                usage: command.name(),
            })
        }
    };

    let parsed = match name.as_str() {
        "set-suggest-channel" => one_arg().map(Command::SetSuggestChannel),
        "start-suggestions" => one_arg().map(Command::StartSuggestions),
        "stop-suggestions" => no_args(Command::StopSuggestions),
        "start-voting" => one_arg().map(Command::StartVoting),
        "stop-voting" => no_args(Command::StopVoting),
        "start-combined" => match args.as_slice() {
            [suggest, vote] => Ok(Command::StartCombined {
                suggest: suggest.to_string(),
                vote: vote.to_string(),
            }),
            _ => Err(bad_usage()),
        },
        "stop-combined" => no_args(Command::StopCombined),
        "start-voting-predefined" => one_arg().map(|duration| Command::StartVotingPredefined {
            duration,
            lines: body
                .map(|b| b.lines().map(str::to_string).collect())
                .unwrap_or_default(),
        }),
        "results" => no_args(Command::Results),
        "reset" => no_args(Command::Reset),
        "status" => no_args(Command::Status),
        "help" => Ok(Command::Help),
        _ => Err(CommandError::Unknown {
            prefix: prefix.to_string(),
            name: name.clone(),
        }),
    };
    Some(parsed)
}

/// Command reference shown by `help`
pub fn help_text(prefix: &str) -> String {
    let entries = [
        ("set-suggest-channel <channel>", "Set the channel suggestions are collected in"),
        ("start-suggestions <duration>", "Open a suggestion period"),
        ("stop-suggestions", "Close the suggestion period early"),
        ("start-voting <duration>", "Open voting on the collected suggestions"),
        ("stop-voting", "Close voting early and publish the results"),
        (
            "start-combined <duration> <duration>",
            "Suggestion period that runs straight into voting",
        ),
        ("stop-combined", "Stop a combined poll"),
        (
            "start-voting-predefined <duration>",
            "Vote on the following lines, one `Suggestion - Submitter` each",
        ),
        ("results", "Show the current tally"),
        ("status", "Show the current phase and counts"),
        ("reset", "Cancel everything and clear suggestions and votes"),
        ("help", "Show this message"),
    ];
    let mut out = String::from("**Poll bot commands**\n");
    for (usage, description) in entries {
        out.push_str(&format!("`{}{}` - {}\n", prefix, usage, description));
    }
    out.push_str("\nDurations look like `1d2h30m`, `2h` or `45m`.");
    out
}
