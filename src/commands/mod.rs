//! Bot command parsing and execution.
//!
//! # Overview
//!
//! 1. **Parsing**: [`Commander::parse`] turns a Matrix message into a
//!    [`command::Command`]
//! 2. **Execution**: [`Commander::execute`] routes the command to its action
//!    handler, which calls the [`Tracker`](crate::tracker::Tracker)
//! 3. **Acknowledgement**: the returned [`CommandResult`] tells the bot what
//!    to reply and how to react
//!
//! ```text
//! Matrix Message → parse() → Command → execute() → CommandResult
//! ```
//!
//! # Command Structure
//!
//! All commands follow the format: `!taz <subcommand> [args...]`
//!
//! | Command | Arguments | Description |
//! |---------|-----------|-------------|
//! | `help` | None | Display help information |
//! | `status` | None | Show the bot time and uptime |
//! | `hive` | None | List shields and reinforcements |
//! | `shield` | `<duration>` | Shield yourself |
//! | `unshield` | None | Break your shield |
//! | `rein` | None | Reinforce |
//! | `recall` | None | Recall your reinforcement |
//! | `notify` | None | Mention everyone whose shield expired |
//! | `prune` | None | Remove expired shields, owners only |
//! | `track` | `<who> [<x>,<y>] [<hours>...]` | Track a prey |
//! | `lose` | `<who>` | Stop tracking a prey |
//! | `tracks` | None | List upcoming prey tiers |
//!
//! # Error Handling
//!
//! - **Silent Errors** ([`CommandParseError::NotForBot`]): regular chat or
//!   commands for another bot. No response.
//! - **User Errors** ([`CommandParseError::InvalidCommand`]): invalid syntax,
//!   answered with a usage message.

use chrono::{DateTime, Utc};

use crate::tracker::TrackerError;

mod actions;
pub mod command;
mod commander;
pub mod responses;

pub use crate::commands::commander::Commander;

/// Runtime context for command execution.
#[derive(Debug, Clone)]
pub struct CommandContext {
    /// Matrix user ID of the command issuer
    pub user_id: String,
    /// Name of the issuer shown in listings
    pub display_name: String,
    /// Whether the issuer may run privileged commands
    pub is_owner: bool,
    /// Time at which the command is handled
    pub now: DateTime<Utc>,
    /// Time at which the bot started
    pub started_at: DateTime<Utc>,
}

/// How the bot acknowledges a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// React with 🤖
    Success,
    /// React with ❌
    Failure,
    /// No reaction, the response says it all
    Neutral,
}

/// Result of command execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandResult {
    /// Markdown-formatted reply, if any
    pub response: Option<String>,
    /// Users mentioned by the reply
    pub mentions: Vec<String>,
    pub outcome: Outcome,
}

impl CommandResult {
    /// A silent success, acknowledged by a reaction only.
    pub fn success() -> Self {
        CommandResult {
            response: None,
            mentions: Vec::new(),
            outcome: Outcome::Success,
        }
    }

    /// A successful command answered with `response`.
    pub fn reply(response: String) -> Self {
        CommandResult {
            response: Some(response),
            mentions: Vec::new(),
            outcome: Outcome::Success,
        }
    }

    pub fn failure(response: String) -> Self {
        CommandResult {
            response: Some(response),
            mentions: Vec::new(),
            outcome: Outcome::Failure,
        }
    }
}

impl From<TrackerError> for CommandResult {
    /// Nothing to do is not a failure: it is answered without a reaction.
    fn from(error: TrackerError) -> Self {
        match error {
            TrackerError::NoOp(message) => CommandResult {
                response: Some(message),
                mentions: Vec::new(),
                outcome: Outcome::Neutral,
            },
            error => CommandResult::failure(error.to_string()),
        }
    }
}

/// Errors that can occur during command parsing.
#[derive(Debug, PartialEq, Eq)]
pub enum CommandParseError {
    /// Message is not for this bot (silent error)
    NotForBot,
    /// Invalid command syntax with error message
    InvalidCommand(String),
}
