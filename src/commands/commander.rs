//! Command orchestration and execution.
//!
//! The [`Commander`] is the entry point for processing bot commands: it parses
//! message text and routes the resulting [`Command`] to its handler.
//!
//! # Examples
//!
//! ```no_run
//! # use chrono::Utc;
//! # use tazdingo::commands::{Commander, CommandContext};
//! # use tazdingo::registry::JsonStore;
//! # use tazdingo::tracker::Tracker;
//! # async fn example() -> anyhow::Result<()> {
//! let commander = Commander::new();
//! let mut tracker = Tracker::load(JsonStore::open("./data").await?, true).await?;
//!
//! let command = commander.parse("!taz shield 8").unwrap();
//! let context = CommandContext {
//!     user_id: "@user:example.com".to_string(),
//!     display_name: "User".to_string(),
//!     is_owner: false,
//!     now: Utc::now(),
//!     started_at: Utc::now(),
//! };
//! let result = commander.execute(&command, &context, &mut tracker).await;
//! # Ok(())
//! # }
//! ```

use command_parser::Parser;

use crate::{
    commands::{
        CommandContext, CommandParseError, CommandResult,
        actions::{
            handle_help, handle_hive, handle_lose, handle_notify, handle_prune, handle_recall,
            handle_rein, handle_shield, handle_status, handle_track, handle_tracks, handle_unshield,
        },
        command::{Command, format_command_error},
    },
    registry::Store,
    tracker::Tracker,
};

/// Command orchestrator for parsing and executing bot commands.
///
/// All commands must start with the `!taz` prefix. Messages without this
/// prefix are silently ignored (returning [`CommandParseError::NotForBot`]).
pub struct Commander {
    /// Command parser for processing user commands
    parser: Parser,
}

impl Default for Commander {
    fn default() -> Self {
        Self::new()
    }
}

impl Commander {
    /// Creates a new Commander, with `!` as the command prefix and `-` as
    /// the option prefix.
    pub fn new() -> Self {
        let parser = Parser::new('!', '-');
        Commander { parser }
    }

    /// Parses a Matrix message body into a structured command.
    ///
    /// # Returns
    ///
    /// * `Ok(Command)` - Successfully parsed and validated command
    /// * `Err(CommandParseError::NotForBot)` - Message is not a command or for a different bot
    /// * `Err(CommandParseError::InvalidCommand)` - Command syntax is invalid, with a usage message
    pub fn parse(&self, body: &str) -> Result<Command, CommandParseError> {
        Command::parse(&self.parser, body).map_err(|error| match format_command_error(error) {
            Some(message) => CommandParseError::InvalidCommand(message),
            None => CommandParseError::NotForBot,
        })
    }

    /// Executes a parsed command against `tracker`.
    pub async fn execute<S: Store>(
        &self,
        command: &Command,
        context: &CommandContext,
        tracker: &mut Tracker<S>,
    ) -> CommandResult {
        match command {
            Command::Help => handle_help(tracker.prey_tracking()),
            Command::Status => handle_status(context),
            Command::Hive => handle_hive(context, tracker),
            Command::Shield(seconds) => handle_shield(context, tracker, *seconds).await,
            Command::Unshield => handle_unshield(context, tracker).await,
            Command::Rein => handle_rein(context, tracker).await,
            Command::Recall => handle_recall(context, tracker).await,
            Command::Notify => handle_notify(context, tracker),
            Command::Prune => handle_prune(context, tracker).await,
            Command::Track {
                target,
                coordinates,
                tiers,
            } => handle_track(context, tracker, target, *coordinates, tiers).await,
            Command::Lose(target) => handle_lose(context, tracker, target).await,
            Command::Tracks => handle_tracks(context, tracker),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, TimeDelta, Utc};

    use super::*;
    use crate::{commands::Outcome, registry::MockStore};

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-05-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn create_test_context(now: DateTime<Utc>) -> CommandContext {
        CommandContext {
            user_id: "@user:example.com".to_string(),
            display_name: "User".to_string(),
            is_owner: false,
            now,
            started_at: now - TimeDelta::hours(1),
        }
    }

    fn create_test_tracker() -> Tracker<MockStore> {
        let mut store = MockStore::new();
        store.expect_save().returning(|_| Ok(()));
        store.expect_delete().returning(|_| Ok(()));
        Tracker::new(store, true)
    }

    #[test]
    fn test_parse_valid_command() {
        let commander = Commander::new();
        assert_eq!(commander.parse("!taz hive"), Ok(Command::Hive));
    }

    #[test]
    fn test_parse_not_for_bot() {
        let commander = Commander::new();
        assert_eq!(commander.parse("Hello, world!"), Err(CommandParseError::NotForBot));
        assert_eq!(commander.parse("!other_bot help"), Err(CommandParseError::NotForBot));
    }

    #[test]
    fn test_parse_invalid_command() {
        let commander = Commander::new();
        assert!(matches!(
            commander.parse("!taz shield forever"),
            Err(CommandParseError::InvalidCommand(message)) if message.contains("Invalid shield")
        ));
    }

    #[tokio::test]
    async fn test_execute_shield_then_hive() {
        let commander = Commander::new();
        let mut tracker = create_test_tracker();
        let context = create_test_context(now());

        let command = commander.parse("!taz shield 2h").unwrap();
        let result = commander.execute(&command, &context, &mut tracker).await;
        assert_eq!(result, CommandResult::success());

        let command = commander.parse("!taz hive").unwrap();
        let result = commander.execute(&command, &context, &mut tracker).await;
        assert_eq!(result.response, Some("Shields:\n```\n2h User\n```".to_string()));
    }

    #[tokio::test]
    async fn test_execute_status() {
        let commander = Commander::new();
        let mut tracker = create_test_tracker();

        let result = commander
            .execute(&Command::Status, &create_test_context(now()), &mut tracker)
            .await;

        assert!(result.response.unwrap().ends_with("up 1h"));
    }

    #[tokio::test]
    async fn test_execute_track_all_tiers_then_tick() {
        let commander = Commander::new();
        let mut tracker = create_test_tracker();

        let command = commander.parse("!taz track bob 1,2").unwrap();
        let result = commander
            .execute(&command, &create_test_context(now()), &mut tracker)
            .await;
        assert_eq!(result.outcome, Outcome::Success);

        let notifications = tracker.tick(now() + TimeDelta::hours(4)).await;
        assert_eq!(notifications.len(), 1);
    }

    #[tokio::test]
    async fn test_execute_prune_not_owner() {
        let commander = Commander::new();
        let mut tracker = create_test_tracker();

        let result = commander
            .execute(&Command::Prune, &create_test_context(now()), &mut tracker)
            .await;

        assert_eq!(result.outcome, Outcome::Failure);
    }
}
