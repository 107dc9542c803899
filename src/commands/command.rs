//! Command parsing.
//!
//! This module turns Matrix message text into structured [`Command`] enums.
//! Only messages starting with `!taz` are considered.

use command_parser::{Command as ParserCommand, Parser};
use log::debug;

use crate::{
    commands::responses::{
        format_invalid_lose, format_invalid_shield, format_invalid_track, format_unknown_command,
    },
    registry::{Coordinates, Tier, TierSet},
    time::parse_duration,
};

/// Name of the bot command, as in `!taz help`.
pub const BOT_COMMAND: &str = "taz";

/// A parsed bot command.
#[derive(Debug, PartialEq, Eq)]
pub enum Command {
    /// Display help information
    Help,
    /// Show the bot time and uptime
    Status,
    /// List shields and reinforcements
    Hive,
    /// Shield the sender for a number of seconds
    Shield(u64),
    /// Remove the sender's shield
    Unshield,
    /// Mark the sender as reinforcing
    Rein,
    /// Recall the sender's reinforcement
    Recall,
    /// Mention every owner of an expired shield
    Notify,
    /// Remove every expired shield, owners only
    Prune,
    /// Start tracking a prey
    Track {
        target: String,
        coordinates: Option<Coordinates>,
        /// Requested tiers. Empty means every tier.
        tiers: TierSet,
    },
    /// Stop tracking a prey
    Lose(String),
    /// List upcoming prey tiers
    Tracks,
}

/// Errors that can occur during command parsing.
#[derive(Debug, PartialEq, Eq)]
pub enum CommandParsingError {
    /// The message could not be parsed as a command
    UnableToParse,
    /// The command is not for this bot (wrong prefix)
    NotTazdingo,
    /// The command is not recognized
    Unknown,
    /// The shield command has a missing or invalid duration
    InvalidShield,
    /// The track command has invalid arguments
    InvalidTrack,
    /// The lose command has no target
    InvalidLose,
}

impl Command {
    /// Parses a message string into a Command.
    ///
    /// # Errors
    ///
    /// - The message is not a command - [`CommandParsingError::UnableToParse`]
    /// - The command is for a different bot - [`CommandParsingError::NotTazdingo`]
    /// - The command is not recognized - [`CommandParsingError::Unknown`]
    /// - A command has invalid arguments - one of the `Invalid*` variants
    ///
    /// # Examples
    ///
    /// ```
    /// # use command_parser::Parser;
    /// # use tazdingo::commands::command::Command;
    /// let parser = Parser::new('!', '-');
    /// let result = Command::parse(&parser, "!taz shield 1d 2h");
    /// assert_eq!(result, Ok(Command::Shield(93_600)));
    /// ```
    pub fn parse(parser: &Parser, body: &str) -> Result<Self, CommandParsingError> {
        // For an unknown reason the parser ignores the last word, so we add a dummy word at the end
        let body = body.to_string() + " dummy";

        // This is normal to fails if the message is not a command
        let command = match parser.parse(&body) {
            Ok(cmd) => cmd,
            Err(_) => return Err(CommandParsingError::UnableToParse),
        };

        // Ignore commands that are not for the bot
        if command.name != BOT_COMMAND {
            return Err(CommandParsingError::NotTazdingo);
        }

        debug!("Parsing command: {:?}", command);

        // If no arguments, return help
        if command.arguments.is_empty() {
            return Ok(Command::Help);
        }

        match command.arguments[0].to_lowercase().as_str() {
            "help" | "commands" => Ok(Command::Help),
            "status" => Ok(Command::Status),
            "hive" => Ok(Command::Hive),
            "shield" => Ok(Command::Shield(Self::parse_shield(&command)?)),
            "unshield" => Ok(Command::Unshield),
            "rein" => Ok(Command::Rein),
            "recall" => Ok(Command::Recall),
            "notify" => Ok(Command::Notify),
            "prune" => Ok(Command::Prune),
            "track" => Self::parse_track(&command),
            "lose" => Ok(Command::Lose(Self::parse_lose(&command)?)),
            "tracks" => Ok(Command::Tracks),
            _ => Err(CommandParsingError::Unknown),
        }
    }

    fn parse_shield(command: &ParserCommand) -> Result<u64, CommandParsingError> {
        // The duration may span several words, e.g. `1d 2h`
        let duration = command.arguments[1..].join(" ");
        debug!("Parsing shield duration: {:?}", duration);

        parse_duration(&duration).ok_or(CommandParsingError::InvalidShield)
    }

    fn parse_track(command: &ParserCommand) -> Result<Command, CommandParsingError> {
        debug!("Parsing track command: {:?}", command);

        // At least 2 arguments: track and the target
        let Some(target) = command.arguments.get(1) else {
            return Err(CommandParsingError::InvalidTrack);
        };

        let mut rest = &command.arguments[2..];
        let mut coordinates = None;
        if let Some(first) = rest.first()
            && first.contains(',')
        {
            coordinates = Some(
                first
                    .parse::<Coordinates>()
                    .map_err(|_| CommandParsingError::InvalidTrack)?,
            );
            rest = &rest[1..];
        }

        let tiers = rest
            .iter()
            .map(|hours| {
                hours
                    .parse::<u64>()
                    .ok()
                    .and_then(|hours| Tier::try_from(hours).ok())
                    .ok_or(CommandParsingError::InvalidTrack)
            })
            .collect::<Result<TierSet, CommandParsingError>>()?;

        Ok(Command::Track {
            target: target.clone(),
            coordinates,
            tiers,
        })
    }

    fn parse_lose(command: &ParserCommand) -> Result<String, CommandParsingError> {
        // 2 arguments: lose and the target
        command
            .arguments
            .get(1)
            .cloned()
            .ok_or(CommandParsingError::InvalidLose)
    }
}

/// Formats a command error into a user-friendly message.
///
/// Errors raised by messages that are not meant for the bot produce no
/// message, so regular chat is never answered.
pub fn format_command_error(error: CommandParsingError) -> Option<String> {
    match error {
        CommandParsingError::Unknown => Some(format_unknown_command()),
        CommandParsingError::InvalidShield => Some(format_invalid_shield()),
        CommandParsingError::InvalidTrack => Some(format_invalid_track()),
        CommandParsingError::InvalidLose => Some(format_invalid_lose()),
        CommandParsingError::UnableToParse | CommandParsingError::NotTazdingo => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(body: &str) -> Result<Command, CommandParsingError> {
        Command::parse(&Parser::new('!', '-'), body)
    }

    #[test]
    fn test_parse_help_command() {
        assert_eq!(parse("!taz help"), Ok(Command::Help));
        assert_eq!(parse("!taz"), Ok(Command::Help));
    }

    #[test]
    fn test_parse_simple_commands() {
        assert_eq!(parse("!taz status"), Ok(Command::Status));
        assert_eq!(parse("!taz hive"), Ok(Command::Hive));
        assert_eq!(parse("!taz unshield"), Ok(Command::Unshield));
        assert_eq!(parse("!taz rein"), Ok(Command::Rein));
        assert_eq!(parse("!taz recall"), Ok(Command::Recall));
        assert_eq!(parse("!taz notify"), Ok(Command::Notify));
        assert_eq!(parse("!taz prune"), Ok(Command::Prune));
        assert_eq!(parse("!taz tracks"), Ok(Command::Tracks));
    }

    #[test]
    fn test_parse_shield_command() {
        assert_eq!(parse("!taz shield 8"), Ok(Command::Shield(28_800)));
        assert_eq!(parse("!taz shield 1d 2h"), Ok(Command::Shield(93_600)));
        assert_eq!(parse("!taz shield 30 minutes"), Ok(Command::Shield(1_800)));
    }

    #[test]
    fn test_parse_shield_command_invalid() {
        assert_eq!(parse("!taz shield"), Err(CommandParsingError::InvalidShield));
        assert_eq!(parse("!taz shield soon"), Err(CommandParsingError::InvalidShield));
        assert_eq!(parse("!taz shield 1s 1h"), Err(CommandParsingError::InvalidShield));
    }

    #[test]
    fn test_parse_track_command() {
        assert_eq!(
            parse("!taz track bob"),
            Ok(Command::Track {
                target: "bob".to_string(),
                coordinates: None,
                tiers: TierSet::new(),
            })
        );
        assert_eq!(
            parse("!taz track bob 120,45 8 24"),
            Ok(Command::Track {
                target: "bob".to_string(),
                coordinates: Some(Coordinates { x: 120, y: 45 }),
                tiers: [Tier::Eight, Tier::TwentyFour].into_iter().collect(),
            })
        );
        assert_eq!(
            parse("!taz track bob 4"),
            Ok(Command::Track {
                target: "bob".to_string(),
                coordinates: None,
                tiers: [Tier::Four].into_iter().collect(),
            })
        );
    }

    #[test]
    fn test_parse_track_command_invalid() {
        assert_eq!(parse("!taz track"), Err(CommandParsingError::InvalidTrack));
        assert_eq!(parse("!taz track bob 5"), Err(CommandParsingError::InvalidTrack));
        assert_eq!(parse("!taz track bob x,1"), Err(CommandParsingError::InvalidTrack));
        assert_eq!(parse("!taz track bob 1,2 four"), Err(CommandParsingError::InvalidTrack));
    }

    #[test]
    fn test_parse_lose_command() {
        assert_eq!(parse("!taz lose bob"), Ok(Command::Lose("bob".to_string())));
        assert_eq!(parse("!taz lose"), Err(CommandParsingError::InvalidLose));
    }

    #[test]
    fn test_parse_unknown_command() {
        assert_eq!(parse("!taz dance"), Err(CommandParsingError::Unknown));
    }

    #[test]
    fn test_parse_not_tazdingo_command() {
        assert_eq!(parse("!miou help"), Err(CommandParsingError::NotTazdingo));
    }

    #[test]
    fn test_parse_unable_to_parse() {
        assert_eq!(parse("This is not a command"), Err(CommandParsingError::UnableToParse));
    }

    #[test]
    fn test_format_command_error() {
        assert!(
            format_command_error(CommandParsingError::Unknown)
                .unwrap()
                .contains("Unknown command")
        );
        assert!(
            format_command_error(CommandParsingError::InvalidShield)
                .unwrap()
                .contains("shield")
        );
        assert!(format_command_error(CommandParsingError::UnableToParse).is_none());
        assert!(format_command_error(CommandParsingError::NotTazdingo).is_none());
    }
}
