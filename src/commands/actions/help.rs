//! Help and status command handlers.
//!
//! Both are read-only and never touch the tracker.

use log::debug;

use crate::commands::{
    CommandContext, CommandResult,
    responses::{format_help, format_status},
};

/// Returns the list of available commands.
///
/// Track commands are only listed when prey tracking is on.
pub fn handle_help(prey_tracking: bool) -> CommandResult {
    debug!("handling help command");

    CommandResult::reply(format_help(prey_tracking))
}

/// Returns the bot time and uptime.
pub fn handle_status(context: &CommandContext) -> CommandResult {
    debug!("handling status command");

    CommandResult::reply(format_status(context.now, context.started_at))
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, TimeDelta, Utc};

    use super::*;
    use crate::commands::Outcome;

    #[test]
    fn test_handle_help() {
        let result = handle_help(true);

        assert_eq!(result.outcome, Outcome::Success);
        assert!(result.mentions.is_empty());
        assert!(!result.response.unwrap().is_empty());
    }

    #[test]
    fn test_handle_status() {
        let now: DateTime<Utc> = DateTime::parse_from_rfc3339("2024-05-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let context = CommandContext {
            user_id: "@a:x.org".to_string(),
            display_name: "Alice".to_string(),
            is_owner: false,
            now,
            started_at: now - TimeDelta::days(2),
        };

        let result = handle_status(&context);

        assert!(result.response.unwrap().ends_with("up 2d"));
    }
}
