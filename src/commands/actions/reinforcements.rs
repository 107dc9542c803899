//! Reinforcement command handlers.

use log::debug;

use crate::{
    commands::{CommandContext, CommandResult},
    registry::Store,
    tracker::Tracker,
};

/// Marks the issuer as reinforcing, breaking any shield they hold.
pub async fn handle_rein<S: Store>(context: &CommandContext, tracker: &mut Tracker<S>) -> CommandResult {
    debug!("handling rein command for {}", context.user_id);

    match tracker
        .apply_reinforcement(&context.user_id, &context.display_name, context.now)
        .await
    {
        Ok(()) => CommandResult::success(),
        Err(err) => err.into(),
    }
}

pub async fn handle_recall<S: Store>(context: &CommandContext, tracker: &mut Tracker<S>) -> CommandResult {
    debug!("handling recall command for {}", context.user_id);

    match tracker.recall_reinforcement(&context.user_id).await {
        Ok(()) => CommandResult::success(),
        Err(err) => err.into(),
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Utc};

    use super::*;
    use crate::{commands::Outcome, registry::MockStore};

    fn context() -> CommandContext {
        let now = DateTime::parse_from_rfc3339("2024-05-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        CommandContext {
            user_id: "@a:x.org".to_string(),
            display_name: "Alice".to_string(),
            is_owner: false,
            now,
            started_at: now,
        }
    }

    #[tokio::test]
    async fn test_rein_breaks_shield_and_recall() {
        let mut store = MockStore::new();
        store.expect_save().returning(|_| Ok(()));
        store.expect_delete().returning(|_| Ok(()));
        let mut tracker = Tracker::new(store, true);
        let context = context();
        tracker
            .apply_shield(&context.user_id, "Alice", 3600, context.now)
            .await
            .unwrap();

        assert_eq!(handle_rein(&context, &mut tracker).await, CommandResult::success());
        assert!(tracker.registry().shield("@a:x.org").is_none());
        assert!(tracker.registry().reinforcement("@a:x.org").is_some());

        assert_eq!(handle_recall(&context, &mut tracker).await, CommandResult::success());
        assert_eq!(
            handle_recall(&context, &mut tracker).await.outcome,
            Outcome::Failure
        );
    }
}
