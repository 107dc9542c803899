//! Shield command handlers.
//!
//! Shields are always applied to the command issuer. Listing and pruning
//! cover everyone.

use log::debug;

use crate::{
    commands::{
        CommandContext, CommandResult,
        responses::{format_hive, format_notify, format_owner_only},
    },
    registry::Store,
    tracker::Tracker,
};

/// Shields the issuer for `seconds`, replacing any shield or reinforcement.
pub async fn handle_shield<S: Store>(
    context: &CommandContext,
    tracker: &mut Tracker<S>,
    seconds: u64,
) -> CommandResult {
    debug!("handling shield command for {}", context.user_id);

    match tracker
        .apply_shield(&context.user_id, &context.display_name, seconds, context.now)
        .await
    {
        Ok(_) => CommandResult::success(),
        Err(err) => err.into(),
    }
}

pub async fn handle_unshield<S: Store>(context: &CommandContext, tracker: &mut Tracker<S>) -> CommandResult {
    debug!("handling unshield command for {}", context.user_id);

    match tracker.remove_shield(&context.user_id).await {
        Ok(_) => CommandResult::success(),
        Err(err) => err.into(),
    }
}

/// Lists shields and reinforcements.
pub fn handle_hive<S: Store>(context: &CommandContext, tracker: &Tracker<S>) -> CommandResult {
    debug!("handling hive command");

    match tracker.hive(context.now) {
        Ok(hive) => CommandResult::reply(format_hive(&hive)),
        Err(err) => err.into(),
    }
}

/// Mentions every owner of an expired shield.
pub fn handle_notify<S: Store>(context: &CommandContext, tracker: &Tracker<S>) -> CommandResult {
    debug!("handling notify command");

    match tracker.list_notify_candidates(context.now) {
        Ok(owners) => CommandResult {
            mentions: owners.clone(),
            ..CommandResult::reply(format_notify(&owners))
        },
        Err(err) => err.into(),
    }
}

/// Removes every expired shield. Owners only.
pub async fn handle_prune<S: Store>(context: &CommandContext, tracker: &mut Tracker<S>) -> CommandResult {
    debug!("handling prune command for {}", context.user_id);

    if !context.is_owner {
        debug!("{} is not allowed to prune", context.user_id);
        return CommandResult::failure(format_owner_only());
    }

    match tracker.prune_expired(context.now).await {
        Ok(_) => CommandResult::success(),
        Err(err) => err.into(),
    }
}
