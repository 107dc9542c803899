//! Prey tracking command handlers.
//!
//! Users ask for the tiers they want announced. The tracker works with the
//! complement: the tiers opted out of, which start as already notified.

use log::debug;

use crate::{
    commands::{CommandContext, CommandResult, responses::format_tracks},
    registry::{Coordinates, Store, Tier, TierSet},
    tracker::Tracker,
};

/// Tiers to opt out of given the tiers requested. No request means every tier.
fn opted_out(requested: &TierSet) -> TierSet {
    if requested.is_empty() {
        return TierSet::new();
    }
    Tier::all().difference(requested).copied().collect()
}

pub async fn handle_track<S: Store>(
    context: &CommandContext,
    tracker: &mut Tracker<S>,
    target: &str,
    coordinates: Option<Coordinates>,
    tiers: &TierSet,
) -> CommandResult {
    debug!("handling track command for {} by {}", target, context.user_id);

    match tracker
        .track(&context.user_id, target, coordinates, opted_out(tiers), context.now)
        .await
    {
        Ok(()) => CommandResult::success(),
        Err(err) => err.into(),
    }
}

pub async fn handle_lose<S: Store>(
    context: &CommandContext,
    tracker: &mut Tracker<S>,
    target: &str,
) -> CommandResult {
    debug!("handling lose command for {} by {}", target, context.user_id);

    match tracker.untrack(target).await {
        Ok(_) => CommandResult::success(),
        Err(err) => err.into(),
    }
}

/// Lists the next pending tier of each tracked prey.
pub fn handle_tracks<S: Store>(context: &CommandContext, tracker: &Tracker<S>) -> CommandResult {
    debug!("handling tracks command");

    match tracker.tracks(context.now) {
        Ok(upcoming) => CommandResult::reply(format_tracks(&upcoming)),
        Err(err) => err.into(),
    }
}
