//! Command action handlers.
//!
//! Each handler receives a [`CommandContext`](crate::commands::CommandContext)
//! and the tracker, performs the command, and returns a
//! [`CommandResult`](crate::commands::CommandResult).
//!
//! - [`handle_help`], [`handle_status`]: read-only, no tracker involved
//! - [`handle_shield`], [`handle_unshield`], [`handle_hive`], [`handle_notify`], [`handle_prune`]
//! - [`handle_rein`], [`handle_recall`]
//! - [`handle_track`], [`handle_lose`], [`handle_tracks`]

mod help;
mod reinforcements;
mod shields;
mod tracks;

pub use crate::commands::actions::{
    help::{handle_help, handle_status},
    reinforcements::{handle_recall, handle_rein},
    shields::{handle_hive, handle_notify, handle_prune, handle_shield, handle_unshield},
    tracks::{handle_lose, handle_track, handle_tracks},
};
