//! Expiry state machine.
//!
//! Everything here is a pure function of a registry snapshot and a single
//! `now`. [`plan_tick`] returns the transitions due at `now`; applying them
//! (flipping flags, persisting, evicting terminal preys) is up to the caller.
//!
//! # Shields
//!
//! ```text
//! fresh ──(< 1h left)──> expiring-notified ──(expired)──> expired-notified
//!   └─────────────────────(expired)──────────────────────────┘
//! ```
//!
//! # Preys
//!
//! The longest reached tier among 24h, 12h, 8h and 4h fires and marks every
//! shorter tier too. Once all four tiers are marked the record is terminal.

mod prey;
mod shield;

use chrono::{DateTime, Utc};

use crate::registry::{Registry, Tier};

pub use crate::expiry::prey::{evaluate_prey, next_deadline};
pub use crate::expiry::shield::{ShieldEdge, apply_shield_edge, evaluate_shield};

/// Something worth telling users about.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Notification {
    ShieldExpired { owner_id: String },
    ShieldExpiring { owner_id: String },
    PreyTier { owner_id: String, tracking_key: String, tier: Tier },
}

/// Change to apply to the registry.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Mutation {
    MarkShield { owner_id: String, edge: ShieldEdge },
    /// Marks `tier` and every shorter tier.
    MarkPrey { tracking_key: String, tier: Tier },
}

/// A planned mutation with the notification it triggers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transition {
    pub mutation: Mutation,
    pub notification: Notification,
}

/// Plans every transition due at `now`.
///
/// Each record yields at most one transition. Prey records are only
/// considered when `prey_tracking` is on. The result is sorted by mutation
/// so a tick over the same registry always produces the same sequence.
pub fn plan_tick(registry: &Registry, now: DateTime<Utc>, prey_tracking: bool) -> Vec<Transition> {
    let shields = registry.shields().into_iter().filter_map(|shield| {
        let edge = evaluate_shield(&shield, now)?;
        let owner_id = shield.owner_id;
        let notification = match edge {
            ShieldEdge::Expired => Notification::ShieldExpired {
                owner_id: owner_id.clone(),
            },
            ShieldEdge::Expiring => Notification::ShieldExpiring {
                owner_id: owner_id.clone(),
            },
        };

        Some(Transition {
            mutation: Mutation::MarkShield { owner_id, edge },
            notification,
        })
    });

    let preys = registry
        .preys()
        .into_iter()
        .filter(|_| prey_tracking)
        .filter_map(|prey| {
            let tier = evaluate_prey(&prey, now)?;

            Some(Transition {
                mutation: Mutation::MarkPrey {
                    tracking_key: prey.tracking_key.clone(),
                    tier,
                },
                notification: Notification::PreyTier {
                    owner_id: prey.owner_id,
                    tracking_key: prey.tracking_key,
                    tier,
                },
            })
        });

    let mut transitions: Vec<Transition> = shields.chain(preys).collect();
    transitions.sort_by(|a, b| a.mutation.cmp(&b.mutation));

    transitions
}
