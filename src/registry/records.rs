//! Time-bound records tracked by the bot.
//!
//! Three kinds of records exist:
//!
//! - [`ShieldRecord`]: a player's shield with an expiry time
//! - [`ReinforcementRecord`]: a player reinforcing, exclusive with a shield
//! - [`PreyRecord`]: a hunted target whose 4/8/12/24 hour marks are announced
//!
//! Records are plain data. Transition rules live in [`crate::expiry`].

use std::{collections::BTreeSet, fmt, str::FromStr};

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

/// A shield placed by a player on themselves.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShieldRecord {
    /// Matrix user ID of the shield owner, unique key.
    pub owner_id: String,
    /// Name shown in listings.
    pub display_label: String,
    /// When the shield was applied.
    pub entered_at: DateTime<Utc>,
    /// When the shield runs out.
    pub expires_at: DateTime<Utc>,
    /// The "expired" notification has been sent.
    pub expired_notified: bool,
    /// The "expiring soon" notification has been sent.
    pub expiring_notified: bool,
}

impl ShieldRecord {
    /// Creates a fresh shield lasting `duration` from `now`.
    ///
    /// Returns `None` if the expiry falls outside the representable range.
    pub fn new(owner_id: &str, display_label: &str, now: DateTime<Utc>, duration: TimeDelta) -> Option<Self> {
        Some(ShieldRecord {
            owner_id: owner_id.to_owned(),
            display_label: display_label.to_owned(),
            entered_at: now,
            expires_at: now.checked_add_signed(duration)?,
            expired_notified: false,
            expiring_notified: false,
        })
    }

    /// Time left before expiry, negative once expired.
    pub fn remaining(&self, now: DateTime<Utc>) -> TimeDelta {
        self.expires_at - now
    }

    /// Whether the shield ran out strictly before `now`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.remaining(now) < TimeDelta::zero()
    }
}

/// A player reinforcing instead of shielding.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReinforcementRecord {
    /// Matrix user ID of the reinforcing player, unique key.
    pub owner_id: String,
    /// Name shown in listings.
    pub display_label: String,
    /// When the reinforcement started.
    pub entered_at: DateTime<Utc>,
}

impl ReinforcementRecord {
    pub fn new(owner_id: &str, display_label: &str, now: DateTime<Utc>) -> Self {
        ReinforcementRecord {
            owner_id: owner_id.to_owned(),
            display_label: display_label.to_owned(),
            entered_at: now,
        }
    }
}

/// One of the elapsed-time marks announced for a tracked prey.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Tier {
    Four,
    Eight,
    Twelve,
    TwentyFour,
}

/// A set of tiers, ordered from the shortest to the longest.
pub type TierSet = BTreeSet<Tier>;

impl Tier {
    /// All tiers, shortest first.
    pub const ALL: [Tier; 4] = [Tier::Four, Tier::Eight, Tier::Twelve, Tier::TwentyFour];

    /// Number of hours after which the tier is reached.
    pub const fn hours(self) -> i64 {
        match self {
            Tier::Four => 4,
            Tier::Eight => 8,
            Tier::Twelve => 12,
            Tier::TwentyFour => 24,
        }
    }

    /// Elapsed time after which the tier is reached.
    pub fn threshold(self) -> TimeDelta {
        TimeDelta::hours(self.hours())
    }

    /// Every tier.
    pub fn all() -> TierSet {
        Tier::ALL.into_iter().collect()
    }
}

impl TryFrom<u64> for Tier {
    type Error = u64;

    fn try_from(hours: u64) -> Result<Self, Self::Error> {
        match hours {
            4 => Ok(Tier::Four),
            8 => Ok(Tier::Eight),
            12 => Ok(Tier::Twelve),
            24 => Ok(Tier::TwentyFour),
            other => Err(other),
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.hours())
    }
}

/// In-game map position of a prey, written `x,y`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coordinates {
    pub x: u32,
    pub y: u32,
}

impl FromStr for Coordinates {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (x, y) = s
            .split_once(',')
            .ok_or_else(|| format!("'{}' is not a x,y pair", s))?;
        let x = x.trim().parse().map_err(|_| format!("invalid x in '{}'", s))?;
        let y = y.trim().parse().map_err(|_| format!("invalid y in '{}'", s))?;

        Ok(Coordinates { x, y })
    }
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{},{}", self.x, self.y)
    }
}

/// A hunted target whose elapsed-time tiers are announced to its tracker.
///
/// Each tier flag starts `true` for tiers the owner opted out of, so only the
/// requested tiers are ever announced. A flag never goes back to `false`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreyRecord {
    /// Name of the target, unique key.
    pub tracking_key: String,
    /// Matrix user ID of the player tracking the target.
    pub owner_id: String,
    /// Where the target was last seen.
    pub coordinates: Option<Coordinates>,
    /// When tracking started.
    pub entered_at: DateTime<Utc>,
    pub four_notified: bool,
    pub eight_notified: bool,
    pub twelve_notified: bool,
    pub twenty_four_notified: bool,
}

impl PreyRecord {
    /// Creates a prey record with the tiers in `opted_out` already satisfied.
    pub fn new(
        owner_id: &str,
        tracking_key: &str,
        coordinates: Option<Coordinates>,
        opted_out: &TierSet,
        now: DateTime<Utc>,
    ) -> Self {
        PreyRecord {
            tracking_key: tracking_key.to_owned(),
            owner_id: owner_id.to_owned(),
            coordinates,
            entered_at: now,
            four_notified: opted_out.contains(&Tier::Four),
            eight_notified: opted_out.contains(&Tier::Eight),
            twelve_notified: opted_out.contains(&Tier::Twelve),
            twenty_four_notified: opted_out.contains(&Tier::TwentyFour),
        }
    }

    pub fn is_notified(&self, tier: Tier) -> bool {
        match tier {
            Tier::Four => self.four_notified,
            Tier::Eight => self.eight_notified,
            Tier::Twelve => self.twelve_notified,
            Tier::TwentyFour => self.twenty_four_notified,
        }
    }

    /// Marks `tier` and every shorter tier as notified.
    ///
    /// Reaching a tier implies every shorter one has elapsed too.
    pub fn mark_through(&mut self, tier: Tier) {
        for flag in Tier::ALL.into_iter().filter(|t| *t <= tier) {
            match flag {
                Tier::Four => self.four_notified = true,
                Tier::Eight => self.eight_notified = true,
                Tier::Twelve => self.twelve_notified = true,
                Tier::TwentyFour => self.twenty_four_notified = true,
            }
        }
    }

    /// Whether every tier has been notified, the terminal state.
    pub fn all_notified(&self) -> bool {
        Tier::ALL.into_iter().all(|tier| self.is_notified(tier))
    }

    /// Time elapsed since tracking started.
    pub fn elapsed(&self, now: DateTime<Utc>) -> TimeDelta {
        now - self.entered_at
    }
}

/// Any record, as mirrored in the durable store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Record {
    Shield(ShieldRecord),
    Reinforcement(ReinforcementRecord),
    Prey(PreyRecord),
}

impl Record {
    pub fn key(&self) -> RecordKey {
        match self {
            Record::Shield(shield) => RecordKey::Shield(shield.owner_id.clone()),
            Record::Reinforcement(rein) => RecordKey::Reinforcement(rein.owner_id.clone()),
            Record::Prey(prey) => RecordKey::Prey(prey.tracking_key.clone()),
        }
    }
}

/// Identifies a record in the registry and in the durable store.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RecordKey {
    Shield(String),
    Reinforcement(String),
    Prey(String),
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RecordKey::Shield(owner_id) => write!(f, "shield of {}", owner_id),
            RecordKey::Reinforcement(owner_id) => write!(f, "reinforcement of {}", owner_id),
            RecordKey::Prey(key) => write!(f, "prey {}", key),
        }
    }
}
