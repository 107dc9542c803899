//! Command-facing operations over the registry and its durable mirror.
//!
//! The [`Tracker`] owns the [`Registry`] and the [`Store`]. Every mutation is
//! applied in memory first and then mirrored to the store. A failed store
//! call never undoes the in-memory change: the record key is remembered and
//! written again at the start of the next tick.

use std::collections::BTreeSet;

use chrono::{DateTime, TimeDelta, Utc};
use log::{debug, error, info};
use thiserror::Error;

use crate::{
    expiry::{self, Mutation, Notification},
    registry::{
        Coordinates, PreyRecord, RecordKey, Registry, RegistryError, ReinforcementRecord, ShieldRecord,
        Store, Tier, TierSet,
    },
};

/// Errors returned by tracker operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TrackerError {
    #[error("{0}")]
    InvalidArgument(String),
    #[error("{0}")]
    NotFound(String),
    /// Nothing to do. Not a failure.
    #[error("{0}")]
    NoOp(String),
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// A shield as shown in the hive listing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShieldStatus {
    pub shield: ShieldRecord,
    /// Negative once the shield expired.
    pub remaining: TimeDelta,
}

/// Everyone currently shielded or reinforcing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Hive {
    /// Sorted by expiry, soonest first.
    pub shields: Vec<ShieldStatus>,
    /// Sorted by start time.
    pub reinforcements: Vec<ReinforcementRecord>,
}

/// The next pending tier of a tracked prey.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UpcomingTier {
    pub tracking_key: String,
    pub owner_id: String,
    pub coordinates: Option<Coordinates>,
    pub tier: Tier,
    /// Clamped to zero.
    pub remaining: TimeDelta,
}

/// Shields, reinforcements and preys, kept in memory and mirrored to a
/// [`Store`].
///
/// # Examples
///
/// ```no_run
/// use chrono::Utc;
/// use tazdingo::{registry::JsonStore, tracker::Tracker};
///
/// # async fn example() -> anyhow::Result<()> {
/// let store = JsonStore::open("./data").await?;
/// let mut tracker = Tracker::load(store, true).await?;
///
/// tracker.apply_shield("@alice:matrix.org", "Alice", 3600, Utc::now()).await?;
/// let notifications = tracker.tick(Utc::now()).await;
/// # Ok(())
/// # }
/// ```
pub struct Tracker<S: Store> {
    registry: Registry,
    store: S,
    /// Keys whose last store write failed.
    pending: BTreeSet<RecordKey>,
    prey_tracking: bool,
}

impl<S: Store> Tracker<S> {
    /// Creates a tracker with an empty registry.
    pub fn new(store: S, prey_tracking: bool) -> Self {
        Tracker {
            registry: Registry::new(),
            store,
            pending: BTreeSet::new(),
            prey_tracking,
        }
    }

    /// Creates a tracker filled with every record of `store`.
    ///
    /// Stored records breaking owner exclusivity are dropped from the store.
    pub async fn load(store: S, prey_tracking: bool) -> anyhow::Result<Self> {
        let records = store.load_all().await?;
        let count = records.len();

        let mut tracker = Tracker::new(store, prey_tracking);
        for key in tracker.registry.hydrate(records) {
            tracker.persist(key).await;
        }

        info!("loaded {} records", count);
        Ok(tracker)
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn prey_tracking(&self) -> bool {
        self.prey_tracking
    }

    /// Keys waiting for a store write retry.
    pub fn pending(&self) -> &BTreeSet<RecordKey> {
        &self.pending
    }

    /// Shields `owner_id` for `duration_seconds` from `now`.
    ///
    /// Any previous shield or reinforcement of the owner is replaced.
    pub async fn apply_shield(
        &mut self,
        owner_id: &str,
        display_label: &str,
        duration_seconds: u64,
        now: DateTime<Utc>,
    ) -> Result<ShieldRecord, TrackerError> {
        let shield = i64::try_from(duration_seconds)
            .ok()
            .and_then(TimeDelta::try_seconds)
            .and_then(|duration| ShieldRecord::new(owner_id, display_label, now, duration))
            .ok_or_else(|| TrackerError::InvalidArgument("This shield lasts too long".to_string()))?;

        let replacing = !self.registry.owner_is_exclusive(owner_id);
        if self.registry.remove_reinforcement(owner_id).is_some() {
            self.persist(RecordKey::Reinforcement(owner_id.to_owned())).await;
        }
        self.registry.upsert_shield(shield.clone())?;
        self.persist(RecordKey::Shield(owner_id.to_owned())).await;

        if replacing {
            info!("{} shielded until {}, replacing previous state", owner_id, shield.expires_at);
        } else {
            info!("{} shielded until {}", owner_id, shield.expires_at);
        }
        Ok(shield)
    }

    pub async fn remove_shield(&mut self, owner_id: &str) -> Result<ShieldRecord, TrackerError> {
        let shield = self
            .registry
            .remove_shield(owner_id)
            .ok_or_else(|| TrackerError::NotFound("You have no shield".to_string()))?;
        self.persist(RecordKey::Shield(owner_id.to_owned())).await;

        info!("{} unshielded", owner_id);
        Ok(shield)
    }

    /// Marks `owner_id` as reinforcing, replacing any shield of the owner.
    pub async fn apply_reinforcement(
        &mut self,
        owner_id: &str,
        display_label: &str,
        now: DateTime<Utc>,
    ) -> Result<(), TrackerError> {
        let replacing = !self.registry.owner_is_exclusive(owner_id);
        if self.registry.remove_shield(owner_id).is_some() {
            self.persist(RecordKey::Shield(owner_id.to_owned())).await;
        }
        self.registry
            .upsert_reinforcement(ReinforcementRecord::new(owner_id, display_label, now))?;
        self.persist(RecordKey::Reinforcement(owner_id.to_owned())).await;

        if replacing {
            info!("{} reinforcing, replacing previous state", owner_id);
        } else {
            info!("{} reinforcing", owner_id);
        }
        Ok(())
    }

    pub async fn recall_reinforcement(&mut self, owner_id: &str) -> Result<(), TrackerError> {
        self.registry
            .remove_reinforcement(owner_id)
            .ok_or_else(|| TrackerError::NotFound("You are not reinforcing".to_string()))?;
        self.persist(RecordKey::Reinforcement(owner_id.to_owned())).await;

        info!("{} recalled", owner_id);
        Ok(())
    }

    /// Starts tracking `tracking_key` for `owner_id`.
    ///
    /// Tiers in `opted_out` are never announced. Tracking again under the same
    /// key starts over.
    pub async fn track(
        &mut self,
        owner_id: &str,
        tracking_key: &str,
        coordinates: Option<Coordinates>,
        opted_out: TierSet,
        now: DateTime<Utc>,
    ) -> Result<(), TrackerError> {
        self.ensure_prey_tracking()?;
        if Tier::ALL.iter().all(|tier| opted_out.contains(tier)) {
            return Err(TrackerError::InvalidArgument(
                "Every tier is opted out, nothing to track".to_string(),
            ));
        }

        self.registry
            .upsert_prey(PreyRecord::new(owner_id, tracking_key, coordinates, &opted_out, now));
        self.persist(RecordKey::Prey(tracking_key.to_owned())).await;

        info!("{} tracking {}", owner_id, tracking_key);
        Ok(())
    }

    pub async fn untrack(&mut self, tracking_key: &str) -> Result<PreyRecord, TrackerError> {
        self.ensure_prey_tracking()?;
        let prey = self
            .registry
            .remove_prey(tracking_key)
            .ok_or_else(|| TrackerError::NotFound(format!("{} is not tracked", tracking_key)))?;
        self.persist(RecordKey::Prey(tracking_key.to_owned())).await;

        info!("stopped tracking {}", tracking_key);
        Ok(prey)
    }

    /// Owners of every expired shield, sorted.
    pub fn list_notify_candidates(&self, now: DateTime<Utc>) -> Result<Vec<String>, TrackerError> {
        let mut owners: Vec<String> = self
            .registry
            .shields()
            .into_iter()
            .filter(|shield| shield.is_expired(now))
            .map(|shield| shield.owner_id)
            .collect();

        if owners.is_empty() {
            return Err(TrackerError::NoOp("No expired shields".to_string()));
        }
        owners.sort();

        Ok(owners)
    }

    /// Removes every expired shield and returns them.
    pub async fn prune_expired(&mut self, now: DateTime<Utc>) -> Result<Vec<ShieldRecord>, TrackerError> {
        let expired: Vec<String> = self
            .registry
            .shields()
            .into_iter()
            .filter(|shield| shield.is_expired(now))
            .map(|shield| shield.owner_id)
            .collect();

        if expired.is_empty() {
            return Err(TrackerError::NoOp("No expired shields to prune".to_string()));
        }

        let mut pruned = Vec::with_capacity(expired.len());
        for owner_id in expired {
            if let Some(shield) = self.registry.remove_shield(&owner_id) {
                self.persist(RecordKey::Shield(owner_id)).await;
                pruned.push(shield);
            }
        }

        info!("pruned {} expired shields", pruned.len());
        Ok(pruned)
    }

    pub fn hive(&self, now: DateTime<Utc>) -> Result<Hive, TrackerError> {
        let mut shields: Vec<ShieldStatus> = self
            .registry
            .shields()
            .into_iter()
            .map(|shield| ShieldStatus {
                remaining: shield.remaining(now),
                shield,
            })
            .collect();
        let mut reinforcements = self.registry.reinforcements();

        if shields.is_empty() && reinforcements.is_empty() {
            return Err(TrackerError::NoOp("Nobody is shielded or reinforcing".to_string()));
        }

        shields.sort_by(|a, b| {
            (a.shield.expires_at, &a.shield.owner_id).cmp(&(b.shield.expires_at, &b.shield.owner_id))
        });
        reinforcements.sort_by(|a, b| (a.entered_at, &a.owner_id).cmp(&(b.entered_at, &b.owner_id)));

        Ok(Hive {
            shields,
            reinforcements,
        })
    }

    /// Next pending tier of every tracked prey, soonest first.
    ///
    /// Preys with nothing left to wait for are left out.
    pub fn tracks(&self, now: DateTime<Utc>) -> Result<Vec<UpcomingTier>, TrackerError> {
        self.ensure_prey_tracking()?;
        let preys = self.registry.preys();
        if preys.is_empty() {
            return Err(TrackerError::NoOp("Nothing is tracked".to_string()));
        }

        let mut upcoming: Vec<UpcomingTier> = preys
            .into_iter()
            .filter_map(|prey| {
                let (tier, deadline) = expiry::next_deadline(&prey, now)?;
                Some(UpcomingTier {
                    tracking_key: prey.tracking_key,
                    owner_id: prey.owner_id,
                    coordinates: prey.coordinates,
                    tier,
                    remaining: (deadline - now).max(TimeDelta::zero()),
                })
            })
            .collect();
        upcoming.sort_by(|a, b| (a.remaining, &a.tracking_key).cmp(&(b.remaining, &b.tracking_key)));

        Ok(upcoming)
    }

    /// Runs one pass of the expiry state machine at `now`.
    ///
    /// Store writes that failed earlier are retried first. Preys whose tiers
    /// have all fired are evicted.
    ///
    /// # Returns
    ///
    /// The notifications to deliver, in a deterministic order.
    pub async fn tick(&mut self, now: DateTime<Utc>) -> Vec<Notification> {
        self.retry_pending().await;

        let transitions = expiry::plan_tick(&self.registry, now, self.prey_tracking);
        debug!("tick at {}: {} transitions", now, transitions.len());

        let mut notifications = Vec::with_capacity(transitions.len());
        for transition in transitions {
            let key = match transition.mutation {
                Mutation::MarkShield { owner_id, edge } => {
                    let Some(shield) = self.registry.shield_mut(&owner_id) else {
                        continue;
                    };
                    expiry::apply_shield_edge(shield, edge);
                    info!("shield of {} is {:?}", owner_id, edge);
                    RecordKey::Shield(owner_id)
                }
                Mutation::MarkPrey { tracking_key, tier } => {
                    let Some(prey) = self.registry.prey_mut(&tracking_key) else {
                        continue;
                    };
                    prey.mark_through(tier);
                    info!("{} reached the {}h tier", tracking_key, tier);
                    if prey.all_notified() {
                        self.registry.remove_prey(&tracking_key);
                        info!("stopped tracking {}, every tier fired", tracking_key);
                    }
                    RecordKey::Prey(tracking_key)
                }
            };

            self.persist(key).await;
            notifications.push(transition.notification);
        }

        notifications
    }

    fn ensure_prey_tracking(&self) -> Result<(), TrackerError> {
        if self.prey_tracking {
            Ok(())
        } else {
            Err(TrackerError::InvalidArgument("Prey tracking is disabled".to_string()))
        }
    }

    async fn retry_pending(&mut self) {
        if self.pending.is_empty() {
            return;
        }

        info!("retrying {} pending store writes", self.pending.len());
        for key in std::mem::take(&mut self.pending) {
            self.persist(key).await;
        }
    }

    /// Mirrors the current in-memory state of `key` to the store.
    ///
    /// A present record is saved, an absent one deleted. On failure the key
    /// joins the pending ledger.
    async fn persist(&mut self, key: RecordKey) {
        let result = match self.registry.record(&key) {
            Some(record) => self.store.save(&record).await,
            None => self.store.delete(&key).await,
        };

        match result {
            Ok(()) => {
                self.pending.remove(&key);
            }
            Err(err) => {
                error!("failed to store {}: {:#}", key, err);
                self.pending.insert(key);
            }
        }
    }
}
