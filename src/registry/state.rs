use std::collections::HashMap;

use log::warn;
use thiserror::Error;

use crate::registry::records::{PreyRecord, Record, RecordKey, ReinforcementRecord, ShieldRecord};

/// Errors raised by [`Registry`] mutations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// The owner already holds the other exclusive kind of record.
    #[error("{0} already has a shield or a reinforcement")]
    OwnerConflict(String),
}

/// In-memory source of truth for every tracked record.
///
/// Shields and reinforcements are keyed by owner and are mutually exclusive
/// for a given owner. Prey records are keyed by their tracking key.
#[derive(Debug, Default)]
pub struct Registry {
    shields: HashMap<String, ShieldRecord>,
    reinforcements: HashMap<String, ReinforcementRecord>,
    preys: HashMap<String, PreyRecord>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fills the registry with records loaded from the durable store.
    ///
    /// A shield and a reinforcement for the same owner cannot both be kept;
    /// the first loaded wins.
    ///
    /// # Returns
    ///
    /// The keys of the records that were rejected, so the caller can delete
    /// them from the store.
    pub fn hydrate(&mut self, records: Vec<Record>) -> Vec<RecordKey> {
        let mut rejected = Vec::new();

        for record in records {
            let key = record.key();
            let result = match record {
                Record::Shield(shield) => self.upsert_shield(shield).map(|_| ()),
                Record::Reinforcement(rein) => self.upsert_reinforcement(rein).map(|_| ()),
                Record::Prey(prey) => {
                    self.upsert_prey(prey);
                    Ok(())
                }
            };

            if let Err(err) = result {
                warn!("Dropping stored {}: {}", key, err);
                rejected.push(key);
            }
        }

        rejected
    }

    /// Whether `owner_id` holds neither a shield nor a reinforcement.
    pub fn owner_is_exclusive(&self, owner_id: &str) -> bool {
        !self.shields.contains_key(owner_id) && !self.reinforcements.contains_key(owner_id)
    }

    /// Inserts or replaces the shield of `shield.owner_id`.
    ///
    /// # Returns
    ///
    /// The replaced shield, or [`RegistryError::OwnerConflict`] if the owner
    /// currently reinforces.
    pub fn upsert_shield(&mut self, shield: ShieldRecord) -> Result<Option<ShieldRecord>, RegistryError> {
        if self.reinforcements.contains_key(&shield.owner_id) {
            return Err(RegistryError::OwnerConflict(shield.owner_id));
        }
        Ok(self.shields.insert(shield.owner_id.clone(), shield))
    }

    pub fn remove_shield(&mut self, owner_id: &str) -> Option<ShieldRecord> {
        self.shields.remove(owner_id)
    }

    pub fn shield(&self, owner_id: &str) -> Option<&ShieldRecord> {
        self.shields.get(owner_id)
    }

    pub fn shield_mut(&mut self, owner_id: &str) -> Option<&mut ShieldRecord> {
        self.shields.get_mut(owner_id)
    }

    /// Snapshot of every shield, in no particular order.
    pub fn shields(&self) -> Vec<ShieldRecord> {
        self.shields.values().cloned().collect()
    }

    /// Inserts or replaces the reinforcement of `rein.owner_id`.
    ///
    /// # Returns
    ///
    /// The replaced reinforcement, or [`RegistryError::OwnerConflict`] if the
    /// owner currently has a shield.
    pub fn upsert_reinforcement(
        &mut self,
        rein: ReinforcementRecord,
    ) -> Result<Option<ReinforcementRecord>, RegistryError> {
        if self.shields.contains_key(&rein.owner_id) {
            return Err(RegistryError::OwnerConflict(rein.owner_id));
        }
        Ok(self.reinforcements.insert(rein.owner_id.clone(), rein))
    }

    pub fn remove_reinforcement(&mut self, owner_id: &str) -> Option<ReinforcementRecord> {
        self.reinforcements.remove(owner_id)
    }

    pub fn reinforcement(&self, owner_id: &str) -> Option<&ReinforcementRecord> {
        self.reinforcements.get(owner_id)
    }

    pub fn reinforcements(&self) -> Vec<ReinforcementRecord> {
        self.reinforcements.values().cloned().collect()
    }

    /// Inserts or replaces a prey record, returning the replaced one.
    pub fn upsert_prey(&mut self, prey: PreyRecord) -> Option<PreyRecord> {
        self.preys.insert(prey.tracking_key.clone(), prey)
    }

    pub fn remove_prey(&mut self, tracking_key: &str) -> Option<PreyRecord> {
        self.preys.remove(tracking_key)
    }

    pub fn prey(&self, tracking_key: &str) -> Option<&PreyRecord> {
        self.preys.get(tracking_key)
    }

    pub fn prey_mut(&mut self, tracking_key: &str) -> Option<&mut PreyRecord> {
        self.preys.get_mut(tracking_key)
    }

    pub fn preys(&self) -> Vec<PreyRecord> {
        self.preys.values().cloned().collect()
    }

    /// Current value of the record identified by `key`, if any.
    pub fn record(&self, key: &RecordKey) -> Option<Record> {
        match key {
            RecordKey::Shield(owner_id) => self.shield(owner_id).cloned().map(Record::Shield),
            RecordKey::Reinforcement(owner_id) => self
                .reinforcement(owner_id)
                .cloned()
                .map(Record::Reinforcement),
            RecordKey::Prey(tracking_key) => self.prey(tracking_key).cloned().map(Record::Prey),
        }
    }
}
