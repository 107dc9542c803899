//! Time-bound records and their storage.
//!
//! - [`Registry`]: the in-memory maps of shields, reinforcements and preys
//! - [`Store`]: the durable mirror of the registry, implemented by [`JsonStore`]
//! - [`records`]: the record types themselves
//!
//! The registry holds no expiry logic. Deciding when a record changes state
//! belongs to [`crate::expiry`].

pub mod records;
mod state;
mod store;

pub use crate::registry::records::{
    Coordinates, PreyRecord, Record, RecordKey, ReinforcementRecord, ShieldRecord, Tier, TierSet,
};
pub use crate::registry::state::{Registry, RegistryError};
#[cfg(test)]
pub use crate::registry::store::MockStore;
pub use crate::registry::store::{JsonStore, Store};
