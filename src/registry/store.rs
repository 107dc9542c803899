//! Durable mirror of the registry.
//!
//! The [`Store`] trait is the persistence seam used by the tracker. The
//! production implementation, [`JsonStore`], keeps every record in a single
//! JSON document with one section per record kind.

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use anyhow::Context;
use log::{debug, info, warn};
use mockall::automock;
use serde::{Deserialize, Serialize};
use tokio::{fs, sync::Mutex};

use crate::registry::records::{PreyRecord, Record, RecordKey, ReinforcementRecord, ShieldRecord};

/// Name of the records document inside the data directory.
const RECORDS_FILE: &str = "records.json";

/// Key-value persistence for records.
///
/// Every call is independent: a failure only concerns the record passed in.
#[automock]
pub trait Store {
    /// Creates or overwrites the stored copy of `record`.
    async fn save(&self, record: &Record) -> anyhow::Result<()>;
    /// Deletes the stored record identified by `key`. Deleting an absent
    /// record is not an error.
    async fn delete(&self, key: &RecordKey) -> anyhow::Result<()>;
    /// Loads every stored record.
    async fn load_all(&self) -> anyhow::Result<Vec<Record>>;
}

/// On-disk layout of the records document.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
struct StoreDocument {
    #[serde(default)]
    shields: BTreeMap<String, ShieldRecord>,
    #[serde(default)]
    reinforcements: BTreeMap<String, ReinforcementRecord>,
    #[serde(default)]
    preys: BTreeMap<String, PreyRecord>,
}

impl StoreDocument {
    fn apply_save(&mut self, record: &Record) {
        match record {
            Record::Shield(shield) => {
                self.shields.insert(shield.owner_id.clone(), shield.clone());
            }
            Record::Reinforcement(rein) => {
                self.reinforcements.insert(rein.owner_id.clone(), rein.clone());
            }
            Record::Prey(prey) => {
                self.preys.insert(prey.tracking_key.clone(), prey.clone());
            }
        }
    }

    fn apply_delete(&mut self, key: &RecordKey) -> bool {
        match key {
            RecordKey::Shield(owner_id) => self.shields.remove(owner_id).is_some(),
            RecordKey::Reinforcement(owner_id) => self.reinforcements.remove(owner_id).is_some(),
            RecordKey::Prey(tracking_key) => self.preys.remove(tracking_key).is_some(),
        }
    }

    fn records(&self) -> Vec<Record> {
        self.shields
            .values()
            .cloned()
            .map(Record::Shield)
            .chain(self.reinforcements.values().cloned().map(Record::Reinforcement))
            .chain(self.preys.values().cloned().map(Record::Prey))
            .collect()
    }
}

/// [`Store`] writing every record into a single JSON file.
///
/// The whole document is rewritten on each mutation through a temporary file
/// renamed over the previous one, so a crash never leaves a half-written
/// document behind. The in-memory copy only changes once the write succeeded.
///
/// # Examples
///
/// ```no_run
/// use tazdingo::registry::{JsonStore, Store};
///
/// # async fn example() -> anyhow::Result<()> {
/// let store = JsonStore::open("./data").await?;
/// let records = store.load_all().await?;
/// println!("{} records stored", records.len());
/// # Ok(())
/// # }
/// ```
pub struct JsonStore {
    /// Path of the records document.
    path: PathBuf,
    document: Mutex<StoreDocument>,
}

impl JsonStore {
    /// Opens the records document in `data_dir`.
    ///
    /// A missing document is treated as an empty store. A document that
    /// cannot be parsed is an error, so corrupted data is never overwritten.
    pub async fn open(data_dir: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = data_dir.as_ref().join(RECORDS_FILE);

        let document = match fs::read_to_string(&path).await {
            Ok(serialized) => serde_json::from_str(&serialized)
                .with_context(|| format!("corrupted records file {}", path.display()))?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                warn!("no records found at {}, starting empty", path.display());
                StoreDocument::default()
            }
            Err(err) => {
                return Err(err).with_context(|| format!("failed to read {}", path.display()));
            }
        };

        info!("opened records store {}", path.display());

        Ok(JsonStore {
            path,
            document: Mutex::new(document),
        })
    }

    async fn write(&self, document: &StoreDocument) -> anyhow::Result<()> {
        let serialized = serde_json::to_string_pretty(document).context("failed to serialize records")?;
        let tmp_path = self.path.with_extension("json.tmp");

        fs::write(&tmp_path, serialized)
            .await
            .with_context(|| format!("failed to write {}", tmp_path.display()))?;
        fs::rename(&tmp_path, &self.path)
            .await
            .with_context(|| format!("failed to replace {}", self.path.display()))?;

        Ok(())
    }
}

impl Store for JsonStore {
    async fn save(&self, record: &Record) -> anyhow::Result<()> {
        let mut document = self.document.lock().await;
        let mut updated = document.clone();
        updated.apply_save(record);

        self.write(&updated).await?;
        *document = updated;
        debug!("saved {}", record.key());

        Ok(())
    }

    async fn delete(&self, key: &RecordKey) -> anyhow::Result<()> {
        let mut document = self.document.lock().await;
        let mut updated = document.clone();
        if !updated.apply_delete(key) {
            return Ok(());
        }

        self.write(&updated).await?;
        *document = updated;
        debug!("deleted {}", key);

        Ok(())
    }

    async fn load_all(&self) -> anyhow::Result<Vec<Record>> {
        Ok(self.document.lock().await.records())
    }
}
