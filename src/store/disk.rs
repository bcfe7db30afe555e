use super::HoldingStore;
use crate::core::{Holding, PersistenceError};
use async_trait::async_trait;
use fjall::{Config, Keyspace, PartitionCreateOptions, PartitionHandle, PersistMode};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::sync::{Mutex, watch};
use tracing::{debug, error, warn};

const HOLDINGS_PARTITION: &str = "holdings";

#[derive(Serialize, Deserialize)]
struct HoldingRecord {
    quantity: f64,
}

/// Holdings persisted in a fjall keyspace, one key per coin id.
pub struct DiskPortfolioStore {
    keyspace: Keyspace,
    partition: PartitionHandle,
    write_lock: Mutex<()>,
    tx: watch::Sender<Vec<Holding>>,
}

impl DiskPortfolioStore {
    /// Opens (or creates) the store under `path` and publishes its contents.
    pub fn open(path: &Path) -> Result<Self, PersistenceError> {
        std::fs::create_dir_all(path)?;
        let keyspace = Config::new(path.join("portfolio")).open()?;
        let partition =
            keyspace.open_partition(HOLDINGS_PARTITION, PartitionCreateOptions::default())?;

        let store = Self {
            keyspace,
            partition,
            write_lock: Mutex::new(()),
            tx: watch::channel(Vec::new()).0,
        };
        let holdings = store.read_all()?;
        debug!(count = holdings.len(), "Loaded holdings from disk");
        store.tx.send_replace(holdings);
        Ok(store)
    }

    fn read_all(&self) -> Result<Vec<Holding>, PersistenceError> {
        let mut holdings = Vec::new();
        for item in self.partition.iter() {
            let (key, value) = item?;
            let coin_id = String::from_utf8_lossy(&key).into_owned();
            match serde_json::from_slice::<HoldingRecord>(&value) {
                Ok(record) if record.quantity > 0.0 => holdings.push(Holding {
                    coin_id,
                    quantity: record.quantity,
                }),
                Ok(_) => warn!(coin_id = %coin_id, "Ignoring stored holding with non-positive quantity"),
                Err(e) => warn!(coin_id = %coin_id, error = %e, "Ignoring unreadable holding record"),
            }
        }
        Ok(holdings)
    }

    /// Applies the change to the partition and returns the record it
    /// replaced, for [`Self::restore`].
    fn apply(&self, coin_id: &str, quantity: f64) -> Result<Option<Vec<u8>>, PersistenceError> {
        let previous = self.partition.get(coin_id.as_bytes())?.map(|v| v.to_vec());
        if quantity > 0.0 {
            let record = serde_json::to_vec(&HoldingRecord { quantity })?;
            self.partition.insert(coin_id.as_bytes(), record)?;
            debug!(coin_id, quantity, "Holding PUT");
        } else {
            self.partition.remove(coin_id.as_bytes())?;
            debug!(coin_id, "Holding REMOVE");
        }
        Ok(previous)
    }

    fn restore(&self, coin_id: &str, previous: Option<Vec<u8>>) -> Result<(), PersistenceError> {
        match previous {
            Some(record) => self.partition.insert(coin_id.as_bytes(), record)?,
            None => self.partition.remove(coin_id.as_bytes())?,
        }
        Ok(())
    }

    /// Applies and syncs one change. A failed sync undoes the change so no
    /// later read or persist can surface it.
    fn write(&self, coin_id: &str, quantity: f64) -> Result<(), PersistenceError> {
        let previous = self.apply(coin_id, quantity)?;
        if let Err(e) = self.keyspace.persist(PersistMode::SyncAll) {
            if let Err(undo) = self.restore(coin_id, previous) {
                error!(coin_id, error = %undo, "Failed to undo unsynced holding write");
            }
            return Err(e.into());
        }
        Ok(())
    }
}

/// `current` with the change for `coin_id` applied.
fn patched(current: &[Holding], coin_id: &str, quantity: f64) -> Vec<Holding> {
    let mut holdings: Vec<Holding> = current
        .iter()
        .filter(|h| h.coin_id != coin_id)
        .cloned()
        .collect();
    if quantity > 0.0 {
        holdings.push(Holding {
            coin_id: coin_id.to_string(),
            quantity,
        });
    }
    holdings
}

#[async_trait]
impl HoldingStore for DiskPortfolioStore {
    async fn upsert(&self, coin_id: &str, quantity: f64) -> Result<(), PersistenceError> {
        let _guard = self.write_lock.lock().await;
        self.write(coin_id, quantity)?;
        // The write is durable at this point, so a failed read-back must not
        // report failure; publish the previous snapshot with the change applied.
        let holdings = match self.read_all() {
            Ok(holdings) => holdings,
            Err(e) => {
                warn!(coin_id, error = %e, "Read-back after durable write failed");
                patched(&self.tx.borrow(), coin_id, quantity)
            }
        };
        self.tx.send_replace(holdings);
        Ok(())
    }

    fn subscribe(&self) -> watch::Receiver<Vec<Holding>> {
        self.tx.subscribe()
    }
}
