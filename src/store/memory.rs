use super::HoldingStore;
use crate::core::{Holding, PersistenceError};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::{Mutex, watch};
use tracing::debug;

/// Holdings kept in memory only; lost on exit.
pub struct MemoryPortfolioStore {
    inner: Mutex<HashMap<String, f64>>,
    tx: watch::Sender<Vec<Holding>>,
}

impl MemoryPortfolioStore {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(Vec::new());
        Self {
            inner: Mutex::new(HashMap::new()),
            tx,
        }
    }
}

impl Default for MemoryPortfolioStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HoldingStore for MemoryPortfolioStore {
    async fn upsert(&self, coin_id: &str, quantity: f64) -> Result<(), PersistenceError> {
        let mut holdings = self.inner.lock().await;
        if quantity > 0.0 {
            debug!(coin_id, quantity, "Holding PUT");
            holdings.insert(coin_id.to_string(), quantity);
        } else {
            debug!(coin_id, "Holding REMOVE");
            holdings.remove(coin_id);
        }

        let snapshot = holdings
            .iter()
            .map(|(coin_id, quantity)| Holding {
                coin_id: coin_id.clone(),
                quantity: *quantity,
            })
            .collect();
        self.tx.send_replace(snapshot);
        Ok(())
    }

    fn subscribe(&self) -> watch::Receiver<Vec<Holding>> {
        self.tx.subscribe()
    }
}
