//! Published data sources

use super::coin::CoinSnapshot;
use super::error::SourceError;
use async_trait::async_trait;
use tokio::sync::watch;

/// A source of the ranked coin catalog.
///
/// `refresh` publishes a new snapshot on success. On failure the previously
/// published catalog stays in place and the error is returned.
#[async_trait]
pub trait CoinDataSource: Send + Sync {
    async fn refresh(&self) -> Result<(), SourceError>;

    fn subscribe(&self) -> watch::Receiver<Vec<CoinSnapshot>>;

    fn current(&self) -> Vec<CoinSnapshot> {
        self.subscribe().borrow().clone()
    }
}

/// A fixed catalog, republished on every refresh. Useful for offline runs.
pub struct StaticCatalog {
    coins: Vec<CoinSnapshot>,
    tx: watch::Sender<Vec<CoinSnapshot>>,
}

impl StaticCatalog {
    pub fn new(coins: Vec<CoinSnapshot>) -> Self {
        let (tx, _) = watch::channel(Vec::new());
        Self { coins, tx }
    }
}

#[async_trait]
impl CoinDataSource for StaticCatalog {
    async fn refresh(&self) -> Result<(), SourceError> {
        self.tx.send_replace(self.coins.clone());
        Ok(())
    }

    fn subscribe(&self) -> watch::Receiver<Vec<CoinSnapshot>> {
        self.tx.subscribe()
    }
}
