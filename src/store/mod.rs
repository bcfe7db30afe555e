//! Durable holdings storage.

pub mod disk;
pub mod memory;

use crate::core::{Holding, PersistenceError};
use async_trait::async_trait;
use tokio::sync::watch;

pub use disk::DiskPortfolioStore;
pub use memory::MemoryPortfolioStore;

/// Key -> quantity store for the user's holdings.
///
/// All writes go through one per-store lock. A successful `upsert` is
/// durable before it returns and the published snapshot is then rebuilt
/// from storage; a failed `upsert` leaves the snapshot unchanged.
#[async_trait]
pub trait HoldingStore: Send + Sync {
    /// Creates or updates the holding when `quantity > 0`, deletes it otherwise.
    async fn upsert(&self, coin_id: &str, quantity: f64) -> Result<(), PersistenceError>;

    fn list(&self) -> Vec<Holding> {
        self.subscribe().borrow().clone()
    }

    fn subscribe(&self) -> watch::Receiver<Vec<Holding>>;
}
