//! The tracker wires one instance of every component together and exposes
//! the commands issued by the presentation layer.

use crate::cache::ImageCache;
use crate::core::config::AppConfig;
use crate::core::{
    CoinDataSource, CoinDetail, CoinSnapshot, PersistenceError, SortMode, SourceError,
};
use crate::pipeline::{self, HomeViews, PipelineConfig, PipelineHandle, PipelineInputs};
use crate::providers::{CoinCatalogSource, CoinDetailSource, HttpTransport, MarketStatsSource};
use crate::store::{DiskPortfolioStore, HoldingStore};
use anyhow::{Context, Result, anyhow};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};

/// Outcome of a [`Tracker::refresh_all`] call. Failures have already been
/// logged and the previously published data is still in place.
#[derive(Debug, Default)]
pub struct RefreshReport {
    pub catalog_error: Option<SourceError>,
    pub market_error: Option<SourceError>,
}

impl RefreshReport {
    pub fn is_ok(&self) -> bool {
        self.catalog_error.is_none() && self.market_error.is_none()
    }
}

pub struct Tracker {
    catalog: Arc<dyn CoinDataSource>,
    market: Arc<MarketStatsSource>,
    store: Arc<dyn HoldingStore>,
    images: ImageCache,
    details: CoinDetailSource,
    pipeline: PipelineHandle,
    /// Number of `refresh_all` calls in flight.
    loading: watch::Sender<usize>,
}

/// Counts one in-flight refresh; released on drop so a cancelled refresh
/// does not leave the tracker loading.
struct LoadingGuard<'a>(&'a watch::Sender<usize>);

impl<'a> LoadingGuard<'a> {
    fn enter(loading: &'a watch::Sender<usize>) -> Self {
        loading.send_modify(|n| *n += 1);
        Self(loading)
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.0.send_modify(|n| *n = n.saturating_sub(1));
    }
}

impl Tracker {
    pub fn new(
        catalog: Arc<dyn CoinDataSource>,
        market: Arc<MarketStatsSource>,
        store: Arc<dyn HoldingStore>,
        images: ImageCache,
        details: CoinDetailSource,
        pipeline_config: PipelineConfig,
    ) -> Self {
        let pipeline = pipeline::spawn(
            PipelineInputs {
                catalog: catalog.subscribe(),
                holdings: store.subscribe(),
                market: market.subscribe(),
            },
            pipeline_config,
        );
        Self {
            catalog,
            market,
            store,
            images,
            details,
            pipeline,
            loading: watch::channel(0).0,
        }
    }

    /// Builds a tracker backed by the network sources, the on-disk store and
    /// the on-disk image cache described by `config`.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let transport = Arc::new(HttpTransport::new(config.retries, config.retry_delay()));
        let base_url = config.coingecko_base_url();

        let catalog = Arc::new(CoinCatalogSource::new(
            base_url,
            &config.currency,
            Arc::clone(&transport),
        ));
        let market = Arc::new(MarketStatsSource::new(
            base_url,
            &config.currency,
            Arc::clone(&transport),
        ));
        let data_path = config.data_path()?;
        let store = Arc::new(
            DiskPortfolioStore::open(&data_path)
                .with_context(|| format!("Failed to open portfolio store at {}", data_path.display()))?,
        );
        let images = ImageCache::new(config.image_cache_path()?, Arc::clone(&transport));
        let details = CoinDetailSource::new(base_url, transport);

        Ok(Self::new(
            catalog,
            market,
            store,
            images,
            details,
            PipelineConfig {
                search_debounce: config.search_debounce(),
                ..PipelineConfig::default()
            },
        ))
    }

    pub async fn set_search_text(&self, text: &str) {
        self.pipeline.set_search_text(text).await;
    }

    pub async fn set_sort_mode(&self, mode: SortMode) {
        self.pipeline.set_sort_mode(mode).await;
    }

    pub async fn upsert_holding(&self, coin_id: &str, quantity: f64) -> Result<(), PersistenceError> {
        info!(coin_id, quantity, "Updating holding");
        self.store.upsert(coin_id, quantity).await
    }

    /// Refreshes the catalog and market data concurrently.
    pub async fn refresh_all(&self) -> RefreshReport {
        let guard = LoadingGuard::enter(&self.loading);
        let (catalog, market) = futures::join!(self.catalog.refresh(), self.market.refresh());
        drop(guard);

        let report = RefreshReport {
            catalog_error: catalog.err(),
            market_error: market.err(),
        };
        if !report.is_ok() {
            warn!(?report, "Refresh finished with errors");
        }
        report
    }

    pub fn is_loading(&self) -> bool {
        *self.loading.borrow() > 0
    }

    pub fn views(&self) -> HomeViews {
        self.pipeline.current()
    }

    pub fn subscribe(&self) -> watch::Receiver<HomeViews> {
        self.pipeline.subscribe()
    }

    /// Waits for every command and upstream change issued so far to be
    /// reflected in the views, skipping the search debounce.
    pub async fn settle(&self) -> HomeViews {
        self.pipeline.flush().await
    }

    /// The catalog's current entry for `coin_id`.
    pub fn coin(&self, coin_id: &str) -> Option<CoinSnapshot> {
        self.catalog.current().into_iter().find(|c| c.id == coin_id)
    }

    /// Image bytes for a catalog coin, from the disk cache when available.
    pub async fn image(&self, coin_id: &str) -> Result<Vec<u8>> {
        let url = self
            .coin(coin_id)
            .map(|c| c.image_url)
            .ok_or_else(|| anyhow!("Coin {coin_id} is not in the catalog"))?;
        self.images
            .get(coin_id, &url)
            .await
            .with_context(|| format!("Failed to load image for {coin_id}"))
    }

    pub fn image_path(&self, coin_id: &str) -> PathBuf {
        self.images.path_for(coin_id)
    }

    pub async fn detail(&self, coin_id: &str) -> Result<CoinDetail, SourceError> {
        self.details.fetch(coin_id).await
    }

    pub async fn shutdown(self) {
        self.pipeline.shutdown().await;
    }
}
