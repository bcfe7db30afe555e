use super::transport::HttpTransport;
use crate::core::{CoinDataSource, CoinSnapshot, DecodeError, SourceError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info, instrument};

#[derive(Deserialize, Debug)]
struct MarketCoin {
    id: String,
    symbol: String,
    name: String,
    image: Option<String>,
    current_price: Option<f64>,
    market_cap: Option<f64>,
    market_cap_rank: Option<u32>,
    price_change_percentage_24h: Option<f64>,
    last_updated: Option<DateTime<Utc>>,
    sparkline_in_7d: Option<Sparkline>,
}

#[derive(Deserialize, Debug)]
struct Sparkline {
    price: Vec<Option<f64>>,
}

impl MarketCoin {
    fn into_snapshot(self, fetched_at: DateTime<Utc>) -> CoinSnapshot {
        CoinSnapshot {
            id: self.id,
            symbol: self.symbol,
            name: self.name,
            current_price: self.current_price.unwrap_or(0.0),
            // Unranked coins sort after every ranked one
            rank: self.market_cap_rank.unwrap_or(u32::MAX),
            market_cap: self.market_cap,
            price_change_pct_24h: self.price_change_percentage_24h,
            sparkline_7d: self
                .sparkline_in_7d
                .map(|s| s.price.into_iter().flatten().collect())
                .unwrap_or_default(),
            image_url: self.image.unwrap_or_default(),
            last_updated: self.last_updated.unwrap_or(fetched_at),
        }
    }
}

pub(crate) fn decode_coins(body: &[u8]) -> Result<Vec<CoinSnapshot>, DecodeError> {
    let coins: Vec<MarketCoin> =
        serde_json::from_slice(body).map_err(|e| DecodeError::new("coin list", e.to_string()))?;
    let fetched_at = Utc::now();
    Ok(coins
        .into_iter()
        .map(|c| c.into_snapshot(fetched_at))
        .collect())
}

/// Ranked coin list from a CoinGecko-compatible `/coins/markets` endpoint.
pub struct CoinCatalogSource {
    transport: Arc<HttpTransport>,
    url: String,
    tx: watch::Sender<Vec<CoinSnapshot>>,
}

impl CoinCatalogSource {
    pub fn new(base_url: &str, currency: &str, transport: Arc<HttpTransport>) -> Self {
        let url = format!(
            "{base_url}/coins/markets?vs_currency={currency}&order=market_cap_desc&per_page=250&page=1&sparkline=true&price_change_percentage=24h"
        );
        let (tx, _) = watch::channel(Vec::new());
        Self { transport, url, tx }
    }
}

#[async_trait]
impl CoinDataSource for CoinCatalogSource {
    #[instrument(name = "CoinCatalogRefresh", skip(self))]
    async fn refresh(&self) -> Result<(), SourceError> {
        let result = async {
            let body = self.transport.fetch(&self.url).await?;
            Ok::<_, SourceError>(decode_coins(&body)?)
        }
        .await;

        match result {
            Ok(coins) => {
                info!(count = coins.len(), "Coin catalog refreshed");
                // Concurrent refreshes are not deduplicated: last to finish wins
                self.tx.send_replace(coins);
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "Coin catalog refresh failed, keeping previous list");
                Err(e)
            }
        }
    }

    fn subscribe(&self) -> watch::Receiver<Vec<CoinSnapshot>> {
        self.tx.subscribe()
    }
}
