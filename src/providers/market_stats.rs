use super::transport::HttpTransport;
use crate::core::{DecodeError, MarketSnapshot, SourceError};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info, instrument};

#[derive(Deserialize, Debug)]
struct GlobalResponse {
    data: GlobalData,
}

#[derive(Deserialize, Debug)]
struct GlobalData {
    #[serde(default)]
    total_market_cap: HashMap<String, f64>,
    #[serde(default)]
    total_volume: HashMap<String, f64>,
    #[serde(default)]
    market_cap_percentage: HashMap<String, f64>,
    #[serde(default)]
    market_cap_change_percentage_24h_usd: f64,
}

pub(crate) fn decode_market(body: &[u8], currency: &str) -> Result<MarketSnapshot, DecodeError> {
    let response: GlobalResponse = serde_json::from_slice(body)
        .map_err(|e| DecodeError::new("global market data", e.to_string()))?;
    let data = response.data;
    let in_currency = |values: &HashMap<String, f64>| values.get(currency).copied().unwrap_or(0.0);

    Ok(MarketSnapshot {
        total_market_cap: in_currency(&data.total_market_cap),
        total_volume: in_currency(&data.total_volume),
        btc_dominance_pct: data.market_cap_percentage.get("btc").copied().unwrap_or(0.0),
        market_cap_change_pct_24h: data.market_cap_change_percentage_24h_usd,
    })
}

/// Global market aggregates from a CoinGecko-compatible `/global` endpoint.
pub struct MarketStatsSource {
    transport: Arc<HttpTransport>,
    url: String,
    currency: String,
    tx: watch::Sender<Option<MarketSnapshot>>,
}

impl MarketStatsSource {
    pub fn new(base_url: &str, currency: &str, transport: Arc<HttpTransport>) -> Self {
        let (tx, _) = watch::channel(None);
        Self {
            transport,
            url: format!("{base_url}/global"),
            currency: currency.to_lowercase(),
            tx,
        }
    }

    /// Fetches and publishes the latest aggregates. A failure leaves the
    /// previously published snapshot untouched.
    #[instrument(name = "MarketStatsRefresh", skip(self))]
    pub async fn refresh(&self) -> Result<(), SourceError> {
        let result = async {
            let body = self.transport.fetch(&self.url).await?;
            Ok::<_, SourceError>(decode_market(&body, &self.currency)?)
        }
        .await;

        match result {
            Ok(snapshot) => {
                info!(market_cap = snapshot.total_market_cap, "Market stats refreshed");
                self.tx.send_replace(Some(snapshot));
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "Market stats refresh failed, keeping previous snapshot");
                Err(e)
            }
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<MarketSnapshot>> {
        self.tx.subscribe()
    }

    pub fn current(&self) -> Option<MarketSnapshot> {
        self.tx.borrow().clone()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    pub const MOCK_GLOBAL: &str = r#"{
        "data": {
            "active_cryptocurrencies": 10000,
            "total_market_cap": { "usd": 1000000000000, "eur": 920000000000 },
            "total_volume": { "usd": 45600000000 },
            "market_cap_percentage": { "btc": 48.2, "eth": 19.1 },
            "market_cap_change_percentage_24h_usd": 2.5,
            "updated_at": 1681826161
        }
    }"#;

    pub async fn mount_global(mock_server: &MockServer, status: u16, body: &str) {
        Mock::given(method("GET"))
            .and(path("/global"))
            .respond_with(ResponseTemplate::new(status).set_body_string(body))
            .mount(mock_server)
            .await;
    }

    #[tokio::test]
    async fn test_refresh_decodes_global_data() {
        let mock_server = MockServer::start().await;
        mount_global(&mock_server, 200, MOCK_GLOBAL).await;
        let source = MarketStatsSource::new(
            &mock_server.uri(),
            "usd",
            Arc::new(HttpTransport::default()),
        );

        assert!(source.current().is_none());
        source.refresh().await.unwrap();

        let snapshot = source.current().unwrap();
        assert_eq!(snapshot.total_market_cap, 1.0e12);
        assert_eq!(snapshot.total_volume, 45.6e9);
        assert_eq!(snapshot.btc_dominance_pct, 48.2);
        assert_eq!(snapshot.market_cap_change_pct_24h, 2.5);
    }

    #[tokio::test]
    async fn test_missing_currency_defaults_to_zero() {
        let snapshot = decode_market(MOCK_GLOBAL.as_bytes(), "jpy").unwrap();
        assert_eq!(snapshot.total_market_cap, 0.0);
        assert_eq!(snapshot.btc_dominance_pct, 48.2);
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_snapshot() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/global"))
            .respond_with(ResponseTemplate::new(200).set_body_string(MOCK_GLOBAL))
            .up_to_n_times(1)
            .mount(&mock_server)
            .await;
        mount_global(&mock_server, 429, "").await;
        let source = MarketStatsSource::new(
            &mock_server.uri(),
            "usd",
            Arc::new(HttpTransport::new(3, Duration::ZERO)),
        );

        source.refresh().await.unwrap();
        assert!(source.refresh().await.is_err());
        assert_eq!(source.current().unwrap().total_market_cap, 1.0e12);
    }
}
