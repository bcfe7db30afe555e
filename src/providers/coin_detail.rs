use super::transport::HttpTransport;
use crate::core::format::strip_html;
use crate::core::{CoinDetail, DecodeError, SourceError, TransportError};
use reqwest::Url;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, instrument};

#[derive(Deserialize, Debug)]
struct DetailResponse {
    id: String,
    symbol: String,
    name: String,
    block_time_in_minutes: Option<u32>,
    hashing_algorithm: Option<String>,
    description: Option<Description>,
    links: Option<Links>,
}

#[derive(Deserialize, Debug)]
struct Description {
    en: Option<String>,
}

#[derive(Deserialize, Debug)]
struct Links {
    #[serde(default)]
    homepage: Vec<Option<String>>,
    subreddit_url: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Per-coin descriptive data. Fetched on demand, not published.
pub struct CoinDetailSource {
    transport: Arc<HttpTransport>,
    base_url: String,
}

impl CoinDetailSource {
    pub fn new(base_url: &str, transport: Arc<HttpTransport>) -> Self {
        Self {
            transport,
            base_url: base_url.to_string(),
        }
    }

    /// `{base}/coins/{id}` with `coin_id` escaped as a single path segment.
    fn detail_url(&self, coin_id: &str) -> Result<Url, TransportError> {
        let invalid = |reason: String| TransportError::InvalidUrl {
            url: self.base_url.clone(),
            reason,
        };
        let mut url = Url::parse(&self.base_url).map_err(|e| invalid(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|()| invalid("base URL cannot carry a path".to_string()))?
            .pop_if_empty()
            .extend(["coins", coin_id]);
        url.query_pairs_mut().extend_pairs([
            ("localization", "false"),
            ("tickers", "false"),
            ("market_data", "false"),
            ("community_data", "false"),
            ("developer_data", "false"),
            ("sparkline", "false"),
        ]);
        Ok(url)
    }

    #[instrument(name = "CoinDetailFetch", skip(self))]
    pub async fn fetch(&self, coin_id: &str) -> Result<CoinDetail, SourceError> {
        let url = self.detail_url(coin_id)?;
        let body = self.transport.fetch(url.as_str()).await?;
        let response: DetailResponse = serde_json::from_slice(&body)
            .map_err(|e| DecodeError::new("coin detail", e.to_string()))?;
        debug!(id = %response.id, "Decoded coin detail");

        let links = response.links;
        let website_url = links
            .as_ref()
            .and_then(|l| l.homepage.iter().flatten().find(|h| !h.trim().is_empty()))
            .cloned();
        let reddit_url = non_empty(links.and_then(|l| l.subreddit_url));

        Ok(CoinDetail {
            id: response.id,
            symbol: response.symbol,
            name: response.name,
            block_time_minutes: response.block_time_in_minutes,
            hashing_algorithm: non_empty(response.hashing_algorithm),
            description: non_empty(
                response
                    .description
                    .and_then(|d| d.en)
                    .map(|text| strip_html(&text)),
            ),
            website_url,
            reddit_url,
        })
    }
}
