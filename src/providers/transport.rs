use super::util::with_retry;
use crate::core::TransportError;
use std::time::Duration;
use tracing::{debug, instrument};

/// HTTP GET with status validation and retry.
#[derive(Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    retries: usize,
    retry_delay: Duration,
}

impl HttpTransport {
    pub fn new(retries: usize, retry_delay: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            retries,
            retry_delay,
        }
    }

    /// Fetches `url`, retrying failed attempts up to the configured count.
    #[instrument(name = "HttpFetch", skip(self), fields(url = %url))]
    pub async fn fetch(&self, url: &str) -> Result<Vec<u8>, TransportError> {
        with_retry(|| self.fetch_once(url), self.retries, self.retry_delay).await
    }

    async fn fetch_once(&self, url: &str) -> Result<Vec<u8>, TransportError> {
        let network_failure = |source| TransportError::NetworkFailure {
            url: url.to_string(),
            source,
        };

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(network_failure)?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::BadStatus {
                url: url.to_string(),
                code: status.as_u16(),
            });
        }

        let body = response.bytes().await.map_err(network_failure)?;
        debug!(bytes = body.len(), "Fetched response body");
        Ok(body.to_vec())
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new(3, Duration::ZERO)
    }
}
