//! Error taxonomy shared by the providers, the store and the image cache.

use thiserror::Error;

/// Failure of a single HTTP fetch, after retries are exhausted.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The server answered with a status outside `200..300`.
    #[error("Bad response status {code} from {url}")]
    BadStatus { url: String, code: u16 },

    /// The request never produced a usable response.
    #[error("Network failure fetching {url}: {source}")]
    NetworkFailure {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// A request URL could not be built from the configured base URL.
    #[error("Invalid request URL from {url}: {reason}")]
    InvalidUrl { url: String, reason: String },
}

/// A payload (JSON or image bytes) that could not be interpreted.
#[derive(Debug, Error)]
#[error("Failed to decode {what}: {reason}")]
pub struct DecodeError {
    pub what: &'static str,
    pub reason: String,
}

impl DecodeError {
    pub fn new(what: &'static str, reason: impl Into<String>) -> Self {
        Self {
            what,
            reason: reason.into(),
        }
    }
}

/// A durable write or read of the holdings store failed.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("Storage error: {0}")]
    Storage(#[from] fjall::Error),

    #[error("Failed to encode holding record: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Store I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure of a catalog, market or detail refresh.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Decode(#[from] DecodeError),
}

#[derive(Debug, Error)]
pub enum ImageError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Decode(#[from] DecodeError),
}
