//! Core domain types and abstractions

pub mod coin;
pub mod config;
pub mod error;
pub mod format;
pub mod log;
pub mod market;
pub mod source;

// Re-export main types for cleaner imports
pub use coin::{CoinDetail, CoinSnapshot, EnrichedCoin, Holding, SortMode, SparklineSummary};
pub use error::{DecodeError, ImageError, PersistenceError, SourceError, TransportError};
pub use market::{MarketSnapshot, StatisticItem};
pub use source::CoinDataSource;
