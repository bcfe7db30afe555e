//! Coin and holding types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;

/// A coin as last reported by the catalog. Never mutated; holdings are
/// attached through [`EnrichedCoin`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoinSnapshot {
    pub id: String,
    pub symbol: String,
    pub name: String,
    pub current_price: f64,
    pub rank: u32,
    pub market_cap: Option<f64>,
    pub price_change_pct_24h: Option<f64>,
    pub sparkline_7d: Vec<f64>,
    pub image_url: String,
    pub last_updated: DateTime<Utc>,
}

impl CoinSnapshot {
    /// Range and net move of the 7-day sparkline, if it has any points.
    pub fn sparkline_summary(&self) -> Option<SparklineSummary> {
        let first = *self.sparkline_7d.first()?;
        let last = *self.sparkline_7d.last()?;
        let (low, high) = self
            .sparkline_7d
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &p| {
                (lo.min(p), hi.max(p))
            });
        Some(SparklineSummary {
            low,
            high,
            first,
            last,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SparklineSummary {
    pub low: f64,
    pub high: f64,
    pub first: f64,
    pub last: f64,
}

impl SparklineSummary {
    /// Percent change from the first to the last point.
    pub fn change_pct(&self) -> Option<f64> {
        let change = (self.last - self.first) / self.first * 100.0;
        change.is_finite().then_some(change)
    }
}

/// A user-declared quantity of a coin. `quantity` is always positive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Holding {
    pub coin_id: String,
    pub quantity: f64,
}

/// Catalog coin with the user's holding attached.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedCoin {
    pub coin: CoinSnapshot,
    pub quantity: Option<f64>,
    pub holding_value: f64,
}

impl EnrichedCoin {
    pub fn new(coin: CoinSnapshot, quantity: Option<f64>) -> Self {
        let holding_value = quantity.unwrap_or(0.0) * coin.current_price;
        Self {
            coin,
            quantity,
            holding_value,
        }
    }

    pub fn is_held(&self) -> bool {
        self.quantity.is_some_and(|q| q > 0.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SortMode {
    RankAsc,
    RankDesc,
    PriceAsc,
    PriceDesc,
    HoldingsAsc,
    #[default]
    HoldingsDesc,
}

impl Display for SortMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                SortMode::RankAsc => "rank",
                SortMode::RankDesc => "rank-desc",
                SortMode::PriceAsc => "price",
                SortMode::PriceDesc => "price-desc",
                SortMode::HoldingsAsc => "holdings",
                SortMode::HoldingsDesc => "holdings-desc",
            }
        )
    }
}

impl FromStr for SortMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "rank" => Ok(SortMode::RankAsc),
            "rank-desc" => Ok(SortMode::RankDesc),
            "price" => Ok(SortMode::PriceAsc),
            "price-desc" => Ok(SortMode::PriceDesc),
            "holdings" => Ok(SortMode::HoldingsAsc),
            "holdings-desc" => Ok(SortMode::HoldingsDesc),
            _ => Err(anyhow::anyhow!("Invalid sort mode: {}", s)),
        }
    }
}

/// Descriptive data for a single coin, fetched on demand.
#[derive(Debug, Clone, PartialEq)]
pub struct CoinDetail {
    pub id: String,
    pub symbol: String,
    pub name: String,
    pub block_time_minutes: Option<u32>,
    pub hashing_algorithm: Option<String>,
    pub description: Option<String>,
    pub website_url: Option<String>,
    pub reddit_url: Option<String>,
}
