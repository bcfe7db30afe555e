//! Market aggregates and the statistics derived from them

use serde::{Deserialize, Serialize};

/// Global market aggregates; only the latest value is kept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub total_market_cap: f64,
    pub total_volume: f64,
    pub btc_dominance_pct: f64,
    pub market_cap_change_pct_24h: f64,
}

/// A labelled, display-ready figure for the statistics bar.
#[derive(Debug, Clone, PartialEq)]
pub struct StatisticItem {
    pub label: String,
    pub display_value: String,
    pub percent_change: Option<f64>,
}

impl StatisticItem {
    pub fn new(label: &str, display_value: String, percent_change: Option<f64>) -> Self {
        Self {
            label: label.to_string(),
            display_value,
            // NaN and infinities are never reported as a change
            percent_change: percent_change.filter(|p| p.is_finite()),
        }
    }
}
