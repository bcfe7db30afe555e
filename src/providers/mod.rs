pub mod coin_catalog;
pub mod coin_detail;
pub mod market_stats;
pub mod transport;
pub mod util;

pub use coin_catalog::CoinCatalogSource;
pub use coin_detail::CoinDetailSource;
pub use market_stats::MarketStatsSource;
pub use transport::HttpTransport;
