//! Pure recomputation steps of the aggregation pipeline.

use crate::core::format::{abbreviated_currency, as_currency_with_2, as_percent_string};
use crate::core::{CoinSnapshot, EnrichedCoin, Holding, MarketSnapshot, SortMode, StatisticItem};
use std::collections::HashMap;

/// Case-insensitive substring match on id, symbol or name. Empty text keeps
/// every coin.
pub fn filter_coins(text: &str, coins: &[CoinSnapshot]) -> Vec<CoinSnapshot> {
    if text.is_empty() {
        return coins.to_vec();
    }
    let needle = text.to_lowercase();
    coins
        .iter()
        .filter(|coin| {
            coin.name.to_lowercase().contains(&needle)
                || coin.symbol.to_lowercase().contains(&needle)
                || coin.id.to_lowercase().contains(&needle)
        })
        .cloned()
        .collect()
}

/// Stable sort of the catalog. Holdings are not attached yet, so the
/// holdings modes order by rank here.
pub fn sort_coins(sort: SortMode, coins: &mut [CoinSnapshot]) {
    match sort {
        SortMode::RankAsc | SortMode::HoldingsAsc | SortMode::HoldingsDesc => {
            coins.sort_by(|a, b| a.rank.cmp(&b.rank))
        }
        SortMode::RankDesc => coins.sort_by(|a, b| b.rank.cmp(&a.rank)),
        SortMode::PriceAsc => coins.sort_by(|a, b| a.current_price.total_cmp(&b.current_price)),
        SortMode::PriceDesc => coins.sort_by(|a, b| b.current_price.total_cmp(&a.current_price)),
    }
}

/// Attaches the matching holding, if any, to every coin.
pub fn enrich(coins: &[CoinSnapshot], holdings: &[Holding]) -> Vec<EnrichedCoin> {
    let quantities: HashMap<&str, f64> = holdings
        .iter()
        .map(|h| (h.coin_id.as_str(), h.quantity))
        .collect();
    coins
        .iter()
        .map(|coin| EnrichedCoin::new(coin.clone(), quantities.get(coin.id.as_str()).copied()))
        .collect()
}

/// Held coins only, re-sorted by holding value for the holdings modes and
/// otherwise left in catalog order.
pub fn portfolio_coins(all_coins: &[EnrichedCoin], sort: SortMode) -> Vec<EnrichedCoin> {
    let mut held: Vec<EnrichedCoin> = all_coins.iter().filter(|c| c.is_held()).cloned().collect();
    match sort {
        SortMode::HoldingsDesc => {
            held.sort_by(|a, b| b.holding_value.total_cmp(&a.holding_value))
        }
        SortMode::HoldingsAsc => held.sort_by(|a, b| a.holding_value.total_cmp(&b.holding_value)),
        _ => {}
    }
    held
}

pub fn portfolio_value(portfolio: &[EnrichedCoin]) -> f64 {
    portfolio.iter().map(|c| c.holding_value).sum()
}

/// 24h percent change of the whole portfolio, reconstructing each coin's
/// value a day ago from its price change. `None` when the previous total is
/// zero or the result is otherwise not finite.
pub fn portfolio_change_pct(portfolio: &[EnrichedCoin]) -> Option<f64> {
    let current = portfolio_value(portfolio);
    let previous: f64 = portfolio
        .iter()
        .map(|c| {
            let pct = c.coin.price_change_pct_24h.unwrap_or(0.0) / 100.0;
            c.holding_value / (1.0 + pct)
        })
        .sum();
    let change = (current - previous) / previous * 100.0;
    change.is_finite().then_some(change)
}

/// The statistics bar, rebuilt as a whole. Empty until market data exists.
pub fn build_statistics(
    market: Option<&MarketSnapshot>,
    portfolio: &[EnrichedCoin],
) -> Vec<StatisticItem> {
    let Some(market) = market else {
        return Vec::new();
    };

    vec![
        StatisticItem::new(
            "Market Cap",
            abbreviated_currency(market.total_market_cap),
            Some(market.market_cap_change_pct_24h),
        ),
        StatisticItem::new("24h Volume", abbreviated_currency(market.total_volume), None),
        StatisticItem::new("BTC Dominance", as_percent_string(market.btc_dominance_pct), None),
        StatisticItem::new(
            "Portfolio Value",
            as_currency_with_2(portfolio_value(portfolio)),
            portfolio_change_pct(portfolio),
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::coin::fixtures::coin;

    fn catalog() -> Vec<CoinSnapshot> {
        let mut btc = coin("bitcoin", 1, 30000.0);
        btc.symbol = "btc".to_string();
        btc.name = "Bitcoin".to_string();
        let mut eth = coin("ethereum", 2, 2000.0);
        eth.symbol = "eth".to_string();
        eth.name = "Ethereum".to_string();
        let mut usdt = coin("tether", 3, 1.0);
        usdt.symbol = "usdt".to_string();
        usdt.name = "Tether".to_string();
        let mut wbtc = coin("wrapped-bitcoin", 15, 29950.0);
        wbtc.symbol = "wbtc".to_string();
        wbtc.name = "Wrapped Bitcoin".to_string();
        vec![eth, wbtc, btc, usdt]
    }

    fn holding(coin_id: &str, quantity: f64) -> Holding {
        Holding {
            coin_id: coin_id.to_string(),
            quantity,
        }
    }

    fn ids<'a>(coins: impl IntoIterator<Item = &'a CoinSnapshot>) -> Vec<&'a str> {
        coins.into_iter().map(|c| c.id.as_str()).collect()
    }

    #[test]
    fn test_filter_matches_id_symbol_or_name() {
        let coins = catalog();
        for text in ["BTC", "bitcoin", "Wrapped", "usd", "ETHER", "zzz"] {
            let needle = text.to_lowercase();
            let filtered = filter_coins(text, &coins);
            for coin in &filtered {
                assert!(
                    coin.id.to_lowercase().contains(&needle)
                        || coin.symbol.to_lowercase().contains(&needle)
                        || coin.name.to_lowercase().contains(&needle),
                    "{} should not match {text}",
                    coin.id
                );
            }
        }

        assert_eq!(
            ids(&filter_coins("btc", &coins)),
            vec!["wrapped-bitcoin", "bitcoin"]
        );
        // "ether" is in both Ethereum and Tether
        assert_eq!(ids(&filter_coins("ether", &coins)), vec!["ethereum", "tether"]);
        assert!(filter_coins("zzz", &coins).is_empty());
    }

    #[test]
    fn test_empty_filter_is_identity() {
        let coins = catalog();
        assert_eq!(filter_coins("", &coins), coins);
    }

    #[test]
    fn test_sort_modes() {
        let mut coins = catalog();

        sort_coins(SortMode::RankAsc, &mut coins);
        assert_eq!(ids(&coins), vec!["bitcoin", "ethereum", "tether", "wrapped-bitcoin"]);

        sort_coins(SortMode::RankDesc, &mut coins);
        assert_eq!(ids(&coins), vec!["wrapped-bitcoin", "tether", "ethereum", "bitcoin"]);

        sort_coins(SortMode::PriceAsc, &mut coins);
        assert_eq!(ids(&coins), vec!["tether", "ethereum", "wrapped-bitcoin", "bitcoin"]);

        sort_coins(SortMode::PriceDesc, &mut coins);
        assert_eq!(ids(&coins), vec!["bitcoin", "wrapped-bitcoin", "ethereum", "tether"]);

        // Holdings modes fall back to rank order before holdings are attached
        for mode in [SortMode::HoldingsAsc, SortMode::HoldingsDesc] {
            sort_coins(mode, &mut coins);
            assert_eq!(ids(&coins), vec!["bitcoin", "ethereum", "tether", "wrapped-bitcoin"]);
        }
    }

    #[test]
    fn test_sort_is_stable() {
        let mut coins = vec![
            coin("a", 2, 1.0),
            coin("b", 1, 1.0),
            coin("c", 2, 1.0),
            coin("d", 1, 1.0),
        ];
        sort_coins(SortMode::RankAsc, &mut coins);
        let once = coins.clone();
        assert_eq!(ids(&once), vec!["b", "d", "a", "c"]);

        sort_coins(SortMode::RankAsc, &mut coins);
        assert_eq!(coins, once);

        // Equal prices keep their previous relative order
        sort_coins(SortMode::PriceDesc, &mut coins);
        assert_eq!(coins, once);
    }

    #[test]
    fn test_portfolio_is_subset_of_held_coins() {
        let coins = catalog();
        let holdings = vec![
            holding("bitcoin", 0.5),
            holding("tether", 1000.0),
            // Held but not in the catalog: never shown
            holding("delisted-coin", 3.0),
        ];
        let all = enrich(&coins, &holdings);
        assert_eq!(all.len(), coins.len());

        for mode in [SortMode::RankAsc, SortMode::HoldingsAsc, SortMode::HoldingsDesc] {
            let portfolio = portfolio_coins(&all, mode);
            assert_eq!(portfolio.len(), 2);
            for entry in &portfolio {
                assert!(entry.quantity.unwrap() > 0.0);
                assert!(all.iter().any(|c| c == entry));
            }
        }
    }

    #[test]
    fn test_portfolio_sorted_by_holding_value() {
        let coins = catalog();
        let holdings = vec![
            holding("bitcoin", 0.01),   // 300
            holding("ethereum", 1.0),   // 2000
            holding("tether", 1000.0),  // 1000
        ];
        let mut ranked = coins.clone();
        sort_coins(SortMode::RankAsc, &mut ranked);
        let all = enrich(&ranked, &holdings);

        let desc = portfolio_coins(&all, SortMode::HoldingsDesc);
        let order: Vec<&str> = desc.iter().map(|c| c.coin.id.as_str()).collect();
        assert_eq!(order, vec!["ethereum", "tether", "bitcoin"]);

        let asc = portfolio_coins(&all, SortMode::HoldingsAsc);
        let order: Vec<&str> = asc.iter().map(|c| c.coin.id.as_str()).collect();
        assert_eq!(order, vec!["bitcoin", "tether", "ethereum"]);

        // Other modes keep the catalog order
        let ranked_view = portfolio_coins(&all, SortMode::RankAsc);
        let order: Vec<&str> = ranked_view.iter().map(|c| c.coin.id.as_str()).collect();
        assert_eq!(order, vec!["bitcoin", "ethereum", "tether"]);
    }

    #[test]
    fn test_bitcoin_portfolio_statistics() {
        let mut btc = coin("btc", 1, 30000.0);
        btc.price_change_pct_24h = Some(4.0);
        let all = enrich(&[btc], &[holding("btc", 2.0)]);
        let portfolio = portfolio_coins(&all, SortMode::HoldingsDesc);

        assert_eq!(portfolio.len(), 1);
        assert_eq!(portfolio[0].quantity, Some(2.0));
        assert_eq!(portfolio[0].holding_value, 60000.0);

        let market = MarketSnapshot {
            total_market_cap: 1.0e12,
            total_volume: 0.0,
            btc_dominance_pct: 0.0,
            market_cap_change_pct_24h: 0.0,
        };
        let stats = build_statistics(Some(&market), &portfolio);
        assert_eq!(stats.len(), 4);
        assert_eq!(stats[0].label, "Market Cap");
        assert_eq!(stats[0].display_value, "$1.00Tr");

        let value = &stats[3];
        assert_eq!(value.label, "Portfolio Value");
        assert_eq!(value.display_value, "$60,000.00");
        let change = value.percent_change.unwrap();
        // previous = 60000 / 1.04 = 57692.31, change = +4%
        assert!((change - 4.0).abs() < 1e-9, "change was {change}");
    }

    #[test]
    fn test_empty_portfolio_change_is_absent() {
        assert!(portfolio_change_pct(&[]).is_none());

        let market = MarketSnapshot {
            total_market_cap: 1.0e12,
            total_volume: 5.0e10,
            btc_dominance_pct: 48.2,
            market_cap_change_pct_24h: -0.5,
        };
        let stats = build_statistics(Some(&market), &[]);
        assert_eq!(stats[3].display_value, "$0.00");
        assert!(stats[3].percent_change.is_none());
        assert_eq!(stats[2].display_value, "48.20%");
        assert_eq!(stats[0].percent_change, Some(-0.5));
    }

    #[test]
    fn test_total_loss_change_is_absent() {
        // A -100% move makes the reconstructed previous value infinite
        let mut coin = coin("rugged", 500, 0.5);
        coin.price_change_pct_24h = Some(-100.0);
        let all = enrich(&[coin], &[holding("rugged", 10.0)]);
        assert!(portfolio_change_pct(&all).is_none());
    }

    #[test]
    fn test_no_market_data_no_statistics() {
        assert!(build_statistics(None, &[]).is_empty());
    }
}
