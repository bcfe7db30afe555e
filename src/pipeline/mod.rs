//! Aggregation pipeline
//!
//! Merges the catalog, holdings and market streams with the search text and
//! sort mode into the three derived views:
//!
//! ```text
//! search text --debounce--+
//! sort mode --------------+--> filter + sort --> enrich with holdings --> statistics
//! coin catalog -----------+          ^                                       ^
//! holdings ----------------------------+                                     |
//! market snapshot -----------------------------------------------------------+
//! ```
//!
//! A single task owns all state. Every recomputation publishes one
//! [`HomeViews`] value, so consumers never see the lists and statistics out
//! of step with each other.

pub mod debounce;
pub mod transform;

use crate::core::{
    CoinSnapshot, EnrichedCoin, Holding, MarketSnapshot, SortMode, StatisticItem,
};
use debounce::Debounce;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace};

/// The derived views handed to the presentation layer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HomeViews {
    pub all_coins: Vec<EnrichedCoin>,
    pub portfolio_coins: Vec<EnrichedCoin>,
    pub statistics: Vec<StatisticItem>,
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub search_debounce: Duration,
    pub initial_sort: SortMode,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            search_debounce: Duration::from_millis(300),
            initial_sort: SortMode::default(),
        }
    }
}

/// Upstream streams the pipeline subscribes to.
pub struct PipelineInputs {
    pub catalog: watch::Receiver<Vec<CoinSnapshot>>,
    pub holdings: watch::Receiver<Vec<Holding>>,
    pub market: watch::Receiver<Option<MarketSnapshot>>,
}

enum Command {
    SetSearchText(String),
    SetSortMode(SortMode),
    Flush(oneshot::Sender<HomeViews>),
    Shutdown,
}

/// Handle to a running pipeline. Dropping it stops the pipeline task.
pub struct PipelineHandle {
    commands: mpsc::Sender<Command>,
    views: watch::Receiver<HomeViews>,
    task: JoinHandle<()>,
}

impl PipelineHandle {
    /// Sets the search text; applied once input has been quiet for the
    /// debounce period.
    pub async fn set_search_text(&self, text: impl Into<String>) {
        self.send(Command::SetSearchText(text.into())).await;
    }

    pub async fn set_sort_mode(&self, mode: SortMode) {
        self.send(Command::SetSortMode(mode)).await;
    }

    pub fn subscribe(&self) -> watch::Receiver<HomeViews> {
        self.views.clone()
    }

    pub fn current(&self) -> HomeViews {
        self.views.borrow().clone()
    }

    /// Applies any pending search text and input changes right away and
    /// returns the resulting views.
    pub async fn flush(&self) -> HomeViews {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(Command::Flush(reply_tx)).await;
        match reply_rx.await {
            Ok(views) => views,
            Err(_) => self.current(),
        }
    }

    pub async fn shutdown(self) {
        self.send(Command::Shutdown).await;
        if let Err(e) = self.task.await {
            debug!(error = %e, "Pipeline task ended abnormally");
        }
    }

    async fn send(&self, command: Command) {
        if self.commands.send(command).await.is_err() {
            debug!("Pipeline task is no longer running, command dropped");
        }
    }
}

/// Starts the pipeline on the current tokio runtime.
pub fn spawn(inputs: PipelineInputs, config: PipelineConfig) -> PipelineHandle {
    let (commands_tx, commands_rx) = mpsc::channel(32);
    let mut state = PipelineState::new(config.initial_sort);
    let mut inputs = inputs;
    state.absorb_inputs(&mut inputs);
    state.recompute_from_filter();

    let (views_tx, views_rx) = watch::channel(state.views.clone());
    let task = tokio::spawn(run(
        state,
        inputs,
        commands_rx,
        views_tx,
        Debounce::new(config.search_debounce),
    ));

    PipelineHandle {
        commands: commands_tx,
        views: views_rx,
        task,
    }
}

struct PipelineState {
    search_text: String,
    pending_search: Option<String>,
    sort: SortMode,
    catalog: Vec<CoinSnapshot>,
    holdings: Vec<Holding>,
    market: Option<MarketSnapshot>,
    filtered: Vec<CoinSnapshot>,
    views: HomeViews,
}

impl PipelineState {
    fn new(sort: SortMode) -> Self {
        Self {
            search_text: String::new(),
            pending_search: None,
            sort,
            catalog: Vec::new(),
            holdings: Vec::new(),
            market: None,
            filtered: Vec::new(),
            views: HomeViews::default(),
        }
    }

    /// Takes the latest value of every input and marks it seen.
    fn absorb_inputs(&mut self, inputs: &mut PipelineInputs) {
        self.catalog = inputs.catalog.borrow_and_update().clone();
        self.holdings = inputs.holdings.borrow_and_update().clone();
        self.market = inputs.market.borrow_and_update().clone();
    }

    fn apply_pending_search(&mut self) -> bool {
        match self.pending_search.take() {
            Some(text) if text != self.search_text => {
                self.search_text = text;
                true
            }
            _ => false,
        }
    }

    fn recompute_from_filter(&mut self) {
        let mut filtered = transform::filter_coins(&self.search_text, &self.catalog);
        transform::sort_coins(self.sort, &mut filtered);
        self.filtered = filtered;
        self.recompute_from_holdings();
    }

    fn recompute_from_holdings(&mut self) {
        let all_coins = transform::enrich(&self.filtered, &self.holdings);
        let portfolio_coins = transform::portfolio_coins(&all_coins, self.sort);
        self.views.all_coins = all_coins;
        self.views.portfolio_coins = portfolio_coins;
        self.recompute_statistics();
    }

    fn recompute_statistics(&mut self) {
        self.views.statistics =
            transform::build_statistics(self.market.as_ref(), &self.views.portfolio_coins);
        debug!(
            coins = self.views.all_coins.len(),
            portfolio = self.views.portfolio_coins.len(),
            statistics = self.views.statistics.len(),
            "Recomputed views"
        );
    }
}

async fn run(
    mut state: PipelineState,
    mut inputs: PipelineInputs,
    mut commands: mpsc::Receiver<Command>,
    views_tx: watch::Sender<HomeViews>,
    mut debounce: Debounce,
) {
    let publish = |state: &PipelineState| {
        views_tx.send_replace(state.views.clone());
    };
    let (mut catalog_open, mut holdings_open, mut market_open) = (true, true, true);

    loop {
        tokio::select! {
            command = commands.recv() => match command {
                None | Some(Command::Shutdown) => {
                    info!("Aggregation pipeline shutting down");
                    break;
                }
                Some(Command::SetSearchText(text)) => {
                    trace!(%text, "Search text changed");
                    state.pending_search = Some(text);
                    debounce.restart();
                }
                Some(Command::SetSortMode(mode)) => {
                    if mode != state.sort {
                        debug!(%mode, "Sort mode changed");
                        state.sort = mode;
                        state.recompute_from_filter();
                        publish(&state);
                    }
                }
                Some(Command::Flush(reply)) => {
                    debounce.cancel();
                    state.apply_pending_search();
                    state.absorb_inputs(&mut inputs);
                    state.recompute_from_filter();
                    publish(&state);
                    let _ = reply.send(state.views.clone());
                }
            },

            _ = debounce.expiry(), if debounce.is_pending() => {
                debounce.cancel();
                if state.apply_pending_search() {
                    debug!(text = %state.search_text, "Applying debounced search");
                    state.recompute_from_filter();
                    publish(&state);
                }
            }

            changed = inputs.catalog.changed(), if catalog_open => {
                if changed.is_err() {
                    debug!("Coin catalog stream closed");
                    catalog_open = false;
                    continue;
                }
                state.catalog = inputs.catalog.borrow_and_update().clone();
                state.recompute_from_filter();
                publish(&state);
            }

            changed = inputs.holdings.changed(), if holdings_open => {
                if changed.is_err() {
                    debug!("Holdings stream closed");
                    holdings_open = false;
                    continue;
                }
                state.holdings = inputs.holdings.borrow_and_update().clone();
                state.recompute_from_holdings();
                publish(&state);
            }

            changed = inputs.market.changed(), if market_open => {
                if changed.is_err() {
                    debug!("Market stream closed");
                    market_open = false;
                    continue;
                }
                state.market = inputs.market.borrow_and_update().clone();
                state.recompute_statistics();
                publish(&state);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::coin::fixtures::coin;
    use tokio::time::Instant;

    struct Harness {
        catalog_tx: watch::Sender<Vec<CoinSnapshot>>,
        holdings_tx: watch::Sender<Vec<Holding>>,
        market_tx: watch::Sender<Option<MarketSnapshot>>,
        handle: PipelineHandle,
    }

    fn catalog() -> Vec<CoinSnapshot> {
        let mut btc = coin("bitcoin", 1, 30000.0);
        btc.symbol = "btc".to_string();
        btc.price_change_pct_24h = Some(4.0);
        let mut eth = coin("ethereum", 2, 2000.0);
        eth.symbol = "eth".to_string();
        let mut sol = coin("solana", 5, 20.0);
        sol.symbol = "sol".to_string();
        vec![sol, eth, btc]
    }

    fn market() -> MarketSnapshot {
        MarketSnapshot {
            total_market_cap: 1.0e12,
            total_volume: 4.0e10,
            btc_dominance_pct: 48.0,
            market_cap_change_pct_24h: 1.0,
        }
    }

    fn holding(coin_id: &str, quantity: f64) -> Holding {
        Holding {
            coin_id: coin_id.to_string(),
            quantity,
        }
    }

    fn harness(catalog: Vec<CoinSnapshot>, holdings: Vec<Holding>) -> Harness {
        let (catalog_tx, catalog_rx) = watch::channel(catalog);
        let (holdings_tx, holdings_rx) = watch::channel(holdings);
        let (market_tx, market_rx) = watch::channel(Some(market()));
        let handle = spawn(
            PipelineInputs {
                catalog: catalog_rx,
                holdings: holdings_rx,
                market: market_rx,
            },
            PipelineConfig::default(),
        );
        Harness {
            catalog_tx,
            holdings_tx,
            market_tx,
            handle,
        }
    }

    fn ids(coins: &[EnrichedCoin]) -> Vec<&str> {
        coins.iter().map(|c| c.coin.id.as_str()).collect()
    }

    fn assert_consistent(views: &HomeViews) {
        for entry in &views.portfolio_coins {
            assert!(entry.quantity.unwrap_or(0.0) > 0.0);
            assert!(views.all_coins.iter().any(|c| c == entry));
        }
        let held = views.all_coins.iter().filter(|c| c.is_held()).count();
        assert_eq!(held, views.portfolio_coins.len());
    }

    #[tokio::test]
    async fn test_initial_views() {
        let h = harness(catalog(), vec![holding("bitcoin", 2.0)]);

        let views = h.handle.current();
        assert_eq!(ids(&views.all_coins), vec!["bitcoin", "ethereum", "solana"]);
        assert_eq!(ids(&views.portfolio_coins), vec!["bitcoin"]);
        assert_eq!(views.portfolio_coins[0].holding_value, 60000.0);
        assert_eq!(views.statistics.len(), 4);
        assert_eq!(views.statistics[3].display_value, "$60,000.00");
        let change = views.statistics[3].percent_change.unwrap();
        assert!((change - 4.0).abs() < 1e-9);
        assert_consistent(&views);
    }

    #[tokio::test]
    async fn test_holdings_update_propagates() {
        let h = harness(catalog(), vec![holding("bitcoin", 2.0)]);
        let mut views_rx = h.handle.subscribe();

        h.holdings_tx
            .send(vec![holding("bitcoin", 2.0), holding("ethereum", 100.0)])
            .unwrap();
        views_rx.changed().await.unwrap();

        let views = views_rx.borrow_and_update().clone();
        // Default sort is by holding value, largest first
        assert_eq!(ids(&views.portfolio_coins), vec!["ethereum", "bitcoin"]);
        assert_eq!(views.statistics[3].display_value, "$260,000.00");
        assert_consistent(&views);

        // Removing every holding empties the portfolio and its change
        h.holdings_tx.send(Vec::new()).unwrap();
        let views = h.handle.flush().await;
        assert!(views.portfolio_coins.is_empty());
        assert!(views.statistics[3].percent_change.is_none());
        assert_consistent(&views);
    }

    #[tokio::test]
    async fn test_catalog_update_keeps_search_and_sort() {
        let h = harness(catalog(), Vec::new());
        h.handle.set_sort_mode(SortMode::PriceAsc).await;
        h.handle.set_search_text("o").await;
        let views = h.handle.flush().await;
        // "o" matches bitcoin and solana by name/id
        assert_eq!(ids(&views.all_coins), vec!["solana", "bitcoin"]);

        let mut updated = catalog();
        updated.push(coin("polkadot", 12, 5.0));
        h.catalog_tx.send(updated).unwrap();
        let views = h.handle.flush().await;
        assert_eq!(ids(&views.all_coins), vec!["polkadot", "solana", "bitcoin"]);
    }

    #[tokio::test]
    async fn test_sort_mode_applies_without_debounce() {
        let h = harness(catalog(), Vec::new());
        let mut views_rx = h.handle.subscribe();

        h.handle.set_sort_mode(SortMode::RankDesc).await;
        views_rx.changed().await.unwrap();
        assert_eq!(
            ids(&views_rx.borrow().all_coins),
            vec!["solana", "ethereum", "bitcoin"]
        );
    }

    #[tokio::test]
    async fn test_market_update_recomputes_statistics() {
        let h = harness(catalog(), Vec::new());
        let mut views_rx = h.handle.subscribe();

        let mut snapshot = market();
        snapshot.btc_dominance_pct = 51.5;
        h.market_tx.send(Some(snapshot)).unwrap();
        views_rx.changed().await.unwrap();

        let views = views_rx.borrow().clone();
        assert_eq!(views.statistics[2].label, "BTC Dominance");
        assert_eq!(views.statistics[2].display_value, "51.50%");
        assert_eq!(views.all_coins.len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_search_is_debounced() {
        let h = harness(catalog(), Vec::new());
        let mut views_rx = h.handle.subscribe();
        let start = Instant::now();

        // Rapid keystrokes collapse into one recomputation
        h.handle.set_search_text("e").await;
        h.handle.set_search_text("et").await;
        h.handle.set_search_text("eth").await;
        views_rx.changed().await.unwrap();

        assert!(start.elapsed() >= Duration::from_millis(300));
        assert_eq!(ids(&views_rx.borrow_and_update().all_coins), vec!["ethereum"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_search_timer_restarts_on_each_change() {
        let h = harness(catalog(), Vec::new());
        let mut views_rx = h.handle.subscribe();
        let start = Instant::now();

        h.handle.set_search_text("bit").await;
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(!views_rx.has_changed().unwrap());

        h.handle.set_search_text("sol").await;
        views_rx.changed().await.unwrap();

        assert!(start.elapsed() >= Duration::from_millis(500));
        assert_eq!(ids(&views_rx.borrow().all_coins), vec!["solana"]);
    }

    #[tokio::test]
    async fn test_empty_search_restores_catalog() {
        let h = harness(catalog(), Vec::new());
        h.handle.set_search_text("sol").await;
        assert_eq!(h.handle.flush().await.all_coins.len(), 1);

        h.handle.set_search_text("").await;
        assert_eq!(h.handle.flush().await.all_coins.len(), 3);
    }

    #[tokio::test]
    async fn test_portfolio_respects_search_filter() {
        let h = harness(
            catalog(),
            vec![holding("bitcoin", 1.0), holding("solana", 10.0)],
        );
        h.handle.set_search_text("sol").await;
        let views = h.handle.flush().await;
        assert_eq!(ids(&views.portfolio_coins), vec!["solana"]);
        assert_consistent(&views);
    }

    #[tokio::test]
    async fn test_shutdown_stops_task() {
        let h = harness(catalog(), Vec::new());
        let views_rx = h.handle.subscribe();
        h.handle.shutdown().await;

        // The views sender is gone once the task has stopped
        assert!(views_rx.has_changed().is_err());
    }

    #[tokio::test]
    async fn test_survives_closed_inputs() {
        let h = harness(catalog(), vec![holding("ethereum", 1.0)]);
        drop(h.market_tx);
        drop(h.catalog_tx);

        h.holdings_tx.send(vec![holding("ethereum", 3.0)]).unwrap();
        let views = h.handle.flush().await;
        assert_eq!(views.portfolio_coins[0].holding_value, 6000.0);
        assert_eq!(views.statistics.len(), 4);
    }
}
