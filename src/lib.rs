pub mod cache;
pub mod cli;
pub mod core;
pub mod pipeline;
pub mod providers;
pub mod store;
pub mod tracker;

use crate::cli::ui;
use crate::core::SortMode;
use crate::core::config::AppConfig;
use crate::tracker::Tracker;
use anyhow::{Context, Result};
use tracing::{debug, info};

pub enum AppCommand {
    Markets {
        search: Option<String>,
        sort: SortMode,
    },
    Portfolio {
        sort: SortMode,
    },
    Hold {
        coin_id: String,
        quantity: f64,
    },
    Detail {
        coin_id: String,
    },
    Image {
        coin_id: String,
    },
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("Coinfolio starting...");

    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    let tracker = Tracker::from_config(&config)?;
    let result = dispatch(&tracker, command).await;
    tracker.shutdown().await;
    result
}

async fn dispatch(tracker: &Tracker, command: AppCommand) -> Result<()> {
    match command {
        AppCommand::Markets { search, sort } => {
            refresh(tracker).await?;
            tracker.set_sort_mode(sort).await;
            if let Some(text) = search {
                tracker.set_search_text(&text).await;
            }
            cli::markets::display(&tracker.settle().await);
        }
        AppCommand::Portfolio { sort } => {
            refresh(tracker).await?;
            tracker.set_sort_mode(sort).await;
            cli::portfolio::display(&tracker.settle().await);
        }
        AppCommand::Hold { coin_id, quantity } => {
            tracker
                .upsert_holding(&coin_id, quantity)
                .await
                .with_context(|| format!("Failed to save holding for {coin_id}"))?;
            if quantity > 0.0 {
                println!("Holding {quantity} {coin_id}");
            } else {
                println!("Removed {coin_id} from portfolio");
            }
        }
        AppCommand::Detail { coin_id } => {
            let detail = tracker
                .detail(&coin_id)
                .await
                .with_context(|| format!("Failed to fetch details for {coin_id}"))?;
            // The chart is optional; refresh failures are already logged
            tracker.refresh_all().await;
            cli::detail::display(&detail, tracker.coin(&coin_id).as_ref());
        }
        AppCommand::Image { coin_id } => {
            refresh(tracker).await?;
            let bytes = tracker.image(&coin_id).await?;
            let format = cache::ImageFormat::sniff(&bytes)
                .map_or_else(|| "unknown".to_string(), |f| format!("{f:?}"));
            println!(
                "{coin_id}: {} bytes ({format}), cache file {}",
                bytes.len(),
                tracker.image_path(&coin_id).display()
            );
        }
    }
    Ok(())
}

/// Refreshes all remote data behind a spinner. A catalog failure is fatal
/// since nothing has been fetched yet; missing market data only drops the
/// statistics.
async fn refresh(tracker: &Tracker) -> Result<()> {
    let spinner = ui::new_spinner("Fetching market data");
    let report = tracker.refresh_all().await;
    spinner.finish_and_clear();

    if let Some(e) = report.catalog_error {
        return Err(e).context("Failed to fetch coin catalog");
    }
    if let Some(e) = report.market_error {
        eprintln!(
            "{}",
            ui::style_text(
                &format!("Market statistics unavailable: {e}"),
                ui::StyleType::Error
            )
        );
    }
    Ok(())
}
