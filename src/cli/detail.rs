use super::ui;
use crate::core::format::{as_currency_with_6, as_percent_string};
use crate::core::{CoinDetail, CoinSnapshot};
use comfy_table::Cell;

const BARS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];
const CHART_WIDTH: usize = 56;

/// Prints the coin's detail table. `market` adds the 7-day price chart when
/// the coin is in the catalog.
pub fn display(detail: &CoinDetail, market: Option<&CoinSnapshot>) {
    println!(
        "{} {}",
        ui::style_text(&detail.name, ui::StyleType::Title),
        ui::style_text(&format!("({})", detail.symbol.to_uppercase()), ui::StyleType::Subtle)
    );

    let mut table = ui::new_styled_table();
    table.set_header(vec![ui::header_cell("Field"), ui::header_cell("Value")]);
    for (label, value) in detail_rows(detail) {
        table.add_row(vec![Cell::new(label), Cell::new(value)]);
    }
    if let Some(coin) = market {
        for (label, value) in sparkline_rows(coin) {
            table.add_row(vec![Cell::new(label), Cell::new(value)]);
        }
    }
    println!("{table}");

    if let Some(chart) = market.and_then(|c| sparkline_chart(&c.sparkline_7d, CHART_WIDTH)) {
        println!("\n{}", ui::style_text("7 Day Price", ui::StyleType::TotalLabel));
        println!("{chart}");
    }

    if let Some(description) = &detail.description {
        println!("\n{description}");
    }
}

fn detail_rows(detail: &CoinDetail) -> Vec<(&'static str, String)> {
    let or_na = |v: Option<String>| v.unwrap_or_else(|| "N/A".to_string());
    vec![
        ("Id", detail.id.clone()),
        (
            "Block Time",
            or_na(detail.block_time_minutes.map(|m| format!("{m} min"))),
        ),
        ("Hashing Algorithm", or_na(detail.hashing_algorithm.clone())),
        ("Website", or_na(detail.website_url.clone())),
        ("Reddit", or_na(detail.reddit_url.clone())),
    ]
}

fn sparkline_rows(coin: &CoinSnapshot) -> Vec<(&'static str, String)> {
    let Some(summary) = coin.sparkline_summary() else {
        return Vec::new();
    };
    vec![
        ("7d Low", as_currency_with_6(summary.low)),
        ("7d High", as_currency_with_6(summary.high)),
        (
            "7d Change",
            summary
                .change_pct()
                .map_or_else(|| "N/A".to_string(), as_percent_string),
        ),
    ]
}

/// Renders `prices` as one line of block characters, sampled down to at
/// most `width` points.
fn sparkline_chart(prices: &[f64], width: usize) -> Option<String> {
    if prices.is_empty() || width == 0 {
        return None;
    }
    let step = prices.len().div_ceil(width);
    let sampled: Vec<f64> = prices.iter().step_by(step).copied().collect();
    let (low, high) = sampled
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &p| {
            (lo.min(p), hi.max(p))
        });
    let span = high - low;

    Some(
        sampled
            .iter()
            .map(|&p| {
                if span > 0.0 {
                    let level = ((p - low) / span * (BARS.len() - 1) as f64).round() as usize;
                    BARS[level.min(BARS.len() - 1)]
                } else {
                    BARS[BARS.len() / 2]
                }
            })
            .collect(),
    )
}
