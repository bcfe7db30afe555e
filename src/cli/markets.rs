use super::ui;
use crate::core::EnrichedCoin;
use crate::core::format::{abbreviated_currency, as_currency_with_6};
use crate::pipeline::HomeViews;
use comfy_table::{Cell, Table};

/// Prints the statistics strip followed by the filtered, sorted coin list.
pub fn display(views: &HomeViews) {
    if !views.statistics.is_empty() {
        println!("{}", ui::statistics_table(&views.statistics));
    }

    if views.all_coins.is_empty() {
        println!(
            "{}",
            ui::style_text("No coins match the current search.", ui::StyleType::Subtle)
        );
        return;
    }

    println!(
        "\n{}",
        ui::style_text("Live Prices", ui::StyleType::Title)
    );
    println!("{}", coins_table(&views.all_coins));
}

fn coins_table(coins: &[EnrichedCoin]) -> Table {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("#"),
        ui::header_cell("Coin"),
        ui::header_cell("Price"),
        ui::header_cell("24h"),
        ui::header_cell("Market Cap"),
        ui::header_cell("Holdings"),
    ]);

    for enriched in coins {
        let coin = &enriched.coin;
        let rank = if coin.rank == u32::MAX {
            "-".to_string()
        } else {
            coin.rank.to_string()
        };
        table.add_row(vec![
            ui::right_cell(rank),
            Cell::new(format!("{} ({})", coin.name, coin.symbol.to_uppercase())),
            ui::right_cell(as_currency_with_6(coin.current_price)),
            ui::change_cell(coin.price_change_pct_24h),
            ui::format_optional_cell(coin.market_cap, abbreviated_currency),
            ui::format_optional_cell(enriched.quantity, |q| format!("{q}")),
        ]);
    }
    table
}
