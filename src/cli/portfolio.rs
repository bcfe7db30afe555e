use super::ui;
use crate::core::format::{as_currency_with_2, as_currency_with_6, as_percent_string};
use crate::core::{EnrichedCoin, StatisticItem};
use crate::pipeline::HomeViews;
use comfy_table::{Attribute, Cell, Color, Table};

const PORTFOLIO_LABEL: &str = "Portfolio Value";

pub fn display(views: &HomeViews) {
    if views.portfolio_coins.is_empty() {
        println!(
            "{}",
            ui::style_text(
                "No holdings yet. Add one with `coinfolio hold <coin-id> <quantity>`.",
                ui::StyleType::Subtle
            )
        );
        return;
    }

    println!("{}", ui::style_text("Portfolio", ui::StyleType::Title));
    println!("{}", holdings_table(&views.portfolio_coins));

    if let Some(total) = views
        .statistics
        .iter()
        .find(|s| s.label == PORTFOLIO_LABEL)
    {
        println!("{}", total_line(total));
    }
}

fn holdings_table(coins: &[EnrichedCoin]) -> Table {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Coin"),
        ui::header_cell("Price"),
        ui::header_cell("24h"),
        ui::header_cell("Quantity"),
        ui::header_cell("Value"),
    ]);

    for enriched in coins {
        let coin = &enriched.coin;
        table.add_row(vec![
            Cell::new(format!("{} ({})", coin.name, coin.symbol.to_uppercase())),
            ui::right_cell(as_currency_with_6(coin.current_price)),
            ui::change_cell(coin.price_change_pct_24h),
            ui::format_optional_cell(enriched.quantity, |q| format!("{q}")),
            ui::right_cell(as_currency_with_2(enriched.holding_value))
                .add_attribute(Attribute::Bold)
                .fg(Color::Green),
        ]);
    }
    table
}

fn total_line(total: &StatisticItem) -> String {
    let change = match total.percent_change {
        Some(pct) => ui::style_text(&format!("({} 24h)", as_percent_string(pct)), ui::StyleType::Subtle),
        None => String::new(),
    };
    format!(
        "{} {} {change}",
        ui::style_text("Total:", ui::StyleType::TotalLabel),
        ui::style_text(&total.display_value, ui::StyleType::TotalValue),
    )
}
