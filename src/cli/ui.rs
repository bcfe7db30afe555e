use crate::core::StatisticItem;
use crate::core::format::as_percent_string;
use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Defines different styles for text elements.
pub enum StyleType {
    Title,
    TotalLabel,
    TotalValue,
    Error,
    Subtle,
}

/// Applies a consistent style to a string.
pub fn style_text(text: &str, style_type: StyleType) -> String {
    let styled = match style_type {
        StyleType::Title => style(text).bold().underlined(),
        StyleType::TotalLabel => style(text).bold(),
        StyleType::TotalValue => style(text).green().bold(),
        StyleType::Error => style(text).red(),
        StyleType::Subtle => style(text).dim(),
    };
    styled.to_string()
}

/// Creates a new `comfy_table::Table` with standard styling.
pub fn new_styled_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

/// Creates a styled header cell for a table.
pub fn header_cell(text: &str) -> Cell {
    Cell::new(text)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

pub fn right_cell(text: String) -> Cell {
    Cell::new(text).set_alignment(CellAlignment::Right)
}

/// Formats an `Option<T>` into a `Cell`. `None` is displayed as "N/A".
pub fn format_optional_cell<T>(value: Option<T>, format_fn: impl Fn(T) -> String) -> Cell {
    value.map_or(
        Cell::new("N/A")
            .fg(Color::DarkGrey)
            .set_alignment(CellAlignment::Right),
        |v| right_cell(format_fn(v)),
    )
}

/// Creates a cell for displaying percentage change with color coding.
pub fn change_cell(change: Option<f64>) -> Cell {
    let Some(change) = change else {
        return format_optional_cell(None::<f64>, as_percent_string);
    };
    let color = if change >= 0.0 { Color::Green } else { Color::Red };
    right_cell(as_percent_string(change)).fg(color)
}

/// Renders the statistics strip shown above the coin tables.
pub fn statistics_table(statistics: &[StatisticItem]) -> Table {
    let mut table = new_styled_table();
    table.set_header(
        statistics
            .iter()
            .map(|s| header_cell(&s.label))
            .collect::<Vec<_>>(),
    );

    let values = statistics.iter().map(|s| match s.percent_change {
        Some(change) => {
            let arrow = if change >= 0.0 { "▲" } else { "▼" };
            let color = if change >= 0.0 { Color::Green } else { Color::Red };
            Cell::new(format!(
                "{}\n{arrow} {}",
                s.display_value,
                as_percent_string(change.abs())
            ))
            .fg(color)
        }
        None => Cell::new(&s.display_value),
    });
    table.add_row(values.collect::<Vec<_>>());
    table
}

/// Creates a spinner shown while network refreshes are in flight.
pub fn new_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg} [{elapsed_precise}]")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}
