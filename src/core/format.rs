//! Display helpers for currency and percentage values.

use regex::Regex;
use std::sync::LazyLock;

/// Formats `value` as dollars with thousands separators and two decimals,
/// e.g. `$60,000.00`.
pub fn as_currency_with_2(value: f64) -> String {
    as_currency(value, 2)
}

/// Same as [`as_currency_with_2`] with up to six decimals, trimmed for
/// values at or above one dollar. Used for coin prices.
pub fn as_currency_with_6(value: f64) -> String {
    if value.abs() >= 1.0 {
        as_currency(value, 2)
    } else {
        as_currency(value, 6)
    }
}

/// `4.00%`
pub fn as_percent_string(value: f64) -> String {
    format!("{value:.2}%")
}

/// Abbreviates large amounts: `$1.23Tr`, `$45.60Bn`, `$7.80M`, `$1.50K`.
pub fn abbreviated_currency(value: f64) -> String {
    let sign = if value < 0.0 { "-" } else { "" };
    let num = value.abs();
    let (scaled, suffix) = match num {
        n if n >= 1_000_000_000_000.0 => (n / 1_000_000_000_000.0, "Tr"),
        n if n >= 1_000_000_000.0 => (n / 1_000_000_000.0, "Bn"),
        n if n >= 1_000_000.0 => (n / 1_000_000.0, "M"),
        n if n >= 1_000.0 => (n / 1_000.0, "K"),
        n => (n, ""),
    };
    format!("{sign}${scaled:.2}{suffix}")
}

fn as_currency(value: f64, decimals: usize) -> String {
    let sign = if value < 0.0 { "-" } else { "" };
    let formatted = format!("{:.*}", decimals, value.abs());
    let (whole, fraction) = formatted
        .split_once('.')
        .unwrap_or((formatted.as_str(), ""));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    if fraction.is_empty() {
        format!("{sign}${grouped}")
    } else {
        format!("{sign}${grouped}.{fraction}")
    }
}

static HTML_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]+>").expect("HTML tag pattern is valid"));

/// Strips HTML tags from coin descriptions. A `<` that never closes is kept
/// as text.
pub fn strip_html(text: &str) -> String {
    HTML_TAG.replace_all(text, "").into_owned()
}
