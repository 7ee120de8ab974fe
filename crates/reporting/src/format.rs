//! Display formatting shared by the console report and the CSV export.

use chrono::NaiveDate;
use rust_decimal::Decimal;

/// Placeholder for a metric without enough data behind it.
pub const NOT_AVAILABLE: &str = "n/a";

/// Whole dollars with thousands separators, e.g. `$1,250,000`.
pub fn money(value: Decimal) -> String {
    let rounded = value.round_dp(0);
    let sign = if rounded.is_sign_negative() && !rounded.is_zero() { "-" } else { "" };
    format!("{sign}${}", group_thousands(&rounded.abs().trunc().to_string()))
}

/// A `[0, 1]` rate as a percentage with `decimals` fractional digits.
pub fn percent(rate: Decimal, decimals: u32) -> String {
    format!("{}%", (rate * Decimal::ONE_HUNDRED).round_dp(decimals))
}

pub fn days(value: Decimal) -> String {
    format!("{} days", value.round_dp(0))
}

pub fn optional<T>(value: Option<T>, render: impl Fn(T) -> String) -> String {
    value.map(render).unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

/// `YYYY-MM-DD`, or an empty cell.
pub fn date_cell(date: Option<NaiveDate>) -> String {
    date.map(|d| d.format("%Y-%m-%d").to_string()).unwrap_or_default()
}

fn group_thousands(digits: &str) -> String {
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped
}
