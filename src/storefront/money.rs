//! Brazilian real parsing and display helpers.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use std::str::FromStr;

/// Parse a user-typed BRL amount such as `"1.234,56"`, `"R$ 10"` or `"49.9"`.
///
/// Anything other than digits and separators is ignored. When a comma is
/// present it is the decimal separator and dots are thousands separators.
pub fn parse_brl(input: &str) -> Option<Decimal> {
    let cleaned: String = input
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == ',' || *c == '.')
        .collect();
    if !cleaned.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }

    let normalized = if cleaned.contains(',') {
        cleaned.replace('.', "").replacen(',', ".", 1).replace(',', "")
    } else {
        cleaned
    };

    Decimal::from_str(&normalized).ok()
}

/// Format an amount as `R$ 1.234,56`.
pub fn format_brl(amount: Decimal) -> String {
    let rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    let sign = if rounded < Decimal::ZERO { "-" } else { "" };
    let text = format!("{:.2}", rounded.abs());
    let (int_part, frac_part) = text.split_once('.').unwrap_or((text.as_str(), "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }

    format!("{}R$ {},{}", sign, grouped, frac_part)
}

/// Convert a currency amount to whole minor units (centavos), rounding half away from zero.
pub fn to_minor_units(amount: Decimal) -> Option<i64> {
    (amount * Decimal::ONE_HUNDRED)
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
}
