//! Exact decimal accumulation for balances and counts.

use rust_decimal::prelude::*;
use serde_json::Value;

/// Decimal places used when printing token balances.
pub const BALANCE_DP: u32 = 6;
/// Decimal places used when printing rates such as average transaction count.
pub const RATE_DP: u32 = 2;

/// Running sum that never goes through `f64`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecimalSum {
    total: Decimal,
    count: u64,
}

impl DecimalSum {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, value: Decimal) {
        self.total = self.total.saturating_add(value);
        self.count += 1;
    }

    pub fn add_count(&mut self, value: u64) {
        self.add(Decimal::from(value));
    }

    pub fn total(&self) -> Decimal {
        self.total
    }

    /// Sum divided by the number of added values, 0 when nothing was added.
    pub fn mean(&self) -> Decimal {
        ratio(self.total, Decimal::from(self.count))
    }
}

impl FromIterator<Decimal> for DecimalSum {
    fn from_iter<I: IntoIterator<Item = Decimal>>(iter: I) -> Self {
        let mut sum = DecimalSum::new();
        for value in iter {
            sum.add(value);
        }
        sum
    }
}

/// `numerator / denominator`, defined as 0 for a zero denominator.
pub fn ratio(numerator: Decimal, denominator: Decimal) -> Decimal {
    numerator.checked_div(denominator).unwrap_or(Decimal::ZERO)
}

/// Rounds half away from zero and pads to exactly `places` decimals.
pub fn format_fixed(value: Decimal, places: u32) -> String {
    let rounded = value.round_dp_with_strategy(places, RoundingStrategy::MidpointAwayFromZero);
    format!("{:.*}", places as usize, rounded)
}

pub fn format_balance(value: Decimal) -> String {
    format_fixed(value, BALANCE_DP)
}

pub fn format_rate(value: Decimal) -> String {
    format_fixed(value, RATE_DP)
}

/// Scales a raw integer token amount by the mint's decimals.
pub fn raw_to_ui_amount(raw: &str, decimals: u32) -> Option<Decimal> {
    let amount: i128 = raw.trim().parse().ok()?;
    Decimal::try_from_i128_with_scale(amount, decimals).ok()
}

/// Reads a JSON number or numeric string as a decimal.
///
/// Numbers go through their shortest textual form so `0.1` stays `0.1`.
pub fn decimal_from_json(value: &Value) -> Option<Decimal> {
    let text = match value {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.trim().to_string(),
        _ => return None,
    };
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .ok()
}
