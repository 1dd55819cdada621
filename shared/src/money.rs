//! Money calculation utilities using rust_decimal for precision
//!
//! Amounts are stored and serialized as `f64` (JMD, two decimals). All
//! arithmetic goes through `Decimal` and is rounded back on the way out.

use rust_decimal::prelude::*;

/// Rounding strategy for monetary values (2 decimal places, half-up)
const DECIMAL_PLACES: u32 = 2;

/// Tolerance for monetary comparisons (0.01)
pub const MONEY_TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

/// Convert f64 to Decimal for calculation
#[inline]
pub fn to_decimal(value: f64) -> Decimal {
    Decimal::from_f64(value).unwrap_or_default()
}

/// Convert Decimal back to f64 for storage, rounded to 2 decimal places
#[inline]
pub fn to_f64(value: Decimal) -> f64 {
    value
        .round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
        .to_f64()
        .unwrap_or_default()
}

/// `unit_price * quantity`
pub fn line_total(unit_price: f64, quantity: i64) -> f64 {
    to_f64(to_decimal(unit_price) * Decimal::from(quantity))
}

/// Sum of `(unit_price, quantity)` lines
pub fn sum_lines<I>(lines: I) -> f64
where
    I: IntoIterator<Item = (f64, i64)>,
{
    let total: Decimal = lines
        .into_iter()
        .map(|(price, qty)| to_decimal(price) * Decimal::from(qty))
        .sum();
    to_f64(total)
}

/// `a + b` with decimal precision
pub fn add(a: f64, b: f64) -> f64 {
    to_f64(to_decimal(a) + to_decimal(b))
}

/// Compare two monetary values for equality (within 0.01 tolerance)
pub fn money_eq(a: f64, b: f64) -> bool {
    let diff = (to_decimal(a) - to_decimal(b)).abs();
    diff < MONEY_TOLERANCE
}
