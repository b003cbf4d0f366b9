//! Monetary value helpers shared across the crate.
//!
//! All amounts are `rust_decimal::Decimal`. Intermediate math keeps full
//! precision; values are rounded to two places at persistence and output
//! boundaries through [`round2`].

use rust_decimal::{Decimal, RoundingStrategy};

/// Rounds a monetary value to 2 decimal places, away from zero on midpoints.
pub fn round2(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Compares two monetary values under the one-cent rounding tolerance.
pub fn within_cent(left: Decimal, right: Decimal) -> bool {
    (left - right).abs() <= Decimal::new(1, 2)
}
