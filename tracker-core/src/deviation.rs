//! Price deviation filter
//!
//! Oracle prices tick far more often than they move in a meaningful way.
//! An incoming price only replaces the cached one when it differs by at
//! least a threshold expressed in basis points.

use rust_decimal::Decimal;

/// Default threshold: 1 bip = 0.01%
pub const DEFAULT_THRESHOLD_BIPS: Decimal = Decimal::ONE;

const BIPS_PER_UNIT: Decimal = Decimal::from_parts(10_000, 0, 0, false, 0);

/// Relative change between two prices in basis points
///
/// Returns `None` when `old_price` is zero.
pub fn change_in_bips(old_price: Decimal, new_price: Decimal) -> Option<Decimal> {
    if old_price.is_zero() {
        return None;
    }
    let ratio = (new_price - old_price).checked_div(old_price)?;
    ratio.abs().checked_mul(BIPS_PER_UNIT)
}

/// Whether `new_price` moved far enough from `old_price` to be accepted
///
/// A zero `old_price` stands for "no prior price" and always accepts.
pub fn should_accept(old_price: Decimal, new_price: Decimal, threshold_bips: Decimal) -> bool {
    match change_in_bips(old_price, new_price) {
        Some(change) => change >= threshold_bips,
        None => true,
    }
}
