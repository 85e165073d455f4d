//! Shared helper for f64 rounding.
//!
//! Rounding goes through `Decimal` so that values like 5.335 round the way a
//! reader expects (half away from zero on the decimal digits) rather than
//! depending on the binary representation of the f64.
//!
//! Returns `0.0` for non-finite inputs (NaN, ±Inf).

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::{Decimal, RoundingStrategy};

/// Round an f64 to `dp` decimal places.
fn round_dp(v: f64, dp: u32) -> f64 {
    if !v.is_finite() {
        tracing::warn!("round_dp received non-finite value {}, defaulting to 0", v);
        return 0.0;
    }
    Decimal::from_f64(v)
        .map(|d| d.round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero))
        .and_then(|d| d.to_f64())
        .unwrap_or(0.0)
}

/// Round an f64 to 2 decimal places (walking time in minutes).
pub(crate) fn round_2dp(v: f64) -> f64 {
    round_dp(v, 2)
}
