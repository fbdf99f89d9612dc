//! Rounding and clamping shared by the calculators.

use rust_decimal::{Decimal, RoundingStrategy};

/// Rounds to two decimal places, halves away from zero.
///
/// ```
/// use rust_decimal_macros::dec;
/// use impot_core::calculations::common::round_half_up;
///
/// assert_eq!(round_half_up(dec!(570.455)), dec!(570.46));
/// assert_eq!(round_half_up(dec!(570.454)), dec!(570.45));
/// assert_eq!(round_half_up(dec!(-104.005)), dec!(-104.01));
/// ```
pub fn round_half_up(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// `value`, or zero when it is negative.
pub fn non_negative(value: Decimal) -> Decimal {
    value.max(Decimal::ZERO)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;

    // =========================================================================
    // round_half_up tests
    // =========================================================================

    #[test]
    fn round_half_up_rounds_down_below_midpoint() {
        assert_eq!(round_half_up(dec!(123.454)), dec!(123.45));
    }

    #[test]
    fn round_half_up_rounds_up_at_midpoint() {
        assert_eq!(round_half_up(dec!(123.455)), dec!(123.46));
    }

    #[test]
    fn round_half_up_rounds_negative_away_from_zero() {
        assert_eq!(round_half_up(dec!(-123.455)), dec!(-123.46));
    }

    #[test]
    fn round_half_up_keeps_whole_amounts() {
        assert_eq!(round_half_up(dec!(6104.000)), dec!(6104.00));
    }

    // =========================================================================
    // non_negative tests
    // =========================================================================

    #[test]
    fn non_negative_clamps_below_zero() {
        assert_eq!(non_negative(dec!(-0.01)), dec!(0));
        assert_eq!(non_negative(dec!(12.5)), dec!(12.5));
    }
}
