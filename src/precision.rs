// 1.4: every rounding step in the crate goes through here so the feed, the seed
// and the engine can never drift apart on precision.

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

/// Fees are always carried at 8 decimal places.
pub const FEE_DP: u32 = 8;

/// Banker's rounding to `dp` decimal places.
pub fn round_dp(value: Decimal, dp: u32) -> Decimal {
    value.round_dp_with_strategy(dp, RoundingStrategy::MidpointNearestEven)
}

/// Truncate toward zero. Used for fill quantities so a fill never exceeds
/// what the level or the order can provide.
pub fn floor_dp(value: Decimal, dp: u32) -> Decimal {
    value.round_dp_with_strategy(dp, RoundingStrategy::ToZero)
}

pub fn ceil_dp(value: Decimal, dp: u32) -> Decimal {
    value.round_dp_with_strategy(dp, RoundingStrategy::AwayFromZero)
}

/// Snap to the nearest multiple of `tick`. A non-positive tick leaves the value untouched.
pub fn round_to_tick(value: Decimal, tick: Decimal) -> Decimal {
    if tick <= Decimal::ZERO {
        return value;
    }
    (value / tick).round_dp_with_strategy(0, RoundingStrategy::MidpointNearestEven) * tick
}

pub fn fee(notional: Decimal, fee_rate: Decimal) -> Decimal {
    round_dp(notional * fee_rate, FEE_DP)
}

/// NaN and infinities collapse to zero.
pub fn to_decimal(value: f64) -> Decimal {
    Decimal::from_f64(value).unwrap_or(Decimal::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn bankers_rounding() {
        assert_eq!(round_dp(dec!(2.345), 2), dec!(2.34));
        assert_eq!(round_dp(dec!(2.355), 2), dec!(2.36));
        assert_eq!(round_dp(dec!(-1.005), 2), dec!(-1.00));
    }

    #[test]
    fn floor_never_rounds_up() {
        assert_eq!(floor_dp(dec!(0.1234567), 6), dec!(0.123456));
        assert_eq!(floor_dp(dec!(0.9999999), 2), dec!(0.99));
        assert_eq!(ceil_dp(dec!(0.121), 2), dec!(0.13));
    }

    #[test]
    fn tick_snapping() {
        assert_eq!(round_to_tick(dec!(68000.126), dec!(0.01)), dec!(68000.13));
        assert_eq!(round_to_tick(dec!(0.5503), dec!(0.0005)), dec!(0.5505));
        assert_eq!(round_to_tick(dec!(12.3), Decimal::ZERO), dec!(12.3));
    }

    #[test]
    fn fee_at_fixed_precision() {
        assert_eq!(fee(dec!(6800), dec!(0.001)), dec!(6.8));
        assert_eq!(fee(dec!(0.123456789), dec!(0.001)), dec!(0.00012346));
    }

    #[test]
    fn float_conversion_fallback() {
        assert_eq!(to_decimal(f64::NAN), Decimal::ZERO);
        assert_eq!(to_decimal(0.5), dec!(0.5));
    }
}
