//! Monetary helpers over `rust_decimal::Decimal`.
//!
//! Amounts are carried at full precision through every calculation and are
//! rounded only when presented or persisted.

use rust_decimal::{Decimal, RoundingStrategy};

/// Fractional digits used when presenting or persisting currency amounts.
pub const MONEY_SCALE: u32 = 2;

/// Round an amount to [`MONEY_SCALE`] digits, midpoint away from zero.
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// `amount × percent / 100`, unrounded. Saturates at the bounds of `Decimal`.
pub fn percent_of(amount: Decimal, percent: Decimal) -> Decimal {
    amount.saturating_mul(percent) / Decimal::ONE_HUNDRED
}

/// `amount × percent / 100`, or `None` when the product does not fit.
pub fn checked_percent_of(amount: Decimal, percent: Decimal) -> Option<Decimal> {
    amount.checked_mul(percent)?.checked_div(Decimal::ONE_HUNDRED)
}

/// `max(amount, 0)`.
pub fn non_negative(amount: Decimal) -> Decimal {
    amount.max(Decimal::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounds_half_away_from_zero() {
        assert_eq!(round_money(Decimal::new(12345, 3)), Decimal::new(1235, 2));
        assert_eq!(round_money(Decimal::new(-12345, 3)), Decimal::new(-1235, 2));
        assert_eq!(round_money(Decimal::new(12344, 3)), Decimal::new(1234, 2));
    }

    #[test]
    fn percent_is_exact() {
        assert_eq!(
            percent_of(Decimal::from(24000), Decimal::from(12)),
            Decimal::from(2880)
        );
        // 0.1 * 6% must not drift the way binary floats do.
        assert_eq!(
            percent_of(Decimal::new(1, 1), Decimal::from(6)),
            Decimal::new(6, 3)
        );
    }

    #[test]
    fn overflowing_percent_is_detected() {
        assert_eq!(checked_percent_of(Decimal::MAX, Decimal::from(12)), None);
        assert_eq!(
            checked_percent_of(Decimal::from(24000), Decimal::from(12)),
            Some(Decimal::from(2880))
        );
        // The unchecked form saturates instead of panicking.
        assert_eq!(
            percent_of(Decimal::MAX, Decimal::from(12)),
            Decimal::MAX / Decimal::ONE_HUNDRED
        );
    }

    #[test]
    fn clamps_negative_to_zero() {
        assert_eq!(non_negative(Decimal::from(-5)), Decimal::ZERO);
        assert_eq!(non_negative(Decimal::from(5)), Decimal::from(5));
    }
}
