//! Money helpers
//!
//! Prices are held as [`Decimal`] with two decimal places. Storage keeps
//! them as integer cents.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

use super::errors::DomainError;

/// Decimal places kept for every monetary amount
pub const MONEY_DP: u32 = 2;

/// Round to the cent, half up.
pub fn round_cents(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(MONEY_DP, RoundingStrategy::MidpointAwayFromZero)
}

/// Price after a percentage discount.
///
/// The discount itself is rounded to the cent before it is subtracted, so
/// `value - discount` never carries more than two decimal places for a
/// two-place input.
pub fn percentage_discounted(value: Decimal, percentage: i32) -> Decimal {
    let discount = round_cents(value * Decimal::from(percentage) / Decimal::ONE_HUNDRED);
    value - discount
}

/// Convert an amount to integer cents (storage representation).
///
/// Amounts outside the `i64` cent range are rejected.
pub fn to_cents(value: Decimal) -> Result<i64, DomainError> {
    round_cents(value)
        .checked_mul(Decimal::ONE_HUNDRED)
        .and_then(|cents| cents.to_i64())
        .ok_or_else(|| DomainError::Validation(format!("Amount {} is out of range", value)))
}

/// Convert integer cents back to an amount
pub fn from_cents(cents: i64) -> Decimal {
    Decimal::new(cents, MONEY_DP)
}

/// Format an amount as human-readable string
pub fn format_amount(value: Decimal, currency: &str) -> String {
    format!("{:.2} {}", round_cents(value), currency.to_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn twenty_percent_off_one_hundred() {
        let price = percentage_discounted(Decimal::new(10000, 2), 20);
        assert_eq!(price, Decimal::new(8000, 2));
        assert_eq!(price.to_string(), "80.00");
    }

    #[test]
    fn discount_rounds_half_up_at_the_cent() {
        // 15% of 0.10 = 0.015 -> 0.02
        assert_eq!(percentage_discounted(Decimal::new(10, 2), 15), Decimal::new(8, 2));
        // 33% of 10.00 = 3.30
        assert_eq!(percentage_discounted(Decimal::new(1000, 2), 33), Decimal::new(670, 2));
    }

    #[test]
    fn zero_and_full_discounts() {
        let price = Decimal::new(4999, 2);
        assert_eq!(percentage_discounted(price, 0), price);
        assert_eq!(percentage_discounted(price, 100), Decimal::ZERO);
    }

    #[test]
    fn cents_conversion() {
        assert_eq!(to_cents(Decimal::new(1999, 2)).unwrap(), 1999);
        assert_eq!(to_cents(Decimal::new(5, 0)).unwrap(), 500);
        assert_eq!(to_cents(Decimal::new(9995, 3)).unwrap(), 1000);
        assert_eq!(from_cents(250), Decimal::new(250, 2));
    }

    #[test]
    fn amounts_beyond_cent_range_are_rejected() {
        let too_large = Decimal::from(i64::MAX);
        assert!(matches!(to_cents(too_large), Err(DomainError::Validation(_))));
        assert!(matches!(to_cents(Decimal::MAX), Err(DomainError::Validation(_))));
        assert!(matches!(to_cents(-too_large), Err(DomainError::Validation(_))));
        assert_eq!(to_cents(from_cents(i64::MAX)).unwrap(), i64::MAX);
    }

    #[test]
    fn format_uses_upper_case_currency() {
        assert_eq!(format_amount(Decimal::new(5, 0), "usd"), "5.00 USD");
    }
}
