//! Decimal bounds and scale helpers shared by the data model and the
//! matching engine.
//!
//! Every monetary field in this crate is a `rust_decimal::Decimal`. There is
//! no fixed-point re-encoding anywhere: the record store is the source of
//! truth for ordering and comparison, so `Decimal`'s own `Ord` impl is used
//! directly instead of scaling into an `i64` for in-memory comparison.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Smallest positive value accepted for price, amount, or fee.
pub const MIN_POSITIVE: Decimal = dec!(0.000000000001);

/// Max fractional digits persisted for `price`.
pub const PRICE_SCALE: u32 = 16;
/// Max fractional digits persisted for `amount`.
pub const AMOUNT_SCALE: u32 = 8;
/// Max fractional digits persisted for `fee`.
pub const FEE_SCALE: u32 = 9;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DecimalBoundsError {
    #[error("value must be positive, got {0}")]
    NotPositive(Decimal),
    #[error("value {0} is below the minimum of {1}")]
    BelowMinimum(Decimal, Decimal),
}

/// Validate a positive quantity (price or amount) against `MIN_POSITIVE`,
/// then clamp its scale.
pub fn validate_positive(value: Decimal, scale: u32) -> Result<Decimal, DecimalBoundsError> {
    if value <= Decimal::ZERO {
        return Err(DecimalBoundsError::NotPositive(value));
    }
    if value < MIN_POSITIVE {
        return Err(DecimalBoundsError::BelowMinimum(value, MIN_POSITIVE));
    }
    let mut clamped = value;
    clamped.rescale(scale);
    Ok(clamped)
}

/// Validate a fee rate: non-negative, clamped to `FEE_SCALE`.
pub fn validate_fee(value: Decimal) -> Result<Decimal, DecimalBoundsError> {
    if value < Decimal::ZERO {
        return Err(DecimalBoundsError::NotPositive(value));
    }
    let mut clamped = value;
    clamped.rescale(FEE_SCALE);
    Ok(clamped)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_zero_and_negative() {
        assert!(validate_positive(dec!(0), AMOUNT_SCALE).is_err());
        assert!(validate_positive(dec!(-1), AMOUNT_SCALE).is_err());
    }

    #[test]
    fn rejects_below_minimum() {
        assert!(validate_positive(dec!(0.0000000000001), AMOUNT_SCALE).is_err());
    }

    #[test]
    fn accepts_minimum() {
        assert!(validate_positive(MIN_POSITIVE, PRICE_SCALE).is_ok());
    }

    #[test]
    fn clamps_scale() {
        let value = validate_positive(dec!(1.123456789), AMOUNT_SCALE).unwrap();
        assert_eq!(value.scale(), AMOUNT_SCALE);
    }

    #[test]
    fn fee_allows_zero() {
        assert_eq!(validate_fee(dec!(0)).unwrap(), dec!(0.000000000));
    }
}
