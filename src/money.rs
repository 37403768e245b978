use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

use crate::error::CustomError;

/// Balances are kept as integer cents; the API speaks decimal currency units.
pub type Cents = i64;

/// Convert an API amount into cents. Amounts must be positive and carry at
/// most two fractional digits.
pub fn to_cents(amount: Decimal) -> Result<Cents, CustomError> {
    if amount <= Decimal::ZERO {
        return Err(CustomError::Validation(
            "Amount must be positive".to_string(),
        ));
    }
    let scaled = amount * Decimal::ONE_HUNDRED;
    if scaled.fract() != Decimal::ZERO {
        return Err(CustomError::Validation(
            "Amount can have at most two decimal places".to_string(),
        ));
    }
    scaled
        .to_i64()
        .ok_or_else(|| CustomError::Validation("Amount is too large".to_string()))
}

pub fn from_cents(cents: Cents) -> Decimal {
    Decimal::new(cents, 2)
}

/// Serializes a `Cents` field as a decimal amount string.
pub fn serialize_cents<S: serde::Serializer>(cents: &Cents, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&from_cents(*cents).to_string())
}
