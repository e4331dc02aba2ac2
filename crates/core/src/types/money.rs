//! Non-negative monetary amount using decimal arithmetic.

use core::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Errors that can occur when constructing [`Money`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum MoneyError {
    /// The amount is below zero.
    #[error("amount cannot be negative")]
    Negative,
    /// More than two digits after the decimal point.
    #[error("amount can have at most 2 decimal places")]
    TooPrecise,
    /// Larger than the `NUMERIC(10,2)` column can hold.
    #[error("amount must be less than {max}")]
    TooLarge {
        /// Exclusive upper bound.
        max: Decimal,
    },
}

/// An amount in the user's currency, e.g. what was spent on a visit or the
/// price of a favorite item.
///
/// Stored as `NUMERIC(10,2)`.
///
/// ```
/// use cafe_passport_core::Money;
/// use rust_decimal::Decimal;
///
/// assert!(Money::new(Decimal::new(1250, 2)).is_ok()); // 12.50
/// assert!(Money::new(Decimal::new(-1, 0)).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Money(Decimal);

impl Money {
    /// Exclusive upper bound imposed by `NUMERIC(10,2)`.
    pub const MAX: Decimal = Decimal::from_parts(100_000_000, 0, 0, false, 0);

    /// Validate and wrap an amount.
    ///
    /// Trailing zeros beyond two places are accepted (`12.500`), other extra
    /// precision is not.
    ///
    /// # Errors
    ///
    /// Returns an error if the amount is negative, has more than two decimal
    /// places, or does not fit the column.
    pub fn new(amount: Decimal) -> Result<Self, MoneyError> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(MoneyError::Negative);
        }
        let normalized = amount.normalize();
        if normalized.scale() > 2 {
            return Err(MoneyError::TooPrecise);
        }
        if normalized >= Self::MAX {
            return Err(MoneyError::TooLarge { max: Self::MAX });
        }
        let mut value = normalized;
        value.rescale(2);
        Ok(Self(value))
    }

    /// Zero.
    #[must_use]
    pub const fn zero() -> Self {
        Self(Decimal::from_parts(0, 0, 0, false, 2))
    }

    /// The underlying decimal, always at scale 2.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }
}

impl TryFrom<Decimal> for Money {
    type Error = MoneyError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Money> for Decimal {
    fn from(money: Money) -> Self {
        money.0
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for Money {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <Decimal as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <Decimal as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for Money {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let v = <Decimal as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(Self::new(v)?)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for Money {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <Decimal as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::str::FromStr;

    use super::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_accepts_two_places_and_rescales() {
        let m = Money::new(dec("12.5")).unwrap();
        assert_eq!(m.to_string(), "12.50");
        assert_eq!(m.amount().scale(), 2);
    }

    #[test]
    fn test_accepts_trailing_zeros() {
        assert_eq!(Money::new(dec("3.000")).unwrap().amount(), dec("3.00"));
    }

    #[test]
    fn test_rejects_negative() {
        assert_eq!(Money::new(dec("-0.01")), Err(MoneyError::Negative));
    }

    #[test]
    fn test_negative_zero_is_zero() {
        assert_eq!(Money::new(dec("-0")).unwrap(), Money::zero());
    }

    #[test]
    fn test_rejects_extra_precision() {
        assert_eq!(Money::new(dec("1.005")), Err(MoneyError::TooPrecise));
    }

    #[test]
    fn test_max_bound() {
        assert_eq!(Money::MAX, dec("100000000"));
        assert!(Money::new(dec("99999999.99")).is_ok());
        assert!(matches!(
            Money::new(dec("100000000")),
            Err(MoneyError::TooLarge { .. })
        ));
    }

    #[test]
    fn test_deserialize_from_string_and_number() {
        let a: Money = serde_json::from_str("\"12.50\"").unwrap();
        let b: Money = serde_json::from_str("12.5").unwrap();
        assert_eq!(a, b);
        assert!(serde_json::from_str::<Money>("\"-3\"").is_err());
    }
}
