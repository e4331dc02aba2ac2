//! Star rating on a 0-5 scale.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when constructing a [`Rating`].
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq)]
pub enum RatingError {
    /// NaN or infinite input.
    #[error("rating must be a number")]
    NotFinite,
    /// Outside the inclusive 0-5 range.
    #[error("rating must be between {min} and {max} (got {value})")]
    OutOfRange {
        /// Offending value.
        value: f64,
        /// Lower bound.
        min: f64,
        /// Upper bound.
        max: f64,
    },
}

/// A rating between 0.0 and 5.0 inclusive.
///
/// Used for visit ratings, favorite item ratings and a cafe's Google rating.
///
/// ```
/// use cafe_passport_core::Rating;
///
/// assert!(Rating::new(4.5).is_ok());
/// assert!(Rating::new(5.5).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Rating(f64);

impl Rating {
    /// Lowest allowed rating.
    pub const MIN: f64 = 0.0;
    /// Highest allowed rating.
    pub const MAX: f64 = 5.0;

    /// Validate and wrap a rating value.
    ///
    /// # Errors
    ///
    /// Returns an error if the value is not finite or outside 0-5.
    pub fn new(value: f64) -> Result<Self, RatingError> {
        if !value.is_finite() {
            return Err(RatingError::NotFinite);
        }
        if !(Self::MIN..=Self::MAX).contains(&value) {
            return Err(RatingError::OutOfRange {
                value,
                min: Self::MIN,
                max: Self::MAX,
            });
        }
        Ok(Self(value))
    }

    /// The underlying value.
    #[must_use]
    pub const fn value(&self) -> f64 {
        self.0
    }
}

impl TryFrom<f64> for Rating {
    type Error = RatingError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Rating> for f64 {
    fn from(rating: Rating) -> Self {
        rating.0
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1}", self.0)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for Rating {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <f64 as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <f64 as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for Rating {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let v = <f64 as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(Self::new(v)?)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for Rating {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <f64 as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_bounds_are_inclusive() {
        assert!(Rating::new(0.0).is_ok());
        assert!(Rating::new(5.0).is_ok());
    }

    #[test]
    fn test_out_of_range() {
        assert!(matches!(
            Rating::new(-0.1),
            Err(RatingError::OutOfRange { .. })
        ));
        assert!(matches!(
            Rating::new(5.01),
            Err(RatingError::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_not_finite() {
        assert_eq!(Rating::new(f64::NAN), Err(RatingError::NotFinite));
        assert_eq!(Rating::new(f64::INFINITY), Err(RatingError::NotFinite));
    }

    #[test]
    fn test_display_one_decimal() {
        assert_eq!(Rating::new(4.0).unwrap().to_string(), "4.0");
    }

    #[test]
    fn test_deserialize_validates() {
        let r: Rating = serde_json::from_str("4.5").unwrap();
        assert!((r.value() - 4.5).abs() < f64::EPSILON);
        assert!(serde_json::from_str::<Rating>("7").is_err());
    }
}
