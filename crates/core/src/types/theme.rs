//! UI theme preference stored on a user's profile.

use core::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Error returned when a theme identifier is not one of the known themes.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown theme '{0}'")]
pub struct ThemeError(pub String);

/// One of the seven themes a user can pick.
///
/// The identifier is what gets stored and sent over the wire, e.g. `"forest"`.
///
/// ```
/// use cafe_passport_core::Theme;
///
/// assert_eq!("ocean".parse::<Theme>().unwrap(), Theme::Ocean);
/// assert!("neon".parse::<Theme>().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Default,
    Dark,
    Forest,
    Ocean,
    Roastery,
    Lavender,
    Gothic,
}

impl Theme {
    /// All recognized themes, in display order.
    pub const ALL: [Self; 7] = [
        Self::Default,
        Self::Dark,
        Self::Forest,
        Self::Ocean,
        Self::Roastery,
        Self::Lavender,
        Self::Gothic,
    ];

    /// The stored identifier.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Dark => "dark",
            Self::Forest => "forest",
            Self::Ocean => "ocean",
            Self::Roastery => "roastery",
            Self::Lavender => "lavender",
            Self::Gothic => "gothic",
        }
    }

    /// Human-readable label.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Default => "Default Theme",
            Self::Dark => "Midnight Theme",
            Self::Forest => "Forest Theme",
            Self::Ocean => "Ocean Theme",
            Self::Roastery => "Roastery Theme",
            Self::Lavender => "Lavender Theme",
            Self::Gothic => "Gothic Theme",
        }
    }
}

impl FromStr for Theme {
    type Err = ThemeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|theme| theme.as_str() == s)
            .ok_or_else(|| ThemeError(s.to_owned()))
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for Theme {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <String as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for Theme {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <&str as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(s.parse()?)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for Theme {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <&str as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.as_str(), buf)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_exactly_seven_themes() {
        assert_eq!(Theme::ALL.len(), 7);
    }

    #[test]
    fn test_parse_every_known_theme() {
        for theme in Theme::ALL {
            assert_eq!(theme.as_str().parse::<Theme>().unwrap(), theme);
        }
    }

    #[test]
    fn test_parse_rejects_unknown_and_case_variants() {
        assert!("neon".parse::<Theme>().is_err());
        assert!("Dark".parse::<Theme>().is_err());
        assert!("".parse::<Theme>().is_err());
        assert_eq!(
            "midnight".parse::<Theme>().unwrap_err(),
            ThemeError("midnight".to_string())
        );
    }

    #[test]
    fn test_default_theme() {
        assert_eq!(Theme::default(), Theme::Default);
    }

    #[test]
    fn test_serde_uses_identifier() {
        assert_eq!(serde_json::to_string(&Theme::Roastery).unwrap(), "\"roastery\"");
        let theme: Theme = serde_json::from_str("\"lavender\"").unwrap();
        assert_eq!(theme, Theme::Lavender);
        assert!(serde_json::from_str::<Theme>("\"pink\"").is_err());
    }
}
