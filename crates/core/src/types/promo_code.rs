//! Promotional code text.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`PromoCodeText`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PromoCodeError {
    /// The input string is empty after trimming.
    #[error("promo code cannot be empty")]
    Empty,
    /// The input string is too long.
    #[error("promo code must be at most {max} characters")]
    TooLong {
        /// Maximum allowed length.
        max: usize,
    },
    /// The input contains whitespace between characters.
    #[error("promo code cannot contain whitespace")]
    ContainsWhitespace,
}

/// A normalized promotional code.
///
/// Codes are case-insensitive for customers but stored uppercase by the
/// backend, so parsing trims and uppercases the input.
///
/// ## Constraints
///
/// - Length: 1-64 characters after trimming
/// - No inner whitespace
///
/// ## Examples
///
/// ```
/// use barshop_core::PromoCodeText;
///
/// let code = PromoCodeText::parse("  welcome10 ").unwrap();
/// assert_eq!(code.as_str(), "WELCOME10");
///
/// assert!(PromoCodeText::parse("").is_err());
/// assert!(PromoCodeText::parse("two words").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct PromoCodeText(String);

impl PromoCodeText {
    /// Maximum length of a promo code.
    pub const MAX_LENGTH: usize = 64;

    /// Parse and normalize a promo code.
    ///
    /// # Errors
    ///
    /// Returns an error if the trimmed input is empty, longer than
    /// [`PromoCodeText::MAX_LENGTH`], or contains inner whitespace.
    pub fn parse(s: &str) -> Result<Self, PromoCodeError> {
        let trimmed = s.trim();

        if trimmed.is_empty() {
            return Err(PromoCodeError::Empty);
        }

        if trimmed.chars().count() > Self::MAX_LENGTH {
            return Err(PromoCodeError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }

        if trimmed.chars().any(char::is_whitespace) {
            return Err(PromoCodeError::ContainsWhitespace);
        }

        Ok(Self(trimmed.to_uppercase()))
    }

    /// Returns the normalized code as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the code and returns its inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

// Stored codes go through the same normalization as typed ones.
impl<'de> Deserialize<'de> for PromoCodeText {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

impl fmt::Display for PromoCodeText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for PromoCodeText {
    type Err = PromoCodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for PromoCodeText {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
