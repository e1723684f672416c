//! Product variant discriminator.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`Variant`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum VariantError {
    /// The input string is empty after trimming.
    #[error("variant cannot be empty")]
    Empty,
    /// The input string is too long.
    #[error("variant must be at most {max} characters")]
    TooLong {
        /// Maximum allowed length.
        max: usize,
    },
}

/// The variant of a product held in a cart line, e.g. a protein tier.
///
/// A cart line is identified by its product id *and* its variant, so the same
/// bar in `15g` and `20g` occupies two lines. When a caller does not pick a
/// variant, [`Variant::default`] yields [`Variant::DEFAULT`].
///
/// ```
/// use barshop_core::Variant;
///
/// assert_eq!(Variant::default().as_str(), Variant::DEFAULT);
/// assert_eq!(Variant::parse(" 20g ").unwrap().as_str(), "20g");
/// assert!(Variant::parse("  ").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Variant(String);

impl Variant {
    /// The base protein tier every product is sold in.
    pub const DEFAULT: &'static str = "15g";

    /// Maximum length of a variant label.
    pub const MAX_LENGTH: usize = 50;

    /// Parse a variant label, trimming surrounding whitespace.
    ///
    /// # Errors
    ///
    /// Returns an error if the trimmed input is empty or longer than
    /// [`Variant::MAX_LENGTH`].
    pub fn parse(s: &str) -> Result<Self, VariantError> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(VariantError::Empty);
        }
        if trimmed.chars().count() > Self::MAX_LENGTH {
            return Err(VariantError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the variant label as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Variant {
    fn default() -> Self {
        Self(Self::DEFAULT.to_owned())
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for Variant {
    type Err = VariantError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for Variant {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
