//! Percentage discounts.

use core::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Errors that can occur when constructing a [`DiscountPercentage`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum DiscountError {
    /// Zero or negative percentage.
    #[error("discount percentage must be greater than zero (got {0})")]
    NotPositive(Decimal),
    /// More than the whole price.
    #[error("discount percentage must be at most 100 (got {0})")]
    AboveHundred(Decimal),
}

/// A discount expressed as a percentage of the subtotal, in `(0, 100]`.
///
/// ```
/// use barshop_core::DiscountPercentage;
/// use rust_decimal::Decimal;
///
/// let ten = DiscountPercentage::new(Decimal::from(10)).unwrap();
/// assert_eq!(ten.apply_to(Decimal::from(200)), Decimal::from(20));
///
/// assert!(DiscountPercentage::new(Decimal::ZERO).is_err());
/// assert!(DiscountPercentage::new(Decimal::from(101)).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct DiscountPercentage(Decimal);

impl DiscountPercentage {
    /// Validate a percentage.
    ///
    /// # Errors
    ///
    /// Returns an error unless `0 < value <= 100`.
    pub fn new(value: Decimal) -> Result<Self, DiscountError> {
        if value <= Decimal::ZERO {
            return Err(DiscountError::NotPositive(value));
        }
        if value > Decimal::ONE_HUNDRED {
            return Err(DiscountError::AboveHundred(value));
        }
        Ok(Self(value))
    }

    /// The raw percentage value.
    #[must_use]
    pub const fn value(&self) -> Decimal {
        self.0
    }

    /// Discount amount taken off `amount`. Never more than `amount`.
    #[must_use]
    pub fn apply_to(&self, amount: Decimal) -> Decimal {
        amount.saturating_mul(self.0 / Decimal::ONE_HUNDRED)
    }
}

impl TryFrom<Decimal> for DiscountPercentage {
    type Error = DiscountError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl<'de> Deserialize<'de> for DiscountPercentage {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = <Decimal as Deserialize>::deserialize(deserializer)?;
        Self::new(raw).map_err(serde::de::Error::custom)
    }
}

impl fmt::Display for DiscountPercentage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0.normalize())
    }
}
