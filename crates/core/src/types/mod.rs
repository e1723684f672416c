//! Core types for Barshop.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod discount;
pub mod id;
pub mod price;
pub mod promo_code;
pub mod variant;

pub use discount::{DiscountError, DiscountPercentage};
pub use id::*;
pub use price::{CurrencyCode, Price};
pub use promo_code::{PromoCodeError, PromoCodeText};
pub use variant::{Variant, VariantError};
