//! Unified error handling.
//!
//! Provides a unified `AppError` for front ends that drive the cart. Each
//! variant knows whether it is the customer's problem (bad input, rejected
//! code) or ours (backend, configuration), and what may be shown to the customer.

use thiserror::Error;

use crate::cart::CartItemError;
use crate::checkout::CheckoutError;
use crate::config::ConfigError;
use crate::promo::PromoError;
use crate::supabase::SupabaseError;

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration could not be loaded.
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Promo code could not be applied.
    #[error("Promo error: {0}")]
    Promo(#[from] PromoError),

    /// Order could not be placed.
    #[error("Checkout error: {0}")]
    Checkout(#[from] CheckoutError),

    /// Supabase operation failed outside promo/checkout flows.
    #[error("Supabase error: {0}")]
    Supabase(#[from] SupabaseError),

    /// Product could not be added to the cart.
    #[error("Cart error: {0}")]
    Cart(#[from] CartItemError),

    /// Bad input from the customer.
    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl AppError {
    /// Whether this error indicates a fault on our side rather than bad input.
    ///
    /// Front ends report these to error tracking; customer errors are only
    /// shown to the customer.
    #[must_use]
    pub const fn is_internal(&self) -> bool {
        matches!(
            self,
            Self::Config(_)
                | Self::Supabase(_)
                | Self::Promo(PromoError::Remote(_))
                | Self::Checkout(CheckoutError::Gateway(_))
        )
    }

    /// Message safe to show a customer. Internal details are never exposed.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Promo(err) => err.user_message(),
            Self::Checkout(err) => err.user_message(),
            Self::Config(err) => format!("Configuration problem: {err}"),
            Self::Cart(err) => err.to_string(),
            Self::Supabase(SupabaseError::Http(_)) => {
                "Network error. Please check your connection and try again.".to_string()
            }
            Self::Supabase(_) => {
                "An error occurred. Please try again later.".to_string()
            }
            Self::BadRequest(msg) => msg.clone(),
        }
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;
