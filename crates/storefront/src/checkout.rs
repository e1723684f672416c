//! Order placement from a cart.
//!
//! The cart's cached prices and stock are only hints: the backend's
//! `create_order_with_items` procedure re-validates stock and creates the
//! order and its lines atomically. This module builds the submission, reports
//! the outcome, records promo usage, and clears the cart on success.

use std::sync::Arc;

use async_trait::async_trait;
use barshop_core::{OrderId, PaymentId, ProductId, PromoCodeText, UserId};
use rand::Rng;
use rand::distr::Alphanumeric;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::cart::{CartItem, CartStore, pricing};
use crate::promo::AppliedPromo;
use crate::supabase::SupabaseError;

const ADDRESS_MIN_LENGTH: usize = 10;
const ADDRESS_MAX_LENGTH: usize = 500;

/// A signed-in customer placing an order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Customer {
    /// Backend user id.
    pub id: UserId,
    /// Shipping address from the customer's profile.
    pub address: String,
}

/// One order line as the order procedure expects it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderLine {
    pub product_id: ProductId,
    pub product_name: String,
    pub product_price: Decimal,
    pub quantity: u32,
}

impl From<&CartItem> for OrderLine {
    fn from(item: &CartItem) -> Self {
        Self {
            product_id: item.id.clone(),
            product_name: item.name.clone(),
            product_price: item.unit_price,
            quantity: item.quantity,
        }
    }
}

/// Arguments of the order procedure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderDraft {
    #[serde(rename = "p_user_id")]
    pub user_id: UserId,
    /// Discounted total the customer pays.
    #[serde(rename = "p_total_price")]
    pub total_price: Decimal,
    #[serde(rename = "p_address")]
    pub address: String,
    #[serde(rename = "p_payment_id")]
    pub payment_id: PaymentId,
    #[serde(rename = "p_items")]
    pub items: Vec<OrderLine>,
}

/// Result row of the order procedure.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct OrderOutcome {
    pub success: bool,
    #[serde(default)]
    pub order_id: Option<OrderId>,
    #[serde(default)]
    pub error_message: Option<String>,
}

/// Remote order creation.
#[async_trait]
pub trait OrderGateway: Send + Sync {
    /// Create the order and its lines in one transaction.
    async fn create_order(&self, draft: &OrderDraft) -> Result<OrderOutcome, SupabaseError>;

    /// Record that `user_id` redeemed `code` on `order_id`.
    async fn record_promo_usage(
        &self,
        code: &PromoCodeText,
        order_id: &OrderId,
        user_id: &UserId,
    ) -> Result<(), SupabaseError>;
}

/// A placed order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderConfirmation {
    pub order_id: OrderId,
    pub payment_id: PaymentId,
    pub total: Decimal,
    pub promo: Option<AppliedPromo>,
}

/// Reasons an order could not be placed. The cart is untouched in every case.
#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("cart is empty")]
    EmptyCart,

    #[error("customer is not signed in")]
    NotSignedIn,

    #[error("shipping address must be {min}-{max} characters")]
    InvalidAddress { min: usize, max: usize },

    /// The order procedure refused the order.
    #[error("order rejected: {message}")]
    OrderRejected {
        message: String,
        insufficient_stock: bool,
    },

    #[error("order gateway error: {0}")]
    Gateway(#[from] SupabaseError),
}

impl CheckoutError {
    /// Message safe to show a customer.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::EmptyCart => "Your cart is empty".to_string(),
            Self::NotSignedIn => "Please sign in to check out".to_string(),
            Self::InvalidAddress { min, max } => {
                format!("Address must be between {min} and {max} characters")
            }
            Self::OrderRejected {
                insufficient_stock: true,
                ..
            } => "Some items in your cart are no longer available. Please update your cart."
                .to_string(),
            Self::OrderRejected { .. } => "Order creation failed".to_string(),
            Self::Gateway(SupabaseError::Http(_)) => {
                "Network error. Please check your connection and try again.".to_string()
            }
            Self::Gateway(_) => "An error occurred. Please try again later.".to_string(),
        }
    }
}

/// Generate a placeholder payment reference (`pay_` + 9 characters).
///
/// Stands in for the gateway's reference until payment is integrated.
#[must_use]
pub fn placeholder_payment_id() -> PaymentId {
    let suffix: String = rand::rng()
        .sample_iter(Alphanumeric)
        .take(9)
        .map(|b| char::from(b).to_ascii_lowercase())
        .collect();
    PaymentId::new(format!("pay_{suffix}"))
}

/// Places orders for carts.
#[derive(Clone)]
pub struct Checkout {
    gateway: Arc<dyn OrderGateway>,
}

impl Checkout {
    #[must_use]
    pub fn new(gateway: Arc<dyn OrderGateway>) -> Self {
        Self { gateway }
    }

    /// Submit the cart as an order and clear it on success.
    ///
    /// Promo usage is recorded after the order exists; a failure there is
    /// logged and does not fail the order.
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutError`] if the customer is missing, the cart is
    /// empty, the address is invalid, or the backend rejects the order.
    #[instrument(skip(self, cart, customer))]
    pub async fn place_order(
        &self,
        cart: &CartStore,
        customer: Option<&Customer>,
        payment_id: PaymentId,
    ) -> Result<OrderConfirmation, CheckoutError> {
        let customer = customer.ok_or(CheckoutError::NotSignedIn)?;
        let address = customer.address.trim();
        let address_len = address.chars().count();
        if !(ADDRESS_MIN_LENGTH..=ADDRESS_MAX_LENGTH).contains(&address_len) {
            return Err(CheckoutError::InvalidAddress {
                min: ADDRESS_MIN_LENGTH,
                max: ADDRESS_MAX_LENGTH,
            });
        }

        let snapshot = cart.snapshot();
        if snapshot.items.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        let totals = pricing::totals(&snapshot);
        let draft = OrderDraft {
            user_id: customer.id.clone(),
            total_price: totals.total,
            address: address.to_owned(),
            payment_id: payment_id.clone(),
            items: snapshot.items.iter().map(OrderLine::from).collect(),
        };

        let outcome = self.gateway.create_order(&draft).await?;
        if !outcome.success {
            let message = outcome
                .error_message
                .unwrap_or_else(|| "Order creation failed".to_string());
            warn!(error = %message, "order rejected");
            return Err(CheckoutError::OrderRejected {
                insufficient_stock: message.contains("Insufficient stock"),
                message,
            });
        }
        let order_id = outcome.order_id.ok_or_else(|| {
            SupabaseError::InvalidRow("successful order without order_id".to_string())
        })?;

        if let Some(promo) = &snapshot.active_promo
            && let Err(e) = self
                .gateway
                .record_promo_usage(&promo.code, &order_id, &customer.id)
                .await
        {
            warn!(code = %promo.code, order_id = %order_id, error = %e, "failed to record promo usage");
        }

        cart.clear_cart();
        info!(order_id = %order_id, total = %totals.total, "order placed");

        Ok(OrderConfirmation {
            order_id,
            payment_id,
            total: totals.total,
            promo: snapshot.active_promo,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholder_payment_id_shape() {
        let id = placeholder_payment_id();
        let suffix = id.as_str().strip_prefix("pay_").unwrap();
        assert_eq!(suffix.len(), 9);
        assert!(
            suffix
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        );
    }

    #[test]
    fn test_draft_serializes_procedure_arguments() {
        let draft = OrderDraft {
            user_id: UserId::new("u1"),
            total_price: Decimal::from(180),
            address: "12 Market Road, Pune".to_string(),
            payment_id: PaymentId::new("pay_abc"),
            items: vec![OrderLine {
                product_id: ProductId::new("p1"),
                product_name: "Choco Bar".to_string(),
                product_price: Decimal::from(100),
                quantity: 2,
            }],
        };

        let json = serde_json::to_value(&draft).unwrap();
        assert_eq!(json["p_user_id"], "u1");
        assert_eq!(json["p_payment_id"], "pay_abc");
        assert_eq!(json["p_items"][0]["product_id"], "p1");
        assert_eq!(json["p_items"][0]["quantity"], 2);
    }

    #[test]
    fn test_outcome_parses_missing_fields() {
        let outcome: OrderOutcome =
            serde_json::from_str(r#"{"success":false,"error_message":"Insufficient stock for Bar"}"#)
                .unwrap();
        assert!(!outcome.success);
        assert!(outcome.order_id.is_none());
    }

    #[test]
    fn test_user_messages() {
        let stock = CheckoutError::OrderRejected {
            message: "Insufficient stock".to_string(),
            insufficient_stock: true,
        };
        assert!(stock.user_message().contains("no longer available"));

        let gateway = CheckoutError::Gateway(SupabaseError::RateLimited(5));
        assert_eq!(
            gateway.user_message(),
            "An error occurred. Please try again later."
        );
    }
}
