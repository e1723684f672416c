//! Order placement.

use barshop_core::Price;
use barshop_storefront::checkout::{Customer, placeholder_payment_id};
use barshop_storefront::error::AppError;
use tracing::info;

use super::Context;

/// Place an order for the current cart.
///
/// The address argument overrides `BARSHOP_ADDRESS`.
///
/// # Errors
///
/// Returns an error if no customer is configured or the order is rejected.
pub async fn place(ctx: &Context, address: Option<String>) -> Result<(), AppError> {
    let customer = ctx.config.user_id.clone().map(|id| Customer {
        id,
        address: address
            .or_else(|| ctx.config.address.clone())
            .unwrap_or_default(),
    });

    let confirmation = ctx
        .checkout
        .place_order(&ctx.store, customer.as_ref(), placeholder_payment_id())
        .await?;

    info!(
        "Order {} placed (payment {}), total {}",
        confirmation.order_id,
        confirmation.payment_id,
        Price::new(confirmation.total, ctx.config.currency).display()
    );
    if let Some(promo) = confirmation.promo {
        info!("Promo code {} redeemed", promo.code);
    }
    Ok(())
}
