//! Promo code commands.

use barshop_storefront::error::AppError;
use tracing::info;

use super::Context;

/// Validate a code against the backend and apply it to the cart.
///
/// # Errors
///
/// Returns an error if the code is malformed, unknown, used up, not
/// available to guests, or the backend cannot be reached.
pub async fn apply(ctx: &Context, code: &str) -> Result<(), AppError> {
    let promo = ctx
        .store
        .apply_promo_code(code, ctx.config.user_id.as_ref())
        .await?;

    let (_, discount, total) = ctx.store.totals().priced(ctx.config.currency);
    info!(
        "Promo code {} applied: {} off (-{}), new total {}",
        promo.code,
        promo.discount_percentage,
        discount.display(),
        total.display()
    );
    Ok(())
}

/// Remove the applied code, if any.
pub fn remove(ctx: &Context) {
    match ctx.store.active_promo() {
        Some(promo) => {
            ctx.store.remove_promo_code();
            info!("Promo code {} removed", promo.code);
        }
        None => info!("No promo code applied"),
    }
}
