//! Cart inspection and editing.

use barshop_core::{Price, ProductId, Variant};
use barshop_storefront::cart::NewCartItem;
use barshop_storefront::error::AppError;
use rust_decimal::Decimal;
use tracing::info;

use super::Context;

/// Build a new cart line from command-line arguments.
///
/// # Errors
///
/// Returns `BadRequest` if the name is blank, or a cart error if the price
/// is out of range.
pub fn new_item(
    id: String,
    name: &str,
    price: Decimal,
    stock: u32,
    variant: Variant,
    image: Option<String>,
) -> Result<NewCartItem, AppError> {
    if name.trim().is_empty() {
        return Err(AppError::BadRequest("Product name is required".to_string()));
    }

    let item = NewCartItem::new(id, name.trim(), price, stock)?.with_variant(variant);
    Ok(match image {
        Some(url) => item.with_image(url),
        None => item,
    })
}

/// Log every line, the applied promo and the totals.
pub fn show(ctx: &Context) {
    let state = ctx.store.snapshot();
    let currency = ctx.config.currency;

    if state.items.is_empty() {
        info!("Your cart is empty");
        return;
    }

    info!(
        "Cart ({} items, prices in {}):",
        ctx.store.total_items(),
        currency.code()
    );
    for item in &state.items {
        info!(
            "  {} [{}] ({}) x{} @ {} = {}",
            item.name,
            item.id,
            item.variant,
            item.quantity,
            Price::new(item.unit_price, currency).display(),
            Price::new(item.line_total(), currency).display(),
        );
        if item.quantity >= item.stock {
            info!("    only {} in stock", item.stock);
        }
    }

    let (subtotal, discount, total) = ctx.store.totals().priced(currency);
    info!("Subtotal: {}", subtotal.display());
    if let Some(promo) = &state.active_promo {
        info!(
            "Discount ({} {}): -{}",
            promo.code,
            promo.discount_percentage,
            discount.display()
        );
    }
    info!("Total:    {}", total.display());
}

/// Add a product, merging into an existing line.
pub fn add(ctx: &Context, item: NewCartItem, quantity: u32) {
    let name = item.name.clone();
    ctx.store.add_item(item, quantity);
    info!("Added {name} to cart ({} items)", ctx.store.total_items());
}

/// Remove a line.
pub fn remove(ctx: &Context, id: &str, variant: &Variant) {
    ctx.store.remove_item(&ProductId::new(id), variant);
    info!("Removed {id} ({variant}) from cart");
}

/// Set the quantity of a line.
pub fn update(ctx: &Context, id: &str, variant: &Variant, quantity: i64) {
    let id = ProductId::new(id);
    ctx.store.update_quantity(&id, variant, quantity);

    match ctx
        .store
        .items()
        .into_iter()
        .find(|item| item.matches(&id, variant))
    {
        Some(item) => info!("{} ({}) now x{}", item.name, item.variant, item.quantity),
        None => info!("{id} ({variant}) is not in the cart"),
    }
}

/// Empty the cart.
pub fn clear(ctx: &Context) {
    ctx.store.clear_cart();
    info!("Cart cleared");
}
