//! Cart line items and the cart aggregate.

use barshop_core::{ProductId, Variant};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::promo::AppliedPromo;

/// Highest unit price a line may carry.
///
/// Keeps every line total and cart subtotal far inside `Decimal`'s range.
pub const MAX_UNIT_PRICE: Decimal = Decimal::from_parts(1_000_000_000, 0, 0, false, 0);

/// Reasons a product cannot become a cart line.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CartItemError {
    #[error("Price cannot be negative (got {0})")]
    NegativePrice(Decimal),
    #[error("Price must be at most {max} (got {price})")]
    PriceTooHigh { price: Decimal, max: Decimal },
}

/// Check a unit price against `0..=MAX_UNIT_PRICE`.
///
/// # Errors
///
/// Returns [`CartItemError`] for negative or oversized prices.
pub fn validate_unit_price(price: Decimal) -> Result<(), CartItemError> {
    if price < Decimal::ZERO {
        return Err(CartItemError::NegativePrice(price));
    }
    if price > MAX_UNIT_PRICE {
        return Err(CartItemError::PriceTooHigh {
            price,
            max: MAX_UNIT_PRICE,
        });
    }
    Ok(())
}

/// One line of the cart.
///
/// Field names on the wire match the storefront's original `localStorage`
/// layout (`price`, `protein`), so carts saved by older clients still load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    /// Product identifier. Only unique together with `variant`.
    pub id: ProductId,
    /// Display name.
    pub name: String,
    /// Price of one unit.
    #[serde(rename = "price")]
    pub unit_price: Decimal,
    /// Units in the cart, always in `1..=max(stock, 1)`.
    pub quantity: u32,
    /// Stock snapshot from the last time this product was added.
    pub stock: u32,
    /// Image reference, opaque to the cart.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// Variant discriminator.
    #[serde(rename = "protein", default)]
    pub variant: Variant,
}

impl CartItem {
    /// Whether this line is the `(id, variant)` pair.
    #[must_use]
    pub fn matches(&self, id: &ProductId, variant: &Variant) -> bool {
        self.id == *id && self.variant == *variant
    }

    /// `unit_price * quantity`, saturating at `Decimal::MAX`.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.unit_price.saturating_mul(Decimal::from(self.quantity))
    }

    /// Bring a line read from storage back within the cart's rules.
    ///
    /// Returns `None` when the price is out of range; the quantity is
    /// clamped into `1..=stock` like any other edit.
    pub(crate) fn sanitized(mut self) -> Option<Self> {
        validate_unit_price(self.unit_price).ok()?;
        self.quantity = clamp_quantity(i64::from(self.quantity), self.stock);
        Some(self)
    }
}

/// Product descriptor passed to [`CartStore::add_item`](super::CartStore::add_item).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCartItem {
    pub id: ProductId,
    pub name: String,
    pub unit_price: Decimal,
    pub stock: u32,
    pub image: Option<String>,
    pub variant: Variant,
}

impl NewCartItem {
    /// Descriptor in the default variant with no image.
    ///
    /// # Errors
    ///
    /// Returns [`CartItemError`] if `unit_price` is negative or above
    /// [`MAX_UNIT_PRICE`].
    pub fn new(
        id: impl Into<ProductId>,
        name: impl Into<String>,
        unit_price: Decimal,
        stock: u32,
    ) -> Result<Self, CartItemError> {
        validate_unit_price(unit_price)?;
        Ok(Self {
            id: id.into(),
            name: name.into(),
            unit_price,
            stock,
            image: None,
            variant: Variant::default(),
        })
    }

    /// Set the variant.
    #[must_use]
    pub fn with_variant(mut self, variant: Variant) -> Self {
        self.variant = variant;
        self
    }

    /// Set the image reference.
    #[must_use]
    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }

    pub(crate) fn into_line(self, quantity: u32) -> CartItem {
        CartItem {
            id: self.id,
            name: self.name,
            unit_price: self.unit_price,
            quantity,
            stock: self.stock,
            image: self.image,
            variant: self.variant,
        }
    }
}

/// Everything the cart holds.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CartState {
    /// Lines in insertion order.
    pub items: Vec<CartItem>,
    /// At most one applied promo.
    pub active_promo: Option<AppliedPromo>,
}

/// Clamp a requested quantity into `1..=stock`.
///
/// A line always keeps at least one unit, even when the cached stock has
/// dropped to zero; the order procedure rejects it at submission.
#[must_use]
pub fn clamp_quantity(requested: i64, stock: u32) -> u32 {
    let capped = requested.min(i64::from(stock)).max(1);
    u32::try_from(capped).unwrap_or(1)
}
