//! Totals derived from cart state.
//!
//! Nothing here is stored: totals are recomputed from the lines and the
//! applied promo on every read.

use barshop_core::{CurrencyCode, Price};
use rust_decimal::Decimal;
use serde::Serialize;

use super::item::CartState;

/// Money totals for a cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CartTotals {
    /// Sum of line totals.
    pub subtotal: Decimal,
    /// Amount taken off by the applied promo, zero without one.
    pub discount_amount: Decimal,
    /// `subtotal - discount_amount`.
    pub total: Decimal,
}

impl CartTotals {
    /// Totals of an empty cart.
    pub const ZERO: Self = Self {
        subtotal: Decimal::ZERO,
        discount_amount: Decimal::ZERO,
        total: Decimal::ZERO,
    };

    /// The three amounts as display prices.
    #[must_use]
    pub const fn priced(&self, currency: CurrencyCode) -> (Price, Price, Price) {
        (
            Price::new(self.subtotal, currency),
            Price::new(self.discount_amount, currency),
            Price::new(self.total, currency),
        )
    }
}

/// Sum of quantities over all lines.
#[must_use]
pub fn total_items(state: &CartState) -> u64 {
    state.items.iter().map(|item| u64::from(item.quantity)).sum()
}

/// Sum of `unit_price * quantity` over all lines, saturating at `Decimal::MAX`.
#[must_use]
pub fn subtotal(state: &CartState) -> Decimal {
    state
        .items
        .iter()
        .map(super::CartItem::line_total)
        .fold(Decimal::ZERO, Decimal::saturating_add)
}

/// Subtotal, promo discount and payable total.
#[must_use]
pub fn totals(state: &CartState) -> CartTotals {
    let subtotal = subtotal(state);
    let discount_amount = state
        .active_promo
        .as_ref()
        .map_or(Decimal::ZERO, |promo| {
            promo.discount_percentage.apply_to(subtotal)
        });

    CartTotals {
        subtotal,
        discount_amount,
        total: subtotal.saturating_sub(discount_amount),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::cart::NewCartItem;
    use crate::promo::AppliedPromo;
    use barshop_core::{DiscountPercentage, PromoCodeText};

    fn state_with(lines: &[(&str, i64, u32)], pct: Option<i64>) -> CartState {
        CartState {
            items: lines
                .iter()
                .map(|(id, price, qty)| {
                    NewCartItem::new(*id, *id, Decimal::from(*price), 100)
                        .unwrap()
                        .into_line(*qty)
                })
                .collect(),
            active_promo: pct.map(|p| AppliedPromo {
                code: PromoCodeText::parse("TEST").unwrap(),
                discount_percentage: DiscountPercentage::new(Decimal::from(p)).unwrap(),
            }),
        }
    }

    #[test]
    fn test_empty_cart_totals() {
        assert_eq!(totals(&CartState::default()), CartTotals::ZERO);
        assert_eq!(total_items(&CartState::default()), 0);
    }

    #[test]
    fn test_totals_without_promo() {
        let state = state_with(&[("a", 100, 2), ("b", 45, 3)], None);
        let t = totals(&state);
        assert_eq!(t.subtotal, Decimal::from(335));
        assert_eq!(t.discount_amount, Decimal::ZERO);
        assert_eq!(t.total, t.subtotal);
        assert_eq!(total_items(&state), 5);
    }

    #[test]
    fn test_totals_with_promo() {
        let state = state_with(&[("a", 100, 2)], Some(10));
        let t = totals(&state);
        assert_eq!(t.subtotal, Decimal::from(200));
        assert_eq!(t.discount_amount, Decimal::from(20));
        assert_eq!(t.total, Decimal::from(180));
    }

    #[test]
    fn test_fractional_discount_is_exact() {
        let state = state_with(&[("a", 99, 1)], Some(15));
        let t = totals(&state);
        assert_eq!(t.discount_amount, Decimal::new(1485, 2));
        assert_eq!(t.total, Decimal::new(8415, 2));
        assert_eq!(t.total + t.discount_amount, t.subtotal);
    }

    #[test]
    fn test_oversized_lines_saturate_instead_of_panicking() {
        let mut state = state_with(&[("a", 1, 1), ("b", 1, 1)], Some(50));
        for item in &mut state.items {
            item.unit_price = Decimal::MAX;
            item.quantity = 2;
        }

        let t = totals(&state);
        assert_eq!(t.subtotal, Decimal::MAX);
        assert!(t.discount_amount > Decimal::ZERO);
        assert_eq!(t.total, t.subtotal - t.discount_amount);
    }

    #[test]
    fn test_priced() {
        let state = state_with(&[("a", 100, 2)], Some(10));
        let (sub, off, total) = totals(&state).priced(CurrencyCode::INR);
        assert_eq!(sub.display(), "₹200.00");
        assert_eq!(off.display(), "₹20.00");
        assert_eq!(total.display(), "₹180.00");
    }
}
