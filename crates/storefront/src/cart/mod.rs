//! Cart store.
//!
//! [`CartStore`] holds the customer's cart in memory, mirrors every mutation
//! to [`CartStorage`], and validates promo codes against a
//! [`PromoAuthority`].
//!
//! # Concurrency
//!
//! All methods take `&self`. Synchronous mutations run to completion under an
//! internal mutex. [`CartStore::apply_promo_code`] releases the lock while it
//! waits on the network, so a clear or removal may land in between. Every
//! promo-affecting mutation bumps a generation counter and a validation only
//! commits if the counter has not moved since it started, so a late answer
//! can never resurrect a promo the customer already discarded.
//!
//! # Quantity policy
//!
//! Quantity edits never fail: out-of-range requests are clamped into
//! `1..=stock`. Removing a line is only possible through
//! [`CartStore::remove_item`].

mod item;
pub mod pricing;

pub use item::{
    CartItem, CartItemError, CartState, MAX_UNIT_PRICE, NewCartItem, clamp_quantity,
    validate_unit_price,
};
pub use pricing::CartTotals;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use barshop_core::{ProductId, PromoCodeText, UserId, Variant};
use tracing::{debug, info, instrument, warn};

use crate::promo::{AppliedPromo, GuestPromoPolicy, PromoAuthority, PromoError};
use crate::storage::{CartStorage, StorageError, keys};

/// Client-side cart with local persistence and remote promo validation.
pub struct CartStore {
    storage: Arc<dyn CartStorage>,
    authority: Arc<dyn PromoAuthority>,
    guest_policy: GuestPromoPolicy,
    inner: Mutex<StoreInner>,
}

struct StoreInner {
    state: CartState,
    promo_generation: u64,
}

impl std::fmt::Debug for CartStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CartStore")
            .field("guest_policy", &self.guest_policy)
            .field("state", &self.lock().state)
            .finish_non_exhaustive()
    }
}

impl CartStore {
    /// Open a store, rehydrating whatever `storage` holds.
    ///
    /// Missing or unreadable data yields an empty cart; corruption is logged,
    /// never returned.
    pub fn open(
        storage: Arc<dyn CartStorage>,
        authority: Arc<dyn PromoAuthority>,
        guest_policy: GuestPromoPolicy,
    ) -> Self {
        let state = load_state(storage.as_ref());
        debug!(
            lines = state.items.len(),
            promo = state.active_promo.is_some(),
            "cart rehydrated"
        );

        Self {
            storage,
            authority,
            guest_policy,
            inner: Mutex::new(StoreInner {
                state,
                promo_generation: 0,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, StoreInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Add `quantity` units of `item`, merging with an existing
    /// `(id, variant)` line.
    ///
    /// Requests below one count as one. The resulting quantity is capped at
    /// `item.stock`, which also becomes the line's cached stock.
    #[instrument(skip(self, item), fields(id = %item.id, variant = %item.variant))]
    pub fn add_item(&self, item: NewCartItem, quantity: u32) {
        let requested = i64::from(quantity.max(1));
        let mut inner = self.lock();

        if let Some(line) = inner
            .state
            .items
            .iter_mut()
            .find(|line| line.matches(&item.id, &item.variant))
        {
            line.stock = item.stock;
            line.quantity = clamp_quantity(i64::from(line.quantity) + requested, item.stock);
            debug!(quantity = line.quantity, "merged into existing line");
        } else {
            let quantity = clamp_quantity(requested, item.stock);
            debug!(quantity, "appended new line");
            inner.state.items.push(item.into_line(quantity));
        }

        self.persist_items(&inner.state);
    }

    /// Remove the `(id, variant)` line. Absent lines are ignored.
    #[instrument(skip(self))]
    pub fn remove_item(&self, id: &ProductId, variant: &Variant) {
        let mut inner = self.lock();
        let before = inner.state.items.len();
        inner.state.items.retain(|line| !line.matches(id, variant));

        if inner.state.items.len() != before {
            self.persist_items(&inner.state);
        }
    }

    /// Set the quantity of the `(id, variant)` line, clamped into
    /// `1..=stock`. Absent lines are ignored.
    #[instrument(skip(self))]
    pub fn update_quantity(&self, id: &ProductId, variant: &Variant, quantity: i64) {
        let mut inner = self.lock();
        let Some(line) = inner
            .state
            .items
            .iter_mut()
            .find(|line| line.matches(id, variant))
        else {
            return;
        };

        line.quantity = clamp_quantity(quantity, line.stock);
        self.persist_items(&inner.state);
    }

    /// Empty the cart and drop the promo.
    ///
    /// Any promo validation still in flight is discarded when it returns.
    #[instrument(skip(self))]
    pub fn clear_cart(&self) {
        let mut inner = self.lock();
        inner.state = CartState::default();
        inner.promo_generation += 1;

        self.persist_items(&inner.state);
        self.persist_promo(&inner.state);
        debug!("cart cleared");
    }

    /// Validate `code` remotely and make it the active promo.
    ///
    /// `customer` is the signed-in user, if any. Signed-in customers go
    /// through the server-side usage check; guests are handled per the
    /// store's [`GuestPromoPolicy`]. On any failure the cart is unchanged.
    ///
    /// # Errors
    ///
    /// See [`PromoError`]. [`PromoError::Superseded`] means the cart was
    /// cleared, the promo removed, or another code applied while this call
    /// was waiting on the network.
    #[instrument(skip(self, customer), fields(signed_in = customer.is_some()))]
    pub async fn apply_promo_code(
        &self,
        code: &str,
        customer: Option<&UserId>,
    ) -> Result<AppliedPromo, PromoError> {
        let code = PromoCodeText::parse(code)?;
        if customer.is_none() && self.guest_policy == GuestPromoPolicy::Deny {
            return Err(PromoError::GuestNotAllowed(code));
        }

        let generation = {
            let mut inner = self.lock();
            inner.promo_generation += 1;
            inner.promo_generation
        };

        if let Some(user_id) = customer {
            if !self.authority.can_use_code(&code, user_id).await? {
                info!(code = %code, "promo code refused for customer");
                return Err(PromoError::UsageLimitExceeded(code));
            }
        } else {
            debug!("guest customer, skipping usage check");
        }

        let Some(promo) = self.authority.lookup_active_code(&code).await? else {
            return Err(PromoError::NotFound(code));
        };

        let mut inner = self.lock();
        if inner.promo_generation != generation {
            debug!(code = %code, "discarding stale promo validation");
            return Err(PromoError::Superseded(code));
        }

        info!(
            code = %promo.code,
            discount = %promo.discount_percentage,
            "promo code applied"
        );
        inner.state.active_promo = Some(promo.clone());
        self.persist_promo(&inner.state);

        Ok(promo)
    }

    /// Drop the active promo, if any.
    ///
    /// Any promo validation still in flight is discarded when it returns.
    #[instrument(skip(self))]
    pub fn remove_promo_code(&self) {
        let mut inner = self.lock();
        inner.promo_generation += 1;

        if let Some(promo) = inner.state.active_promo.take() {
            info!(code = %promo.code, "promo code removed");
        }
        self.persist_promo(&inner.state);
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Snapshot of the whole cart.
    #[must_use]
    pub fn snapshot(&self) -> CartState {
        self.lock().state.clone()
    }

    /// Snapshot of the lines, in insertion order.
    #[must_use]
    pub fn items(&self) -> Vec<CartItem> {
        self.lock().state.items.clone()
    }

    /// The applied promo, if any.
    #[must_use]
    pub fn active_promo(&self) -> Option<AppliedPromo> {
        self.lock().state.active_promo.clone()
    }

    /// Whether the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().state.items.is_empty()
    }

    /// Sum of quantities.
    #[must_use]
    pub fn total_items(&self) -> u64 {
        pricing::total_items(&self.lock().state)
    }

    /// Subtotal, discount and total.
    #[must_use]
    pub fn totals(&self) -> CartTotals {
        pricing::totals(&self.lock().state)
    }

    // =========================================================================
    // Persistence
    // =========================================================================

    fn persist_items(&self, state: &CartState) {
        self.write(keys::CART, serde_json::to_string(&state.items));
    }

    fn persist_promo(&self, state: &CartState) {
        if state.active_promo.is_some() {
            self.write(keys::PROMO_CODE, serde_json::to_string(&state.active_promo));
        } else if let Err(e) = self.storage.remove(keys::PROMO_CODE) {
            warn!(key = keys::PROMO_CODE, error = %e, "failed to persist cart");
        }
    }

    fn write(&self, key: &str, value: Result<String, serde_json::Error>) {
        let result: Result<(), StorageError> = value
            .map_err(StorageError::from)
            .and_then(|json| self.storage.set(key, &json));

        if let Err(e) = result {
            warn!(key, error = %e, "failed to persist cart");
        }
    }
}

fn load_state(storage: &dyn CartStorage) -> CartState {
    let stored: Vec<CartItem> = load_key(storage, keys::CART).unwrap_or_default();
    let items = stored
        .into_iter()
        .filter_map(|line| {
            let (id, price) = (line.id.clone(), line.unit_price);
            let kept = line.sanitized();
            if kept.is_none() {
                warn!(id = %id, price = %price, "dropping persisted line with invalid price");
            }
            kept
        })
        .collect();

    CartState {
        items,
        active_promo: load_key(storage, keys::PROMO_CODE).flatten(),
    }
}

fn load_key<T: serde::de::DeserializeOwned>(storage: &dyn CartStorage, key: &str) -> Option<T> {
    let raw = match storage.get(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => return None,
        Err(e) => {
            warn!(key, error = %e, "failed to read persisted cart, starting empty");
            return None;
        }
    };

    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(key, error = %e, "discarding corrupt persisted cart data");
            None
        }
    }
}
