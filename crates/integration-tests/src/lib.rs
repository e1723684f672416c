//! Integration tests for Barshop.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p barshop-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `cart_store` - Cart mutations, pricing, promo codes and persistence
//! - `checkout` - Order placement against a recording gateway
//!
//! No backend is needed: this crate provides in-process stand-ins for the
//! promo authority and order gateway.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use barshop_core::{DiscountPercentage, OrderId, ProductId, PromoCodeText, UserId, Variant};
use barshop_storefront::cart::{CartStore, NewCartItem};
use barshop_storefront::checkout::{OrderDraft, OrderGateway, OrderOutcome};
use barshop_storefront::promo::{AppliedPromo, GuestPromoPolicy, PromoAuthority};
use barshop_storefront::storage::MemoryStorage;
use barshop_storefront::supabase::SupabaseError;
use rust_decimal::Decimal;
use tokio::sync::Notify;

// =============================================================================
// Fixtures
// =============================================================================

/// A bar in the given variant.
///
/// # Panics
///
/// Panics if `price` is outside the cart's accepted range.
#[must_use]
#[allow(clippy::unwrap_used)]
pub fn bar(id: &str, variant: &str, price: i64, stock: u32) -> NewCartItem {
    let variant = Variant::parse(variant).unwrap_or_default();
    NewCartItem::new(ProductId::new(id), format!("Bar {id}"), Decimal::from(price), stock)
        .unwrap()
        .with_variant(variant)
}

/// A fresh store over in-memory storage. The storage is returned so tests
/// can reopen it.
#[must_use]
pub fn open_store(
    authority: Arc<FakePromoAuthority>,
    policy: GuestPromoPolicy,
) -> (CartStore, Arc<MemoryStorage>) {
    let storage = Arc::new(MemoryStorage::new());
    let store = CartStore::open(storage.clone(), authority, policy);
    (store, storage)
}

#[must_use]
pub fn customer() -> UserId {
    UserId::new("6f1c2f8e-user")
}

// =============================================================================
// FakePromoAuthority
// =============================================================================

/// Holds a `lookup_active_code` call until released.
#[derive(Debug, Default)]
pub struct Gate {
    entered: Notify,
    release: Notify,
}

impl Gate {
    /// Wait until a lookup is parked at the gate.
    pub async fn entered(&self) {
        self.entered.notified().await;
    }

    /// Let the parked lookup continue.
    pub fn release(&self) {
        self.release.notify_one();
    }
}

/// Promo authority backed by a fixed table of codes.
#[derive(Debug, Default)]
pub struct FakePromoAuthority {
    codes: HashMap<String, Decimal>,
    exhausted: HashSet<String>,
    unreachable: bool,
    gate: Option<(String, Arc<Gate>)>,
    usage_checks: AtomicUsize,
    lookups: AtomicUsize,
}

impl FakePromoAuthority {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `code` active with `percentage` off.
    #[must_use]
    pub fn with_code(mut self, code: &str, percentage: i64) -> Self {
        self.codes.insert(code.to_string(), Decimal::from(percentage));
        self
    }

    /// Refuse `code` in the usage check, as if its limit were reached.
    #[must_use]
    pub fn exhausted(mut self, code: &str) -> Self {
        self.exhausted.insert(code.to_string());
        self
    }

    /// Fail every call with a network-level error.
    #[must_use]
    pub const fn unreachable(mut self) -> Self {
        self.unreachable = true;
        self
    }

    /// Park lookups of `code` at `gate`. Other codes pass straight through.
    #[must_use]
    pub fn gated(mut self, code: &str, gate: Arc<Gate>) -> Self {
        self.gate = Some((code.to_string(), gate));
        self
    }

    pub fn usage_checks(&self) -> usize {
        self.usage_checks.load(Ordering::SeqCst)
    }

    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PromoAuthority for FakePromoAuthority {
    async fn can_use_code(
        &self,
        code: &PromoCodeText,
        _user_id: &UserId,
    ) -> Result<bool, SupabaseError> {
        self.usage_checks.fetch_add(1, Ordering::SeqCst);
        if self.unreachable {
            return Err(SupabaseError::RateLimited(30));
        }
        Ok(!self.exhausted.contains(code.as_str()))
    }

    async fn lookup_active_code(
        &self,
        code: &PromoCodeText,
    ) -> Result<Option<AppliedPromo>, SupabaseError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if let Some((gated_code, gate)) = &self.gate
            && gated_code == code.as_str()
        {
            gate.entered.notify_one();
            gate.release.notified().await;
        }
        if self.unreachable {
            return Err(SupabaseError::RateLimited(30));
        }

        self.codes
            .get(code.as_str())
            .map(|pct| {
                let discount_percentage = DiscountPercentage::new(*pct)
                    .map_err(|e| SupabaseError::InvalidRow(e.to_string()))?;
                Ok(AppliedPromo {
                    code: code.clone(),
                    discount_percentage,
                })
            })
            .transpose()
    }
}

// =============================================================================
// RecordingGateway
// =============================================================================

/// A promo redemption seen by [`RecordingGateway`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsageRecord {
    pub code: PromoCodeText,
    pub order_id: OrderId,
    pub user_id: UserId,
}

/// Order gateway that answers with a fixed outcome and records its calls.
#[derive(Debug)]
pub struct RecordingGateway {
    outcome: OrderOutcome,
    usage_fails: bool,
    drafts: Mutex<Vec<OrderDraft>>,
    usages: Mutex<Vec<UsageRecord>>,
}

impl RecordingGateway {
    /// Accept every order as `order_id`.
    #[must_use]
    pub fn accepting(order_id: &str) -> Self {
        Self::with_outcome(OrderOutcome {
            success: true,
            order_id: Some(OrderId::new(order_id)),
            error_message: None,
        })
    }

    /// Reject every order with `message`.
    #[must_use]
    pub fn rejecting(message: &str) -> Self {
        Self::with_outcome(OrderOutcome {
            success: false,
            order_id: None,
            error_message: Some(message.to_string()),
        })
    }

    fn with_outcome(outcome: OrderOutcome) -> Self {
        Self {
            outcome,
            usage_fails: false,
            drafts: Mutex::new(Vec::new()),
            usages: Mutex::new(Vec::new()),
        }
    }

    /// Fail every promo usage insert.
    #[must_use]
    pub const fn failing_usage(mut self) -> Self {
        self.usage_fails = true;
        self
    }

    pub fn drafts(&self) -> Vec<OrderDraft> {
        self.drafts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn usages(&self) -> Vec<UsageRecord> {
        self.usages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl OrderGateway for RecordingGateway {
    async fn create_order(&self, draft: &OrderDraft) -> Result<OrderOutcome, SupabaseError> {
        self.drafts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(draft.clone());
        Ok(self.outcome.clone())
    }

    async fn record_promo_usage(
        &self,
        code: &PromoCodeText,
        order_id: &OrderId,
        user_id: &UserId,
    ) -> Result<(), SupabaseError> {
        if self.usage_fails {
            return Err(SupabaseError::NotFound(format!("promo code {code}")));
        }
        self.usages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(UsageRecord {
                code: code.clone(),
                order_id: order_id.clone(),
                user_id: user_id.clone(),
            });
        Ok(())
    }
}
