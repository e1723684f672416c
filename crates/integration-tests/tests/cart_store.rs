//! Integration tests for the cart store.
//!
//! These drive `CartStore` through its public API with in-memory storage and
//! a fake promo authority.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use std::sync::Arc;

use barshop_core::{ProductId, Variant};
use barshop_integration_tests::{FakePromoAuthority, Gate, bar, customer, open_store};
use barshop_storefront::cart::CartStore;
use barshop_storefront::promo::{GuestPromoPolicy, PromoError};
use barshop_storefront::storage::{CartStorage, keys};
use rust_decimal::Decimal;

fn promos() -> Arc<FakePromoAuthority> {
    Arc::new(
        FakePromoAuthority::new()
            .with_code("SAVE10", 10)
            .with_code("HALF", 50)
            .exhausted("ONCE")
            .with_code("ONCE", 25),
    )
}

fn variant(s: &str) -> Variant {
    Variant::parse(s).unwrap()
}

// =============================================================================
// Line Management Tests
// =============================================================================

#[test]
fn test_repeated_adds_merge_up_to_stock() {
    let (store, _) = open_store(promos(), GuestPromoPolicy::Deny);

    for quantity in [2, 3, 4] {
        store.add_item(bar("A", "15g", 100, 7), quantity);
    }

    let items = store.items();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].quantity, 7);
}

#[test]
fn test_same_product_different_variant_is_separate_line() {
    let (store, _) = open_store(promos(), GuestPromoPolicy::Deny);

    store.add_item(bar("A", "15g", 100, 5), 1);
    store.add_item(bar("A", "20g", 130, 5), 1);
    store.add_item(bar("A", "15g", 100, 5), 1);

    let items = store.items();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].variant, variant("15g"));
    assert_eq!(items[0].quantity, 2);
    assert_eq!(items[1].variant, variant("20g"));
    assert_eq!(items[1].quantity, 1);
}

#[test]
fn test_update_quantity_clamps_into_stock_range() {
    let (store, _) = open_store(promos(), GuestPromoPolicy::Deny);
    let id = ProductId::new("A");
    store.add_item(bar("A", "15g", 100, 4), 2);

    for (requested, expected) in [(0, 1), (-5, 1), (3, 3), (4, 4), (99, 4), (i64::MIN, 1)] {
        store.update_quantity(&id, &variant("15g"), requested);
        assert_eq!(store.items()[0].quantity, expected, "requested {requested}");
    }
}

#[test]
fn test_remove_missing_line_is_noop() {
    let (store, _) = open_store(promos(), GuestPromoPolicy::Deny);
    store.add_item(bar("A", "15g", 100, 4), 2);
    let before = store.snapshot();

    store.remove_item(&ProductId::new("A"), &variant("20g"));
    store.remove_item(&ProductId::new("B"), &variant("15g"));

    assert_eq!(store.snapshot(), before);
}

#[test]
fn test_remove_only_targets_matching_variant() {
    let (store, _) = open_store(promos(), GuestPromoPolicy::Deny);
    store.add_item(bar("A", "15g", 100, 4), 1);
    store.add_item(bar("A", "20g", 130, 4), 1);

    store.remove_item(&ProductId::new("A"), &variant("15g"));

    let items = store.items();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].variant, variant("20g"));
}

#[test]
fn test_overflow_add_on_fresh_line_caps_at_stock() {
    let (store, _) = open_store(promos(), GuestPromoPolicy::Deny);

    store.add_item(bar("A", "15g", 100, 3), 10);

    assert_eq!(store.items()[0].quantity, 3);
}

#[test]
fn test_basic_cart_scenario() {
    let (store, _) = open_store(promos(), GuestPromoPolicy::Deny);

    store.add_item(bar("A", "15g", 100, 5), 1);
    store.add_item(bar("A", "15g", 100, 5), 1);

    assert_eq!(store.items().len(), 1);
    assert_eq!(store.total_items(), 2);
    assert_eq!(store.totals().subtotal, Decimal::from(200));
    assert_eq!(store.totals().total, Decimal::from(200));
}

// =============================================================================
// Promo Code Tests
// =============================================================================

#[tokio::test]
async fn test_promo_applied_scenario() {
    let (store, _) = open_store(promos(), GuestPromoPolicy::Deny);
    store.add_item(bar("A", "15g", 100, 5), 2);

    let promo = store
        .apply_promo_code("save10", Some(&customer()))
        .await
        .unwrap();

    assert_eq!(promo.code.as_str(), "SAVE10");
    let totals = store.totals();
    assert_eq!(totals.subtotal, Decimal::from(200));
    assert_eq!(totals.discount_amount, Decimal::from(20));
    assert_eq!(totals.total, Decimal::from(180));
}

#[tokio::test]
async fn test_total_derivation_with_fractional_discount() {
    let (store, _) = open_store(promos(), GuestPromoPolicy::Deny);
    store.add_item(bar("A", "15g", 33, 5), 1);
    store.add_item(bar("B", "15g", 67, 5), 2);

    store
        .apply_promo_code("SAVE10", Some(&customer()))
        .await
        .unwrap();

    let totals = store.totals();
    assert_eq!(totals.subtotal, Decimal::from(167));
    assert_eq!(totals.discount_amount, Decimal::new(167, 1));
    assert_eq!(totals.total, totals.subtotal - totals.discount_amount);
}

#[tokio::test]
async fn test_unknown_code_keeps_previous_promo() {
    let authority = promos();
    let (store, _) = open_store(authority.clone(), GuestPromoPolicy::Deny);
    store.add_item(bar("A", "15g", 100, 5), 2);
    store
        .apply_promo_code("HALF", Some(&customer()))
        .await
        .unwrap();

    let err = store
        .apply_promo_code("BADCODE", Some(&customer()))
        .await
        .unwrap_err();

    assert!(matches!(err, PromoError::NotFound(_)));
    assert_eq!(err.user_message(), "Invalid promo code");
    assert_eq!(store.active_promo().unwrap().code.as_str(), "HALF");
    assert_eq!(store.totals().total, Decimal::from(100));
}

#[tokio::test]
async fn test_exhausted_code_is_refused_before_lookup() {
    let authority = promos();
    let (store, _) = open_store(authority.clone(), GuestPromoPolicy::Deny);

    let err = store
        .apply_promo_code("once", Some(&customer()))
        .await
        .unwrap_err();

    assert!(matches!(err, PromoError::UsageLimitExceeded(_)));
    assert_eq!(
        err.user_message(),
        "Invalid promo code or usage limit exceeded"
    );
    assert_eq!(authority.usage_checks(), 1);
    assert_eq!(authority.lookups(), 0);
    assert!(store.active_promo().is_none());
}

#[tokio::test]
async fn test_blank_code_never_reaches_backend() {
    let authority = promos();
    let (store, _) = open_store(authority.clone(), GuestPromoPolicy::Allow);

    let err = store.apply_promo_code("   ", None).await.unwrap_err();

    assert!(matches!(err, PromoError::InvalidCode(_)));
    assert_eq!(authority.lookups(), 0);
}

#[tokio::test]
async fn test_guest_denied_by_default() {
    let authority = promos();
    let (store, _) = open_store(authority.clone(), GuestPromoPolicy::default());

    let err = store.apply_promo_code("SAVE10", None).await.unwrap_err();

    assert!(matches!(err, PromoError::GuestNotAllowed(_)));
    assert_eq!(authority.lookups(), 0);
    assert!(store.active_promo().is_none());
}

#[tokio::test]
async fn test_guest_allowed_skips_usage_check() {
    let authority = promos();
    let (store, _) = open_store(authority.clone(), GuestPromoPolicy::Allow);

    let promo = store.apply_promo_code("ONCE", None).await.unwrap();

    assert_eq!(promo.code.as_str(), "ONCE");
    assert_eq!(authority.usage_checks(), 0);
}

#[tokio::test]
async fn test_remote_failure_leaves_cart_untouched() {
    let authority = Arc::new(FakePromoAuthority::new().with_code("SAVE10", 10).unreachable());
    let (store, _) = open_store(authority, GuestPromoPolicy::Deny);
    store.add_item(bar("A", "15g", 100, 5), 1);
    let before = store.snapshot();

    let err = store
        .apply_promo_code("SAVE10", Some(&customer()))
        .await
        .unwrap_err();

    assert!(matches!(err, PromoError::Remote(_)));
    assert_eq!(err.user_message(), "Failed to apply promo code");
    assert_eq!(store.snapshot(), before);
}

#[tokio::test]
async fn test_remove_promo_restores_full_total() {
    let (store, _) = open_store(promos(), GuestPromoPolicy::Deny);
    store.add_item(bar("A", "15g", 100, 5), 2);
    store
        .apply_promo_code("SAVE10", Some(&customer()))
        .await
        .unwrap();

    store.remove_promo_code();

    assert!(store.active_promo().is_none());
    assert_eq!(store.totals().total, Decimal::from(200));
}

// =============================================================================
// Concurrency Tests
// =============================================================================

#[tokio::test]
async fn test_validation_finishing_after_clear_is_discarded() {
    let gate = Arc::new(Gate::default());
    let authority = Arc::new(
        FakePromoAuthority::new()
            .with_code("SAVE10", 10)
            .gated("SAVE10", gate.clone()),
    );
    let (store, storage) = open_store(authority, GuestPromoPolicy::Deny);
    store.add_item(bar("A", "15g", 100, 5), 2);
    let user = customer();

    let (applied, ()) = tokio::join!(store.apply_promo_code("SAVE10", Some(&user)), async {
        gate.entered().await;
        store.clear_cart();
        gate.release();
    });

    assert!(matches!(applied, Err(PromoError::Superseded(_))));
    assert!(store.is_empty());
    assert!(store.active_promo().is_none());
    assert_eq!(storage.get(keys::PROMO_CODE).unwrap(), None);
}

#[tokio::test]
async fn test_validation_finishing_after_remove_is_discarded() {
    let gate = Arc::new(Gate::default());
    let authority = Arc::new(
        FakePromoAuthority::new()
            .with_code("SAVE10", 10)
            .gated("SAVE10", gate.clone()),
    );
    let (store, _) = open_store(authority, GuestPromoPolicy::Allow);

    let (applied, ()) = tokio::join!(store.apply_promo_code("SAVE10", None), async {
        gate.entered().await;
        store.remove_promo_code();
        gate.release();
    });

    assert!(matches!(applied, Err(PromoError::Superseded(_))));
    assert!(store.active_promo().is_none());
}

#[tokio::test]
async fn test_cart_edits_during_validation_keep_promo() {
    let gate = Arc::new(Gate::default());
    let authority = Arc::new(
        FakePromoAuthority::new()
            .with_code("SAVE10", 10)
            .gated("SAVE10", gate.clone()),
    );
    let (store, _) = open_store(authority, GuestPromoPolicy::Allow);

    let (applied, ()) = tokio::join!(store.apply_promo_code("SAVE10", None), async {
        gate.entered().await;
        store.add_item(bar("A", "15g", 100, 5), 1);
        gate.release();
    });

    assert_eq!(applied.unwrap().code.as_str(), "SAVE10");
    assert_eq!(store.totals().total, Decimal::from(90));
}

#[tokio::test]
async fn test_newer_apply_supersedes_one_in_flight() {
    let gate = Arc::new(Gate::default());
    let authority = Arc::new(
        FakePromoAuthority::new()
            .with_code("SAVE10", 10)
            .with_code("HALF", 50)
            .gated("SAVE10", gate.clone()),
    );
    let (store, _) = open_store(authority, GuestPromoPolicy::Deny);
    store.add_item(bar("A", "15g", 100, 5), 2);
    let user = customer();

    let (older, newer) = tokio::join!(store.apply_promo_code("SAVE10", Some(&user)), async {
        gate.entered().await;
        let newer = store.apply_promo_code("HALF", Some(&user)).await;
        gate.release();
        newer
    });

    assert!(matches!(older, Err(PromoError::Superseded(_))));
    assert_eq!(newer.unwrap().code.as_str(), "HALF");
    assert_eq!(store.active_promo().unwrap().code.as_str(), "HALF");
    assert_eq!(store.totals().total, Decimal::from(100));
}

#[tokio::test]
async fn test_rejected_newer_apply_still_supersedes_one_in_flight() {
    let gate = Arc::new(Gate::default());
    let authority = Arc::new(
        FakePromoAuthority::new()
            .with_code("SAVE10", 10)
            .gated("SAVE10", gate.clone()),
    );
    let (store, _) = open_store(authority, GuestPromoPolicy::Deny);
    store.add_item(bar("A", "15g", 100, 5), 2);
    let user = customer();

    let (older, newer) = tokio::join!(store.apply_promo_code("SAVE10", Some(&user)), async {
        gate.entered().await;
        let newer = store.apply_promo_code("BADCODE", Some(&user)).await;
        gate.release();
        newer
    });

    assert!(matches!(older, Err(PromoError::Superseded(_))));
    assert!(matches!(newer, Err(PromoError::NotFound(_))));
    assert!(store.active_promo().is_none());
    assert_eq!(store.totals().total, Decimal::from(200));
}

// =============================================================================
// Clear & Persistence Tests
// =============================================================================

#[tokio::test]
async fn test_clear_resets_items_and_promo() {
    let (store, storage) = open_store(promos(), GuestPromoPolicy::Deny);
    store.add_item(bar("A", "15g", 100, 5), 2);
    store.add_item(bar("B", "20g", 150, 5), 1);
    store
        .apply_promo_code("SAVE10", Some(&customer()))
        .await
        .unwrap();

    store.clear_cart();

    assert!(store.items().is_empty());
    assert!(store.active_promo().is_none());
    assert_eq!(store.totals().total, Decimal::ZERO);

    let reopened = CartStore::open(storage, promos(), GuestPromoPolicy::Deny);
    assert!(reopened.is_empty());
    assert!(reopened.active_promo().is_none());
}

#[tokio::test]
async fn test_state_survives_reopen() {
    let (store, storage) = open_store(promos(), GuestPromoPolicy::Deny);
    store.add_item(bar("A", "15g", 100, 5), 2);
    store.add_item(
        bar("B", "20g", 150, 3).with_image("https://cdn.example/b.png"),
        1,
    );
    store
        .apply_promo_code("HALF", Some(&customer()))
        .await
        .unwrap();

    let reopened = CartStore::open(storage, promos(), GuestPromoPolicy::Deny);

    assert_eq!(reopened.snapshot(), store.snapshot());
    assert_eq!(reopened.totals(), store.totals());
}

#[test]
fn test_corrupt_storage_opens_empty() {
    let (_, storage) = open_store(promos(), GuestPromoPolicy::Deny);
    storage.set(keys::CART, "{not json").unwrap();
    storage.set(keys::PROMO_CODE, "[1, 2]").unwrap();

    let store = CartStore::open(storage, promos(), GuestPromoPolicy::Deny);

    assert!(store.is_empty());
    assert!(store.active_promo().is_none());
}

#[test]
fn test_out_of_range_persisted_lines_are_repaired() {
    let (_, storage) = open_store(promos(), GuestPromoPolicy::Deny);
    let cart = serde_json::json!([
        { "id": "neg", "name": "Refund", "price": -50, "quantity": 0, "stock": 3 },
        { "id": "big", "name": "Gold Bar", "price": "79228162514264337593543950335", "quantity": 2, "stock": 3 },
        { "id": "over", "name": "Choco Bar", "price": 10, "quantity": 9, "stock": 2 }
    ]);
    storage.set(keys::CART, &cart.to_string()).unwrap();

    let store = CartStore::open(storage, promos(), GuestPromoPolicy::Deny);

    let items = store.items();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].id, ProductId::new("over"));
    assert_eq!(items[0].quantity, 2);
    assert_eq!(store.total_items(), 2);
    assert_eq!(store.totals().total, Decimal::from(20));
}

#[test]
fn test_reads_browser_layout() {
    let (_, storage) = open_store(promos(), GuestPromoPolicy::Deny);
    let cart = serde_json::json!([
        {
            "id": "bar-1",
            "name": "Peanut Crunch",
            "price": 120,
            "quantity": 2,
            "stock": 10,
            "protein": "20g"
        }
    ]);
    let promo = serde_json::json!({ "code": "save10", "discount_percentage": 10 });
    storage.set(keys::CART, &cart.to_string()).unwrap();
    storage.set(keys::PROMO_CODE, &promo.to_string()).unwrap();

    let store = CartStore::open(storage, promos(), GuestPromoPolicy::Deny);

    let items = store.items();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].variant, variant("20g"));
    assert_eq!(store.active_promo().unwrap().code.as_str(), "SAVE10");
    assert_eq!(store.totals().total, Decimal::from(216));
}
