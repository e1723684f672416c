//! Barshop Storefront library.
//!
//! Client-side shopping cart for the Barshop storefront: line items with a
//! single applied promo code, derived totals, durable local persistence,
//! promo validation against Supabase and order placement.
//!
//! # Architecture
//!
//! - [`cart::CartStore`] owns the cart state and is the only thing that mutates it
//! - [`storage`] persists the cart under two string keys
//! - [`promo::PromoAuthority`] is the remote source of truth for promo codes
//! - [`checkout::Checkout`] turns a cart into an order via [`checkout::OrderGateway`]
//! - [`supabase::SupabaseClient`] implements both remote traits over `PostgREST`
//!
//! Stores are constructed explicitly and passed by reference; there is no
//! global cart.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod checkout;
pub mod config;
pub mod error;
pub mod promo;
pub mod storage;
pub mod supabase;
