//! Barshop Core - Shared domain types.
//!
//! This crate provides the types used across all Barshop components:
//! - `storefront` - Cart store, promo validation, checkout
//! - `cli` - Terminal front end for a persisted cart
//!
//! # Architecture
//!
//! The core crate contains only types and parsing - no I/O, no HTTP clients,
//! no storage. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for ids, variants, promo codes, discounts and prices

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
