//! Juniper Core - Shared types library.
//!
//! This crate provides common types used across the Juniper Atelier client
//! components:
//! - `client` - Storefront client library (cart, wishlist, session, profile)
//! - `integration-tests` - End-to-end tests against a scripted API server
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no HTTP clients, no storage
//! access. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, prices, and emails

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
