//! Juniper Atelier storefront client library.
//!
//! This crate is the state-owning core of the storefront UI: it keeps the
//! cart and wishlist consistent with the remote store, persists guest state
//! locally, and migrates guest data to the user's account at login.
//!
//! # Architecture
//!
//! - The server is the source of truth while a user is authenticated: every
//!   successful remote mutation returns the full updated entity, which
//!   replaces in-memory state wholesale (never patched locally).
//! - Guest state lives only in the local JSON store and is merged into the
//!   user's server-side cart/wishlist exactly once at login.
//!
//! # Example
//!
//! ```rust,ignore
//! use juniper_client::{ClientConfig, StoreContext};
//!
//! let config = ClientConfig::from_env()?;
//! let store = StoreContext::new(config)?;
//!
//! // Guest adds an item; it is persisted locally
//! store.cart().add_item(line).await?;
//!
//! // Login migrates the guest cart and wishlist to the account
//! store.login("session-token").await;
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod cart;
pub mod config;
pub mod error;
pub mod profile;
pub mod session;
pub mod state;
pub mod storage;
pub mod types;
pub mod wishlist;

pub use api::ApiClient;
pub use cart::{CartSnapshot, CartStore};
pub use config::ClientConfig;
pub use error::StoreError;
pub use profile::ProfileService;
pub use session::SessionManager;
pub use state::StoreContext;
pub use storage::LocalStore;
pub use wishlist::{WishlistSnapshot, WishlistStore};
