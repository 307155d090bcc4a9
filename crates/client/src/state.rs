//! Top-level wiring for the storefront client.
//!
//! [`StoreContext`] owns one instance of each engine and orchestrates the
//! cross-engine flows: login (migrate guest state, then refresh), logout
//! (clear everything in memory), and the wishlist-to-cart move that spans
//! both engines.

use std::sync::Arc;

use tracing::{info, instrument, warn};

use juniper_core::ProductId;

use crate::api::ApiClient;
use crate::cart::CartStore;
use crate::config::ClientConfig;
use crate::error::StoreError;
use crate::profile::ProfileService;
use crate::session::SessionManager;
use crate::storage::LocalStore;
use crate::wishlist::WishlistStore;

/// The assembled storefront client.
///
/// Cheaply cloneable; all clones share the same engines.
#[derive(Clone)]
pub struct StoreContext {
    inner: Arc<StoreContextInner>,
}

struct StoreContextInner {
    config: ClientConfig,
    session: SessionManager,
    cart: CartStore,
    wishlist: WishlistStore,
    profile: ProfileService,
}

impl StoreContext {
    /// Assemble the client from configuration.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the data directory or HTTP client cannot be
    /// set up.
    pub fn new(config: ClientConfig) -> Result<Self, StoreError> {
        let storage = LocalStore::open(&config.data_dir)?;
        let session = SessionManager::new(storage.clone());
        let api = ApiClient::new(&config, session.clone())?;
        let cart = CartStore::new(api.clone(), storage.clone(), session.clone());
        let wishlist = WishlistStore::new(api.clone(), storage.clone(), session.clone());
        let profile = ProfileService::new(api, storage, session.clone());

        Ok(Self {
            inner: Arc::new(StoreContextInner {
                config,
                session,
                cart,
                wishlist,
                profile,
            }),
        })
    }

    /// Assemble the client from environment variables and, if the session
    /// is authenticated, pull fresh server state.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Validation` for configuration problems, or
    /// another `StoreError` on setup failure.
    pub async fn from_env() -> Result<Self, StoreError> {
        let config = ClientConfig::from_env()
            .map_err(|e| StoreError::Validation(e.to_string()))?;
        let context = Self::new(config)?;
        if context.session().is_authenticated() {
            context.refresh_all().await;
        }
        Ok(context)
    }

    /// The active configuration.
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// Session state.
    #[must_use]
    pub fn session(&self) -> &SessionManager {
        &self.inner.session
    }

    /// The cart engine.
    #[must_use]
    pub fn cart(&self) -> &CartStore {
        &self.inner.cart
    }

    /// The wishlist engine.
    #[must_use]
    pub fn wishlist(&self) -> &WishlistStore {
        &self.inner.wishlist
    }

    /// The profile service.
    #[must_use]
    pub fn profile(&self) -> &ProfileService {
        &self.inner.profile
    }

    /// Complete a login with a freshly issued session token.
    ///
    /// Stores the credential, migrates any guest cart and wishlist into
    /// the account, and pulls fresh server state. Migration failures are
    /// logged and swallowed: a failed merge must not fail the login, and
    /// the guest snapshots stay on disk for a later retry.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Storage` if the token cannot be persisted.
    #[instrument(skip(self, token))]
    pub async fn login(&self, token: &str) -> Result<(), StoreError> {
        self.inner.session.set_token(token)?;
        info!("logged in, migrating guest state");

        if let Err(e) = self.inner.cart.transfer_guest_cart().await {
            warn!(error = %e, "guest cart migration failed");
        }
        if let Err(e) = self.inner.wishlist.transfer_guest_wishlist().await {
            warn!(error = %e, "guest wishlist migration failed");
        }
        self.refresh_all().await;
        Ok(())
    }

    /// Log out: clear the credential, cached profile, and all in-memory
    /// engine state. Guest snapshots on disk are left untouched.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Storage` on filesystem failure.
    #[instrument(skip(self))]
    pub async fn logout(&self) -> Result<(), StoreError> {
        self.inner.session.clear()?;
        self.inner.profile.clear_cache().await;
        self.inner.cart.reset().await;
        self.inner.wishlist.reset().await;
        info!("logged out");
        Ok(())
    }

    /// Move a wishlist entry into the cart, updating both engines from the
    /// server's atomic response.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Business` for guests, or another `StoreError`
    /// on remote failure.
    #[instrument(skip(self), fields(product_id = %product_id, size, quantity))]
    pub async fn move_wishlist_item_to_cart(
        &self,
        product_id: &ProductId,
        size: Option<&str>,
        quantity: u32,
    ) -> Result<(), StoreError> {
        let cart = self
            .inner
            .wishlist
            .move_to_cart(product_id, size, quantity)
            .await?;
        self.inner.cart.apply_server_cart(cart).await;
        Ok(())
    }

    /// Start the background profile refresh loop using the configured
    /// interval.
    pub fn spawn_profile_refresh(&self) -> tokio::task::JoinHandle<()> {
        self.inner
            .profile
            .spawn_refresh(self.inner.config.profile_refresh_interval)
    }

    /// Best-effort refresh of cart, wishlist, and profile. Failures are
    /// logged; anything that did succeed stays applied.
    async fn refresh_all(&self) {
        if let Err(e) = self.inner.cart.refresh().await {
            warn!(error = %e, "cart refresh failed");
        }
        if let Err(e) = self.inner.wishlist.refresh().await {
            warn!(error = %e, "wishlist refresh failed");
        }
        if self.inner.session.is_authenticated() {
            if let Err(e) = self.inner.profile.fetch_profile().await {
                warn!(error = %e, "profile fetch failed");
            }
        }
    }
}

impl std::fmt::Debug for StoreContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreContext")
            .field("authenticated", &self.inner.session.is_authenticated())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn context(dir: &tempfile::TempDir) -> StoreContext {
        let config = ClientConfig::new("http://127.0.0.1:9", dir.path()).unwrap();
        StoreContext::new(config).unwrap()
    }

    #[tokio::test]
    async fn test_context_starts_anonymous() {
        let dir = tempfile::tempdir().unwrap();
        let context = context(&dir);
        assert!(!context.session().is_authenticated());
        assert!(context.cart().snapshot().await.lines.is_empty());
        assert!(context.wishlist().snapshot().await.entries.is_empty());
    }

    #[tokio::test]
    async fn test_guest_move_to_cart_rejected_via_context() {
        let dir = tempfile::tempdir().unwrap();
        let context = context(&dir);
        let result = context
            .move_wishlist_item_to_cart(&ProductId::new("p1"), None, 1)
            .await;
        assert!(matches!(result, Err(StoreError::Business(_))));
    }

    #[tokio::test]
    async fn test_logout_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let context = context(&dir);
        context.logout().await.unwrap();
        context.logout().await.unwrap();
        assert!(!context.session().is_authenticated());
    }
}
