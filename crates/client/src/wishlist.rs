//! Wishlist synchronization engine.
//!
//! Same shape as the cart engine: one canonical in-process wishlist, mode
//! split hidden behind the API, wholesale replacement from server
//! responses. The differences are in semantics: adding a duplicate entry
//! is a business error rather than a merge, and moving an entry to the
//! cart is an authenticated-only operation.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::Utc;
use tokio::sync::{Mutex, watch};
use tracing::{debug, instrument, warn};

use juniper_core::ProductId;

use crate::api::ApiClient;
use crate::error::StoreError;
use crate::session::SessionManager;
use crate::storage::{LocalStore, keys};
use crate::types::{Cart, DEFAULT_SIZE, ProductSnapshot, WishlistEntry};

/// A point-in-time view of the wishlist.
#[derive(Debug, Clone, Default)]
pub struct WishlistSnapshot {
    /// Wishlist entries, unique by `(product_id, size)`.
    pub entries: Vec<WishlistEntry>,
}

/// Wishlist synchronization engine.
///
/// Cheaply cloneable; all clones share one state cell.
#[derive(Clone)]
pub struct WishlistStore {
    inner: Arc<WishlistStoreInner>,
}

struct WishlistStoreInner {
    api: ApiClient,
    storage: LocalStore,
    session: SessionManager,
    entries: Mutex<Vec<WishlistEntry>>,
    busy: AtomicBool,
    migrated: AtomicBool,
    /// Whether the current entries came from the server for an
    /// authenticated session. Such state must not survive the session
    /// ending.
    server_synced: AtomicBool,
    tx: watch::Sender<WishlistSnapshot>,
}

struct BusyGuard<'a>(&'a AtomicBool);

impl<'a> BusyGuard<'a> {
    fn set(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::SeqCst);
        Self(flag)
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl WishlistStore {
    /// Create a wishlist engine. Guests get their persisted snapshot
    /// loaded immediately; authenticated sessions start empty until
    /// [`refresh`](WishlistStore::refresh).
    #[must_use]
    pub fn new(api: ApiClient, storage: LocalStore, session: SessionManager) -> Self {
        let entries: Vec<WishlistEntry> = if session.is_authenticated() {
            Vec::new()
        } else {
            storage.load(keys::GUEST_WISHLIST)
        };
        let (tx, _rx) = watch::channel(WishlistSnapshot {
            entries: entries.clone(),
        });
        Self {
            inner: Arc::new(WishlistStoreInner {
                api,
                storage,
                session,
                entries: Mutex::new(entries),
                busy: AtomicBool::new(false),
                migrated: AtomicBool::new(false),
                server_synced: AtomicBool::new(false),
                tx,
            }),
        }
    }

    /// Subscribe to wishlist snapshots.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<WishlistSnapshot> {
        self.inner.tx.subscribe()
    }

    /// The current wishlist snapshot.
    pub async fn snapshot(&self) -> WishlistSnapshot {
        WishlistSnapshot {
            entries: self.lock_entries().await.clone(),
        }
    }

    /// Whether the wishlist contains an entry for `(product_id, size)`.
    /// Pass `None` for one-size products.
    pub async fn is_in_wishlist(&self, product_id: &ProductId, size: Option<&str>) -> bool {
        let size = size.unwrap_or(DEFAULT_SIZE);
        self.lock_entries()
            .await
            .iter()
            .any(|entry| entry.matches(product_id, size))
    }

    /// Whether a remote operation is currently in flight.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.inner.busy.load(Ordering::SeqCst)
    }

    /// Add a product to the wishlist. Pass `None` for one-size products.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Business` if the entry already exists (checked
    /// locally for guests, reported by the server otherwise), or another
    /// `StoreError` on remote or storage failure.
    #[instrument(skip(self, product), fields(product_id = %product.id, size))]
    pub async fn add_item(
        &self,
        product: ProductSnapshot,
        size: Option<&str>,
    ) -> Result<(), StoreError> {
        let size = size.unwrap_or(DEFAULT_SIZE);
        let mut entries = self.lock_entries().await;

        if self.inner.session.is_authenticated() {
            // The server owns the duplicate check here; checking the local
            // copy too could mask newer server state.
            let _busy = BusyGuard::set(&self.inner.busy);
            let wishlist = self
                .remote(
                    self.inner.api.add_wishlist_item(&product.id, size),
                    &mut entries,
                )
                .await?;
            self.replace_from_server(&mut entries, wishlist.items);
        } else {
            if entries.iter().any(|entry| entry.matches(&product.id, size)) {
                return Err(StoreError::Business(
                    "item is already in the wishlist".to_string(),
                ));
            }
            entries.push(WishlistEntry {
                product_id: product.id.clone(),
                size: size.to_string(),
                added_at: Utc::now(),
                product,
            });
            self.persist_guest(&entries)?;
            self.publish(&entries);
        }
        Ok(())
    }

    /// Remove an entry from the wishlist. Removing an absent entry is a
    /// success.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` on remote or storage failure.
    #[instrument(skip(self), fields(product_id = %product_id, size))]
    pub async fn remove_item(
        &self,
        product_id: &ProductId,
        size: Option<&str>,
    ) -> Result<(), StoreError> {
        let size = size.unwrap_or(DEFAULT_SIZE);
        let mut entries = self.lock_entries().await;

        if self.inner.session.is_authenticated() {
            let _busy = BusyGuard::set(&self.inner.busy);
            let wishlist = self
                .remote(
                    self.inner.api.remove_wishlist_item(product_id, size),
                    &mut entries,
                )
                .await?;
            self.replace_from_server(&mut entries, wishlist.items);
        } else {
            entries.retain(|entry| !entry.matches(product_id, size));
            self.persist_guest(&entries)?;
            self.publish(&entries);
        }
        Ok(())
    }

    /// Atomically move a wishlist entry into the cart, returning the
    /// updated cart for the caller to apply to the cart engine.
    ///
    /// Authenticated-only: the server owns the atomicity of the two-entity
    /// update. Guests get a business error directing them to log in.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Business` for guests, or another `StoreError`
    /// on remote failure.
    #[instrument(skip(self), fields(product_id = %product_id, size, quantity))]
    pub async fn move_to_cart(
        &self,
        product_id: &ProductId,
        size: Option<&str>,
        quantity: u32,
    ) -> Result<Cart, StoreError> {
        if !self.inner.session.is_authenticated() {
            return Err(StoreError::Business(
                "please log in to move items to your cart".to_string(),
            ));
        }
        let size = size.unwrap_or(DEFAULT_SIZE);
        let mut entries = self.lock_entries().await;

        let _busy = BusyGuard::set(&self.inner.busy);
        let response = self
            .remote(
                self.inner
                    .api
                    .move_wishlist_item_to_cart(product_id, size, quantity),
                &mut entries,
            )
            .await?;
        self.replace_from_server(&mut entries, response.wishlist.items);
        Ok(response.cart)
    }

    /// Empty the wishlist.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` on remote or storage failure.
    #[instrument(skip(self))]
    pub async fn clear(&self) -> Result<(), StoreError> {
        let mut entries = self.lock_entries().await;

        if self.inner.session.is_authenticated() {
            let _busy = BusyGuard::set(&self.inner.busy);
            self.remote(self.inner.api.clear_wishlist(), &mut entries)
                .await?;
            self.replace_from_server(&mut entries, Vec::new());
        } else {
            self.inner.storage.clear(keys::GUEST_WISHLIST)?;
            self.replace(&mut entries, Vec::new());
        }
        Ok(())
    }

    /// Re-pull the wishlist from its source of truth.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` on remote failure.
    #[instrument(skip(self))]
    pub async fn refresh(&self) -> Result<(), StoreError> {
        let mut entries = self.lock_entries().await;

        if self.inner.session.is_authenticated() {
            let _busy = BusyGuard::set(&self.inner.busy);
            let wishlist = self
                .remote(self.inner.api.get_wishlist(), &mut entries)
                .await?;
            self.replace_from_server(&mut entries, wishlist.items);
        } else {
            let stored = self.inner.storage.load(keys::GUEST_WISHLIST);
            self.replace(&mut entries, stored);
        }
        Ok(())
    }

    /// Migrate the persisted guest wishlist into the authenticated user's
    /// server wishlist. At most once per engine instance; failure keeps the
    /// snapshot and re-arms the migration.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` on remote failure.
    #[instrument(skip(self))]
    pub async fn transfer_guest_wishlist(&self) -> Result<(), StoreError> {
        if self.inner.migrated.swap(true, Ordering::SeqCst) {
            debug!("guest wishlist already migrated, skipping");
            return Ok(());
        }

        let guest_items: Vec<WishlistEntry> = self.inner.storage.load(keys::GUEST_WISHLIST);
        if guest_items.is_empty() {
            debug!("no guest wishlist to migrate");
            return Ok(());
        }

        let mut entries = self.lock_entries().await;
        let _busy = BusyGuard::set(&self.inner.busy);
        match self.inner.api.transfer_guest_wishlist(guest_items).await {
            Ok(wishlist) => {
                if let Err(e) = self.inner.storage.clear(keys::GUEST_WISHLIST) {
                    warn!(error = %e, "failed to delete migrated guest wishlist");
                }
                self.replace_from_server(&mut entries, wishlist.items);
                Ok(())
            }
            Err(e) => {
                self.inner.migrated.store(false, Ordering::SeqCst);
                self.handle_auth_failure(&e, &mut entries);
                Err(e)
            }
        }
    }

    /// Drop all in-memory state (logout). Persisted guest snapshots are
    /// left untouched.
    pub async fn reset(&self) {
        let mut entries = self.inner.entries.lock().await;
        self.inner.migrated.store(false, Ordering::SeqCst);
        self.inner.server_synced.store(false, Ordering::SeqCst);
        self.replace(&mut entries, Vec::new());
    }

    // =========================================================================
    // Internals
    // =========================================================================

    /// Acquire the state lock, first dropping any server-derived entries
    /// left over from a session that has since ended (logout or a 401
    /// observed by another engine). Keeping them would let the next guest
    /// mutation persist the logged-out user's wishlist locally.
    async fn lock_entries(&self) -> tokio::sync::MutexGuard<'_, Vec<WishlistEntry>> {
        let mut entries = self.inner.entries.lock().await;
        if self.inner.server_synced.load(Ordering::SeqCst)
            && !self.inner.session.is_authenticated()
        {
            debug!("session ended, dropping server-derived wishlist state");
            self.inner.server_synced.store(false, Ordering::SeqCst);
            self.inner.migrated.store(false, Ordering::SeqCst);
            self.replace(&mut entries, Vec::new());
        }
        entries
    }

    async fn remote<T>(
        &self,
        fut: impl Future<Output = Result<T, StoreError>>,
        entries: &mut Vec<WishlistEntry>,
    ) -> Result<T, StoreError> {
        match fut.await {
            Ok(value) => Ok(value),
            Err(e) => {
                self.handle_auth_failure(&e, entries);
                Err(e)
            }
        }
    }

    fn handle_auth_failure(&self, error: &StoreError, entries: &mut Vec<WishlistEntry>) {
        if error.is_session_expired() {
            self.inner.server_synced.store(false, Ordering::SeqCst);
            self.inner.migrated.store(false, Ordering::SeqCst);
            self.replace(entries, Vec::new());
        }
    }

    /// Replace state with a server-returned entity.
    fn replace_from_server(&self, entries: &mut Vec<WishlistEntry>, next: Vec<WishlistEntry>) {
        self.inner.server_synced.store(true, Ordering::SeqCst);
        self.replace(entries, next);
    }

    fn replace(&self, entries: &mut Vec<WishlistEntry>, next: Vec<WishlistEntry>) {
        *entries = next;
        self.publish(entries);
    }

    fn persist_guest(&self, entries: &[WishlistEntry]) -> Result<(), StoreError> {
        self.inner.storage.save(keys::GUEST_WISHLIST, &entries)
    }

    fn publish(&self, entries: &[WishlistEntry]) {
        self.inner.tx.send_replace(WishlistSnapshot {
            entries: entries.to_vec(),
        });
    }
}

impl std::fmt::Debug for WishlistStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WishlistStore")
            .field("busy", &self.is_busy())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;
    use juniper_core::{CurrencyCode, Price};
    use rust_decimal::Decimal;

    fn guest_store() -> (tempfile::TempDir, WishlistStore) {
        let dir = tempfile::tempdir().unwrap();
        let config = ClientConfig::new("http://127.0.0.1:9", dir.path()).unwrap();
        let storage = LocalStore::open(&config.data_dir).unwrap();
        let session = SessionManager::new(storage.clone());
        let api = ApiClient::new(&config, session.clone()).unwrap();
        let store = WishlistStore::new(api, storage, session);
        (dir, store)
    }

    fn product(id: &str) -> ProductSnapshot {
        ProductSnapshot {
            id: ProductId::new(id),
            name: "Wool Scarf".to_string(),
            price: Price::new(Decimal::new(3500, 2), CurrencyCode::USD),
            image: None,
        }
    }

    #[tokio::test]
    async fn test_guest_add_and_lookup() {
        let (_dir, store) = guest_store();
        store.add_item(product("p1"), Some("M")).await.unwrap();

        assert!(store.is_in_wishlist(&ProductId::new("p1"), Some("M")).await);
        assert!(!store.is_in_wishlist(&ProductId::new("p1"), None).await);
        assert_eq!(store.snapshot().await.entries.len(), 1);
    }

    #[tokio::test]
    async fn test_guest_add_defaults_size() {
        let (_dir, store) = guest_store();
        store.add_item(product("p1"), None).await.unwrap();

        let snapshot = store.snapshot().await;
        assert_eq!(snapshot.entries[0].size, DEFAULT_SIZE);
        assert!(store.is_in_wishlist(&ProductId::new("p1"), None).await);
    }

    #[tokio::test]
    async fn test_guest_duplicate_add_rejected() {
        let (_dir, store) = guest_store();
        store.add_item(product("p1"), Some("M")).await.unwrap();
        let result = store.add_item(product("p1"), Some("M")).await;

        assert!(matches!(result, Err(StoreError::Business(_))));
        assert_eq!(store.snapshot().await.entries.len(), 1);
    }

    #[tokio::test]
    async fn test_guest_same_product_different_sizes_allowed() {
        let (_dir, store) = guest_store();
        store.add_item(product("p1"), Some("M")).await.unwrap();
        store.add_item(product("p1"), Some("L")).await.unwrap();
        assert_eq!(store.snapshot().await.entries.len(), 2);
    }

    #[tokio::test]
    async fn test_guest_remove_is_idempotent() {
        let (_dir, store) = guest_store();
        store.add_item(product("p1"), None).await.unwrap();
        store
            .remove_item(&ProductId::new("p1"), None)
            .await
            .unwrap();
        store
            .remove_item(&ProductId::new("p1"), None)
            .await
            .unwrap();
        assert!(store.snapshot().await.entries.is_empty());
    }

    #[tokio::test]
    async fn test_guest_move_to_cart_requires_login() {
        let (_dir, store) = guest_store();
        store.add_item(product("p1"), Some("M")).await.unwrap();
        let result = store
            .move_to_cart(&ProductId::new("p1"), Some("M"), 1)
            .await;

        assert!(matches!(result, Err(StoreError::Business(_))));
        // Entry stays put when the move is refused.
        assert_eq!(store.snapshot().await.entries.len(), 1);
    }

    #[tokio::test]
    async fn test_guest_wishlist_persists_across_engines() {
        let dir = tempfile::tempdir().unwrap();
        let config = ClientConfig::new("http://127.0.0.1:9", dir.path()).unwrap();
        let storage = LocalStore::open(&config.data_dir).unwrap();
        let session = SessionManager::new(storage.clone());
        let api = ApiClient::new(&config, session.clone()).unwrap();

        let store = WishlistStore::new(api.clone(), storage.clone(), session.clone());
        store.add_item(product("p1"), None).await.unwrap();

        let reloaded = WishlistStore::new(api, storage, session);
        assert_eq!(reloaded.snapshot().await.entries.len(), 1);
    }

    #[tokio::test]
    async fn test_guest_clear_empties_wishlist_and_storage() {
        let (dir, store) = guest_store();
        store.add_item(product("p1"), None).await.unwrap();
        store.clear().await.unwrap();

        assert!(store.snapshot().await.entries.is_empty());
        assert!(!dir.path().join("wishlist-store.json").exists());
    }

    #[tokio::test]
    async fn test_transfer_with_empty_snapshot_is_noop() {
        let (_dir, store) = guest_store();
        store.transfer_guest_wishlist().await.unwrap();
        store.transfer_guest_wishlist().await.unwrap();
    }
}
