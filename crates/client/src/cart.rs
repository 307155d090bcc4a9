//! Cart synchronization engine.
//!
//! Maintains the canonical in-process cart and keeps it synchronized with
//! either local persistence (guest) or the remote API (authenticated). The
//! engine owns the mode split: callers never ask which mode is active, they
//! just mutate the cart and observe snapshots.
//!
//! Authenticated mutations replace local state wholesale from the server
//! response. Local state is never patched optimistically, so a failed
//! remote call leaves the cart exactly as it was.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::{Mutex, watch};
use tracing::{debug, instrument, warn};

use juniper_core::{Price, ProductId};

use crate::api::ApiClient;
use crate::error::StoreError;
use crate::session::SessionManager;
use crate::storage::{LocalStore, keys};
use crate::types::{Cart, CartLine, NewCartLine};

/// A point-in-time view of the cart, with derived totals.
#[derive(Debug, Clone, Default)]
pub struct CartSnapshot {
    /// Cart lines, unique by `(product_id, size)`.
    pub lines: Vec<CartLine>,
    /// Sum of all line quantities.
    pub total_quantity: u32,
    /// Sum of `price * quantity` over lines with a known price.
    pub subtotal: Price,
}

/// Cart synchronization engine.
///
/// Cheaply cloneable; all clones share one state cell.
#[derive(Clone)]
pub struct CartStore {
    inner: Arc<CartStoreInner>,
}

struct CartStoreInner {
    api: ApiClient,
    storage: LocalStore,
    session: SessionManager,
    lines: Mutex<Vec<CartLine>>,
    busy: AtomicBool,
    migrated: AtomicBool,
    /// Whether the current lines came from the server for an authenticated
    /// session. Such state must not survive the session ending.
    server_synced: AtomicBool,
    tx: watch::Sender<CartSnapshot>,
}

/// RAII flag for the in-flight indicator.
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

fn snapshot_of(lines: &[CartLine]) -> CartSnapshot {
    let total_quantity = lines.iter().map(|line| line.quantity).sum();
    let currency = lines
        .iter()
        .find_map(|line| line.price.as_ref().map(|p| p.currency_code))
        .unwrap_or_default();
    let subtotal = lines.iter().fold(Price::zero(currency), |acc, line| {
        line.price
            .as_ref()
            .map_or(acc, |price| acc + price.times(line.quantity))
    });
    CartSnapshot {
        lines: lines.to_vec(),
        total_quantity,
        subtotal,
    }
}

impl CartStore {
    /// Create a cart engine.
    ///
    /// For guests, the persisted snapshot is loaded immediately. For
    /// authenticated sessions the cart starts empty until [`refresh`]
    /// (normally driven by session startup) pulls the server cart.
    ///
    /// [`refresh`]: CartStore::refresh
    #[must_use]
    pub fn new(api: ApiClient, storage: LocalStore, session: SessionManager) -> Self {
        let lines: Vec<CartLine> = if session.is_authenticated() {
            Vec::new()
        } else {
            storage.load(keys::GUEST_CART)
        };
        let (tx, _rx) = watch::channel(snapshot_of(&lines));
        Self {
            inner: Arc::new(CartStoreInner {
                api,
                storage,
                session,
                lines: Mutex::new(lines),
                busy: AtomicBool::new(false),
                migrated: AtomicBool::new(false),
                server_synced: AtomicBool::new(false),
                tx,
            }),
        }
    }

    /// Subscribe to cart snapshots. The receiver always holds the latest.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<CartSnapshot> {
        self.inner.tx.subscribe()
    }

    /// The current cart snapshot.
    pub async fn snapshot(&self) -> CartSnapshot {
        snapshot_of(&self.lock_lines().await)
    }

    /// Sum of all line quantities, computed from the current lines.
    pub async fn total_quantity(&self) -> u32 {
        self.lock_lines()
            .await
            .iter()
            .map(|line| line.quantity)
            .sum()
    }

    /// Cart subtotal, computed from the current lines.
    pub async fn subtotal(&self) -> Price {
        snapshot_of(&self.lock_lines().await).subtotal
    }

    /// Whether a remote operation is currently in flight.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.inner.busy.load(Ordering::SeqCst)
    }

    /// Add an item to the cart.
    ///
    /// Guests merge additively into any existing `(product_id, size)` line
    /// and persist locally; authenticated carts go through the API and are
    /// replaced wholesale from the response.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Validation` for malformed input, or another
    /// `StoreError` on remote failure. State is unchanged on error.
    #[instrument(skip(self, item), fields(product_id = %item.product_id, size = %item.size))]
    pub async fn add_item(&self, item: NewCartLine) -> Result<(), StoreError> {
        item.validate()?;
        let mut lines = self.lock_lines().await;

        if self.inner.session.is_authenticated() {
            let _busy = BusyGuard::set(&self.inner.busy);
            let cart = self.remote(self.inner.api.add_cart_item(&item), &mut lines).await?;
            self.replace_from_server(&mut lines, cart.items);
        } else {
            let existing = lines
                .iter()
                .position(|line| line.matches(&item.product_id, &item.size));
            if let Some(line) = existing.and_then(|index| lines.get_mut(index)) {
                line.quantity += item.quantity;
            } else {
                lines.push(item.into_line());
            }
            self.persist_guest(&lines)?;
            self.publish(&lines);
        }
        Ok(())
    }

    /// Set the absolute quantity of a cart line. A quantity of zero removes
    /// the line.
    ///
    /// # Errors
    ///
    /// For guests, returns `StoreError::Business` if the line does not
    /// exist. Remote failures surface as their `StoreError` variant.
    #[instrument(skip(self), fields(product_id = %product_id, size, quantity))]
    pub async fn update_quantity(
        &self,
        product_id: &ProductId,
        size: &str,
        quantity: u32,
    ) -> Result<(), StoreError> {
        if quantity == 0 {
            return self.remove_item(product_id, size).await;
        }
        let mut lines = self.lock_lines().await;

        if self.inner.session.is_authenticated() {
            let _busy = BusyGuard::set(&self.inner.busy);
            let cart = self
                .remote(
                    self.inner.api.update_cart_item(product_id, size, quantity),
                    &mut lines,
                )
                .await?;
            self.replace_from_server(&mut lines, cart.items);
        } else {
            let line = lines
                .iter_mut()
                .find(|line| line.matches(product_id, size))
                .ok_or_else(|| StoreError::Business("cart item not found".to_string()))?;
            line.quantity = quantity;
            self.persist_guest(&lines)?;
            self.publish(&lines);
        }
        Ok(())
    }

    /// Remove a cart line. Removing an absent line is a success.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` on remote or storage failure.
    #[instrument(skip(self), fields(product_id = %product_id, size))]
    pub async fn remove_item(&self, product_id: &ProductId, size: &str) -> Result<(), StoreError> {
        let mut lines = self.lock_lines().await;

        if self.inner.session.is_authenticated() {
            let _busy = BusyGuard::set(&self.inner.busy);
            let cart = self
                .remote(self.inner.api.remove_cart_item(product_id, size), &mut lines)
                .await?;
            self.replace_from_server(&mut lines, cart.items);
        } else {
            lines.retain(|line| !line.matches(product_id, size));
            self.persist_guest(&lines)?;
            self.publish(&lines);
        }
        Ok(())
    }

    /// Empty the cart.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` on remote or storage failure.
    #[instrument(skip(self))]
    pub async fn clear(&self) -> Result<(), StoreError> {
        let mut lines = self.lock_lines().await;

        if self.inner.session.is_authenticated() {
            let _busy = BusyGuard::set(&self.inner.busy);
            self.remote(self.inner.api.clear_cart(), &mut lines).await?;
            self.replace_from_server(&mut lines, Vec::new());
        } else {
            self.inner.storage.clear(keys::GUEST_CART)?;
            self.replace(&mut lines, Vec::new());
        }
        Ok(())
    }

    /// Re-pull the cart from its source of truth: the server when
    /// authenticated, local persistence otherwise.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` on remote failure.
    #[instrument(skip(self))]
    pub async fn refresh(&self) -> Result<(), StoreError> {
        let mut lines = self.lock_lines().await;

        if self.inner.session.is_authenticated() {
            let _busy = BusyGuard::set(&self.inner.busy);
            let cart = self.remote(self.inner.api.get_cart(), &mut lines).await?;
            self.replace_from_server(&mut lines, cart.items);
        } else {
            let stored = self.inner.storage.load(keys::GUEST_CART);
            self.replace(&mut lines, stored);
        }
        Ok(())
    }

    /// Migrate the persisted guest cart into the authenticated user's
    /// server cart. Runs at most once per engine instance; repeat calls are
    /// silent no-ops.
    ///
    /// On success the guest snapshot is deleted and the cart reflects the
    /// server-side merge. On failure the snapshot is kept and the migration
    /// becomes eligible to run again.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` on remote failure.
    #[instrument(skip(self))]
    pub async fn transfer_guest_cart(&self) -> Result<(), StoreError> {
        if self.inner.migrated.swap(true, Ordering::SeqCst) {
            debug!("guest cart already migrated, skipping");
            return Ok(());
        }

        let guest_items: Vec<CartLine> = self.inner.storage.load(keys::GUEST_CART);
        if guest_items.is_empty() {
            debug!("no guest cart to migrate");
            return Ok(());
        }

        let mut lines = self.lock_lines().await;
        let _busy = BusyGuard::set(&self.inner.busy);
        match self.inner.api.transfer_guest_cart(guest_items).await {
            Ok(cart) => {
                if let Err(e) = self.inner.storage.clear(keys::GUEST_CART) {
                    warn!(error = %e, "failed to delete migrated guest cart");
                }
                self.replace_from_server(&mut lines, cart.items);
                Ok(())
            }
            Err(e) => {
                // Snapshot untouched; allow a later retry.
                self.inner.migrated.store(false, Ordering::SeqCst);
                self.handle_auth_failure(&e, &mut lines);
                Err(e)
            }
        }
    }

    /// Replace the cart with a server-provided entity. Used when another
    /// flow (e.g., moving a wishlist entry to the cart) receives an updated
    /// cart in its response.
    pub async fn apply_server_cart(&self, cart: Cart) {
        let mut lines = self.lock_lines().await;
        self.replace_from_server(&mut lines, cart.items);
    }

    /// Drop all in-memory state (logout). Persisted guest snapshots are
    /// left untouched.
    pub async fn reset(&self) {
        let mut lines = self.inner.lines.lock().await;
        self.inner.migrated.store(false, Ordering::SeqCst);
        self.inner.server_synced.store(false, Ordering::SeqCst);
        self.replace(&mut lines, Vec::new());
    }

    // =========================================================================
    // Internals
    // =========================================================================

    /// Acquire the state lock, first dropping any server-derived lines left
    /// over from a session that has since ended (logout or a 401 observed
    /// by another engine). Keeping them would let the next guest mutation
    /// persist the logged-out user's cart locally.
    async fn lock_lines(&self) -> tokio::sync::MutexGuard<'_, Vec<CartLine>> {
        let mut lines = self.inner.lines.lock().await;
        if self.inner.server_synced.load(Ordering::SeqCst)
            && !self.inner.session.is_authenticated()
        {
            debug!("session ended, dropping server-derived cart state");
            self.inner.server_synced.store(false, Ordering::SeqCst);
            self.inner.migrated.store(false, Ordering::SeqCst);
            self.replace(&mut lines, Vec::new());
        }
        lines
    }

    /// Run a remote call while holding the state lock, clearing the cart if
    /// the session turns out to be expired.
    async fn remote<T>(
        &self,
        fut: impl Future<Output = Result<T, StoreError>>,
        lines: &mut Vec<CartLine>,
    ) -> Result<T, StoreError> {
        match fut.await {
            Ok(value) => Ok(value),
            Err(e) => {
                self.handle_auth_failure(&e, lines);
                Err(e)
            }
        }
    }

    /// A 401 already invalidated the session; the authenticated cart no
    /// longer applies, so drop it.
    fn handle_auth_failure(&self, error: &StoreError, lines: &mut Vec<CartLine>) {
        if error.is_session_expired() {
            self.inner.server_synced.store(false, Ordering::SeqCst);
            self.inner.migrated.store(false, Ordering::SeqCst);
            self.replace(lines, Vec::new());
        }
    }

    /// Replace state with a server-returned entity.
    fn replace_from_server(&self, lines: &mut Vec<CartLine>, next: Vec<CartLine>) {
        self.inner.server_synced.store(true, Ordering::SeqCst);
        self.replace(lines, next);
    }

    fn replace(&self, lines: &mut Vec<CartLine>, next: Vec<CartLine>) {
        *lines = next;
        self.publish(lines);
    }

    fn persist_guest(&self, lines: &[CartLine]) -> Result<(), StoreError> {
        self.inner.storage.save(keys::GUEST_CART, &lines)
    }

    fn publish(&self, lines: &[CartLine]) {
        self.inner.tx.send_replace(snapshot_of(lines));
    }
}

impl std::fmt::Debug for CartStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CartStore")
            .field("busy", &self.is_busy())
            .finish_non_exhaustive()
    }
}
