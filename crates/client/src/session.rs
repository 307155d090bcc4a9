//! Session state derived from the presence of a session token.
//!
//! The storefront has exactly two identities: `anonymous` (no token) and
//! `authenticated` (token present). Token issuance happens elsewhere; this
//! module only observes and stores the credential. Expiry is discovered
//! lazily: a remote call failing with 401 invalidates the session.

use std::sync::{Arc, RwLock};

use secrecy::{ExposeSecret, SecretString};
use tracing::warn;

use crate::error::StoreError;
use crate::storage::{LocalStore, keys};

/// Process-wide authentication state.
///
/// Cheaply cloneable; all clones share the same token cell.
#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<SessionManagerInner>,
}

struct SessionManagerInner {
    storage: LocalStore,
    token: RwLock<Option<SecretString>>,
}

impl SessionManager {
    /// Create a session manager, restoring any persisted token.
    #[must_use]
    pub fn new(storage: LocalStore) -> Self {
        let token = storage.load_token().map(SecretString::from);
        Self {
            inner: Arc::new(SessionManagerInner {
                storage,
                token: RwLock::new(token),
            }),
        }
    }

    /// Whether a session token is present.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.inner
            .token
            .read()
            .map(|token| token.is_some())
            .unwrap_or(false)
    }

    /// The bearer token for outgoing requests, if authenticated.
    #[must_use]
    pub fn token(&self) -> Option<String> {
        self.inner
            .token
            .read()
            .ok()
            .and_then(|token| token.as_ref().map(|t| t.expose_secret().to_string()))
    }

    /// Store a freshly issued session token (login).
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Storage` if the token cannot be persisted; the
    /// in-memory session is still marked authenticated in that case.
    pub fn set_token(&self, token: &str) -> Result<(), StoreError> {
        if let Ok(mut cell) = self.inner.token.write() {
            *cell = Some(SecretString::from(token.to_string()));
        }
        self.inner.storage.save_token(token)
    }

    /// Clear the session token (logout). Idempotent.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Storage` on filesystem failure.
    pub fn clear(&self) -> Result<(), StoreError> {
        if let Ok(mut cell) = self.inner.token.write() {
            *cell = None;
        }
        self.inner.storage.clear_token()
    }

    /// Forced logout after the API rejected the credential (HTTP 401).
    ///
    /// Clears the token and the locally cached profile. Failures here are
    /// logged rather than surfaced: the caller is already propagating the
    /// auth error that triggered this.
    pub fn invalidate(&self) {
        warn!("session token rejected by the API, logging out");
        if let Err(e) = self.clear() {
            warn!(error = %e, "failed to clear session token");
        }
        if let Err(e) = self.inner.storage.clear(keys::PROFILE_CACHE) {
            warn!(error = %e, "failed to clear cached profile");
        }
    }
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("authenticated", &self.is_authenticated())
            .finish_non_exhaustive()
    }
}
