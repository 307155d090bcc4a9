//! Local persistence adapter for guest and session state.
//!
//! A minimal JSON-file key-value store: one file per fixed key under the
//! configured data directory. There is no concurrency control; the last
//! writer wins within a single process, which matches how the UI drives it.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::warn;

use crate::error::StoreError;

/// Fixed storage keys.
pub mod keys {
    /// Guest cart snapshot.
    pub const GUEST_CART: &str = "cart-store";

    /// Guest wishlist snapshot.
    pub const GUEST_WISHLIST: &str = "wishlist-store";

    /// Cached user profile.
    pub const PROFILE_CACHE: &str = "profile-store";

    /// Session token (raw text, not JSON).
    pub const SESSION_TOKEN: &str = "session-token";
}

/// JSON-file key-value store rooted at a data directory.
#[derive(Debug, Clone)]
pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    /// Open (and create if needed) a store rooted at `root`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Storage` if the directory cannot be created.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// The directory backing this store.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(format!("{key}.json"))
    }

    /// Load the value stored under `key`.
    ///
    /// A missing file yields the type's default. Malformed content is
    /// sanitized: it is logged and the default is returned, never an error.
    /// A corrupt guest snapshot must not break the storefront.
    #[must_use]
    pub fn load<T: DeserializeOwned + Default>(&self, key: &str) -> T {
        let path = self.path_for(key);
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return T::default(),
            Err(e) => {
                warn!(key, error = %e, "failed to read local store entry");
                return T::default();
            }
        };

        match serde_json::from_str(&raw) {
            Ok(value) => value,
            Err(e) => {
                warn!(key, error = %e, "malformed local store entry, using default");
                T::default()
            }
        }
    }

    /// Persist `value` under `key` as JSON text.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if serialization or the write fails.
    pub fn save<T: Serialize>(&self, key: &str, value: &T) -> Result<(), StoreError> {
        let raw = serde_json::to_string(value)?;
        fs::write(self.path_for(key), raw)?;
        Ok(())
    }

    /// Remove the value stored under `key`. Removing an absent key is a
    /// silent success.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Storage` on filesystem failure.
    pub fn clear(&self, key: &str) -> Result<(), StoreError> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::Storage(e)),
        }
    }

    // =========================================================================
    // Session Token (raw text, not JSON)
    // =========================================================================

    fn token_path(&self) -> PathBuf {
        self.root.join(keys::SESSION_TOKEN)
    }

    /// Load the persisted session token, if any.
    #[must_use]
    pub fn load_token(&self) -> Option<String> {
        match fs::read_to_string(self.token_path()) {
            Ok(raw) => {
                let token = raw.trim().to_string();
                if token.is_empty() { None } else { Some(token) }
            }
            Err(e) => {
                if e.kind() != ErrorKind::NotFound {
                    warn!(error = %e, "failed to read session token");
                }
                None
            }
        }
    }

    /// Persist the session token.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Storage` on filesystem failure.
    pub fn save_token(&self, token: &str) -> Result<(), StoreError> {
        fs::write(self.token_path(), token)?;
        Ok(())
    }

    /// Remove the persisted session token. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Storage` on filesystem failure.
    pub fn clear_token(&self) -> Result<(), StoreError> {
        match fs::remove_file(self.token_path()) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::Storage(e)),
        }
    }
}
