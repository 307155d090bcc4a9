//! Profile fetch, update, and cache.
//!
//! The profile is authenticated-only. A fetched profile is cached locally
//! so the UI can render the account page instantly on the next launch; the
//! cache is dropped on logout or when the session is invalidated.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::{debug, instrument, warn};

use crate::api::ApiClient;
use crate::error::StoreError;
use crate::session::SessionManager;
use crate::storage::{LocalStore, keys};
use crate::types::{ProfileUpdate, UserProfile};

/// Profile service.
///
/// Cheaply cloneable; all clones share one cache cell.
#[derive(Clone)]
pub struct ProfileService {
    inner: Arc<ProfileServiceInner>,
}

struct ProfileServiceInner {
    api: ApiClient,
    storage: LocalStore,
    session: SessionManager,
    cached: Mutex<Option<UserProfile>>,
}

impl ProfileService {
    /// Create a profile service, restoring any cached profile from disk.
    #[must_use]
    pub fn new(api: ApiClient, storage: LocalStore, session: SessionManager) -> Self {
        let cached: Option<UserProfile> = if session.is_authenticated() {
            storage.load(keys::PROFILE_CACHE)
        } else {
            None
        };
        Self {
            inner: Arc::new(ProfileServiceInner {
                api,
                storage,
                session,
                cached: Mutex::new(cached),
            }),
        }
    }

    /// The locally cached profile, if any. Never touches the network.
    pub async fn cached_profile(&self) -> Option<UserProfile> {
        self.inner.cached.lock().await.clone()
    }

    /// Fetch the profile from the API and refresh the cache.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Auth` when anonymous or when the credential is
    /// rejected, or another `StoreError` on remote failure.
    #[instrument(skip(self))]
    pub async fn fetch_profile(&self) -> Result<UserProfile, StoreError> {
        if !self.inner.session.is_authenticated() {
            return Err(StoreError::Auth("not logged in".to_string()));
        }
        let profile = self.inner.api.get_profile().await?;
        self.store(profile.clone()).await;
        Ok(profile)
    }

    /// Update the profile and refresh the cache from the response.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Auth` when anonymous, or another `StoreError`
    /// on remote failure.
    #[instrument(skip(self, update))]
    pub async fn update_profile(&self, update: ProfileUpdate) -> Result<UserProfile, StoreError> {
        if !self.inner.session.is_authenticated() {
            return Err(StoreError::Auth("not logged in".to_string()));
        }
        let profile = self.inner.api.update_profile(update).await?;
        self.store(profile.clone()).await;
        Ok(profile)
    }

    /// Drop the cached profile (logout).
    pub async fn clear_cache(&self) {
        *self.inner.cached.lock().await = None;
        if let Err(e) = self.inner.storage.clear(keys::PROFILE_CACHE) {
            warn!(error = %e, "failed to clear cached profile");
        }
    }

    /// Spawn a background task that periodically re-fetches the profile
    /// while the session is authenticated. Failures are logged, never
    /// surfaced; the cache keeps its last good value.
    pub fn spawn_refresh(&self, interval: Duration) -> tokio::task::JoinHandle<()> {
        let service = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            // The first tick fires immediately; skip it so startup is not
            // doubled up with the login-time fetch.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if !service.inner.session.is_authenticated() {
                    debug!("skipping profile refresh, not logged in");
                    continue;
                }
                if let Err(e) = service.fetch_profile().await {
                    warn!(error = %e, "background profile refresh failed");
                }
            }
        })
    }

    async fn store(&self, profile: UserProfile) {
        if let Err(e) = self.inner.storage.save(keys::PROFILE_CACHE, &profile) {
            warn!(error = %e, "failed to cache profile");
        }
        *self.inner.cached.lock().await = Some(profile);
    }
}

impl std::fmt::Debug for ProfileService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProfileService").finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;
    use juniper_core::{Email, UserId};

    fn service(dir: &tempfile::TempDir) -> (LocalStore, SessionManager, ProfileService) {
        let config = ClientConfig::new("http://127.0.0.1:9", dir.path()).unwrap();
        let storage = LocalStore::open(&config.data_dir).unwrap();
        let session = SessionManager::new(storage.clone());
        let api = ApiClient::new(&config, session.clone()).unwrap();
        let service = ProfileService::new(api, storage.clone(), session.clone());
        (storage, session, service)
    }

    fn profile() -> UserProfile {
        UserProfile {
            id: UserId::new("u1"),
            email: Email::parse("ada@example.com").unwrap(),
            first_name: Some("Ada".to_string()),
            last_name: None,
            avatar: None,
        }
    }

    #[tokio::test]
    async fn test_fetch_requires_login() {
        let dir = tempfile::tempdir().unwrap();
        let (_storage, _session, service) = service(&dir);
        let result = service.fetch_profile().await;
        assert!(matches!(result, Err(StoreError::Auth(_))));
    }

    #[tokio::test]
    async fn test_cached_profile_restored_when_authenticated() {
        let dir = tempfile::tempdir().unwrap();
        let config = ClientConfig::new("http://127.0.0.1:9", dir.path()).unwrap();
        let storage = LocalStore::open(&config.data_dir).unwrap();
        storage.save(keys::PROFILE_CACHE, &profile()).unwrap();
        storage.save_token("tok").unwrap();

        let session = SessionManager::new(storage.clone());
        let api = ApiClient::new(&config, session.clone()).unwrap();
        let service = ProfileService::new(api, storage, session);

        let cached = service.cached_profile().await.unwrap();
        assert_eq!(cached.first_name.as_deref(), Some("Ada"));
    }

    #[tokio::test]
    async fn test_stale_cache_ignored_when_anonymous() {
        let dir = tempfile::tempdir().unwrap();
        let (storage, _session, _) = service(&dir);
        storage.save(keys::PROFILE_CACHE, &profile()).unwrap();

        // No token: a leftover cache must not leak into an anonymous session.
        let (_, _, rebuilt) = service(&dir);
        assert!(rebuilt.cached_profile().await.is_none());
    }

    #[tokio::test]
    async fn test_clear_cache_removes_memory_and_disk() {
        let dir = tempfile::tempdir().unwrap();
        let config = ClientConfig::new("http://127.0.0.1:9", dir.path()).unwrap();
        let storage = LocalStore::open(&config.data_dir).unwrap();
        storage.save(keys::PROFILE_CACHE, &profile()).unwrap();
        storage.save_token("tok").unwrap();

        let session = SessionManager::new(storage.clone());
        let api = ApiClient::new(&config, session.clone()).unwrap();
        let service = ProfileService::new(api, storage.clone(), session);

        service.clear_cache().await;
        assert!(service.cached_profile().await.is_none());
        let on_disk: Option<UserProfile> = storage.load(keys::PROFILE_CACHE);
        assert!(on_disk.is_none());
    }
}
