//! User profile endpoints.

use reqwest::Method;
use reqwest::multipart::{Form, Part};
use tracing::instrument;

use crate::error::StoreError;
use crate::types::{ProfileUpdate, UserProfile};

use super::ApiClient;

impl ApiClient {
    /// Fetch the authenticated user's profile.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` on network, auth, or server failure.
    #[instrument(skip(self))]
    pub async fn get_profile(&self) -> Result<UserProfile, StoreError> {
        self.send(self.request(Method::GET, "/users/profile")).await
    }

    /// Update the authenticated user's profile.
    ///
    /// Sent as multipart form data so the avatar image rides along with the
    /// text fields. Absent fields are omitted and left unchanged server-side.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Validation` if the avatar MIME type is
    /// malformed, or another `StoreError` on network, auth, or server
    /// failure.
    #[instrument(skip(self, update))]
    pub async fn update_profile(&self, update: ProfileUpdate) -> Result<UserProfile, StoreError> {
        let mut form = Form::new();
        if let Some(first_name) = update.first_name {
            form = form.text("firstName", first_name);
        }
        if let Some(last_name) = update.last_name {
            form = form.text("lastName", last_name);
        }
        if let Some(email) = update.email {
            form = form.text("email", email.into_inner());
        }
        if let Some(avatar) = update.avatar {
            let part = Part::bytes(avatar.bytes)
                .file_name(avatar.file_name)
                .mime_str(&avatar.content_type)
                .map_err(|e| {
                    StoreError::Validation(format!("invalid avatar content type: {e}"))
                })?;
            form = form.part("avatar", part);
        }

        self.send(self.request(Method::PUT, "/users/update").multipart(form))
            .await
    }
}
