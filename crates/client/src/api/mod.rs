//! Typed client for the storefront REST API.
//!
//! One method per REST operation, no business logic: request shaping,
//! response parsing, and error surfacing only. Mutation endpoints return
//! the *entire updated entity*, which callers must treat as the new source
//! of truth and use to replace local state, never patch it.
//!
//! A 401 from any endpoint means the session credential is invalid; the
//! client clears the local session as a side effect before surfacing
//! [`StoreError::Auth`].

mod cart;
mod users;
mod wishlist;

use std::sync::Arc;

use reqwest::{Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, error};

use crate::config::ClientConfig;
use crate::error::StoreError;
use crate::session::SessionManager;
use crate::types::ApiErrorBody;

const MAX_LOG_BODY_CHARS: usize = 512;

/// Client for the storefront REST API.
///
/// Cheaply cloneable; all clones share one connection pool.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    http: reqwest::Client,
    base_url: String,
    session: SessionManager,
}

impl ApiClient {
    /// Create a new API client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to build.
    pub fn new(config: &ClientConfig, session: SessionManager) -> Result<Self, StoreError> {
        let http = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .build()?;

        Ok(Self {
            inner: Arc::new(ApiClientInner {
                http,
                base_url: config.api_base_url.clone(),
                session,
            }),
        })
    }

    /// Build a request for `path`, attaching the bearer credential when the
    /// session is authenticated.
    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{path}", self.inner.base_url);
        let builder = self.inner.http.request(method, url);
        match self.inner.session.token() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Send a request and parse the JSON response body.
    ///
    /// Non-2xx statuses become typed failures: 401 invalidates the session
    /// and maps to `Auth`, 5xx maps to `Server`, anything else to
    /// `Business` with the server's message.
    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, StoreError> {
        let response = builder.send().await?;
        let status = response.status();
        let body = response.text().await?;
        log_response(status, &body);

        if status == StatusCode::UNAUTHORIZED {
            self.inner.session.invalidate();
            return Err(StoreError::Auth(error_message(&body)));
        }

        if !status.is_success() {
            let message = error_message(&body);
            if status.is_server_error() {
                return Err(StoreError::Server {
                    status: status.as_u16(),
                    message,
                });
            }
            return Err(StoreError::Business(message));
        }

        serde_json::from_str(&body).map_err(|e| {
            error!(
                error = %e,
                body = %preview(&body),
                "failed to parse API response"
            );
            StoreError::Parse(e)
        })
    }
}

/// Extract the failure message from an error body, falling back to the raw
/// body text.
fn error_message(body: &str) -> String {
    serde_json::from_str::<ApiErrorBody>(body)
        .map_or_else(|_| preview(body), |parsed| parsed.message)
}

fn preview(body: &str) -> String {
    let mut out = body.chars().take(MAX_LOG_BODY_CHARS).collect::<String>();
    if body.chars().count() > MAX_LOG_BODY_CHARS {
        out.push_str("...");
    }
    out
}

fn log_response(status: StatusCode, body: &str) {
    if status.is_success() {
        debug!(%status, "API response");
    } else {
        debug!(%status, body = %preview(body), "API error response");
    }
}
