//! Client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `JUNIPER_API_BASE_URL` - Base URL of the storefront REST API
//!
//! ## Optional
//! - `JUNIPER_DATA_DIR` - Directory for locally persisted state
//!   (default: `.juniper-atelier`)
//! - `JUNIPER_HTTP_TIMEOUT_SECS` - HTTP request timeout (default: 30)
//! - `JUNIPER_PROFILE_REFRESH_SECS` - Background profile refresh interval
//!   (default: 300)

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use url::Url;

const DEFAULT_DATA_DIR: &str = ".juniper-atelier";
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;
const DEFAULT_PROFILE_REFRESH_SECS: u64 = 300;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Storefront client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the storefront REST API (no trailing slash).
    pub api_base_url: String,
    /// Directory for locally persisted guest/session state.
    pub data_dir: PathBuf,
    /// Timeout applied to every HTTP request.
    pub http_timeout: Duration,
    /// Interval for the best-effort background profile refresh.
    pub profile_refresh_interval: Duration,
}

impl ClientConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let api_base_url = validate_base_url(
            "JUNIPER_API_BASE_URL",
            &get_required_env("JUNIPER_API_BASE_URL")?,
        )?;
        let data_dir = PathBuf::from(get_env_or_default("JUNIPER_DATA_DIR", DEFAULT_DATA_DIR));
        let http_timeout = Duration::from_secs(parse_secs(
            "JUNIPER_HTTP_TIMEOUT_SECS",
            DEFAULT_HTTP_TIMEOUT_SECS,
        )?);
        let profile_refresh_interval = Duration::from_secs(parse_secs(
            "JUNIPER_PROFILE_REFRESH_SECS",
            DEFAULT_PROFILE_REFRESH_SECS,
        )?);

        Ok(Self {
            api_base_url,
            data_dir,
            http_timeout,
            profile_refresh_interval,
        })
    }

    /// Build a configuration directly, for tests and embedders that do not
    /// use environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if `api_base_url` is not a valid HTTP(S) URL.
    pub fn new(
        api_base_url: &str,
        data_dir: impl Into<PathBuf>,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            api_base_url: validate_base_url("api_base_url", api_base_url)?,
            data_dir: data_dir.into(),
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
            profile_refresh_interval: Duration::from_secs(DEFAULT_PROFILE_REFRESH_SECS),
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse a seconds-valued environment variable with a default.
fn parse_secs(key: &str, default: u64) -> Result<u64, ConfigError> {
    match std::env::var(key) {
        Ok(value) => value
            .parse::<u64>()
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string())),
        Err(_) => Ok(default),
    }
}

/// Validate a base URL and normalize it (scheme check, no trailing slash).
fn validate_base_url(name: &str, value: &str) -> Result<String, ConfigError> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::InvalidEnvVar(name.to_string(), e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidEnvVar(
            name.to_string(),
            format!("unsupported scheme '{}'", url.scheme()),
        ));
    }

    Ok(value.trim_end_matches('/').to_string())
}
