//! Unified error handling for the storefront client.
//!
//! Every fallible operation in this crate returns [`StoreError`]. The
//! variants split along how the UI must react: validation and business
//! failures carry user-facing text, network and server failures are
//! retryable, and an auth failure forces a logout.

use thiserror::Error;

/// Errors surfaced by the storefront client.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Bad input shape (quantity <= 0, missing ids). Resolved locally,
    /// never reaches the network.
    #[error("validation error: {0}")]
    Validation(String),

    /// HTTP transport failure (connect, timeout, body read).
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The API rejected the session credential (HTTP 401). Callers must
    /// treat the session as invalid.
    #[error("session invalid: {0}")]
    Auth(String),

    /// The API returned a server-side failure (HTTP 5xx).
    #[error("server error ({status}): {message}")]
    Server {
        /// HTTP status code.
        status: u16,
        /// Message from the response body, if any.
        message: String,
    },

    /// A business rule rejected the operation (e.g., "already in wishlist").
    /// No state was mutated.
    #[error("{0}")]
    Business(String),

    /// Local storage read/write failed.
    #[error("storage error: {0}")]
    Storage(#[from] std::io::Error),

    /// JSON (de)serialization failed.
    #[error("parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

impl StoreError {
    /// Whether this error means the session credential is no longer valid
    /// and the client must log out.
    #[must_use]
    pub const fn is_session_expired(&self) -> bool {
        matches!(self, Self::Auth(_))
    }

    /// Toast-ready message for the UI.
    ///
    /// Internal details (transport errors, body parse failures) are not
    /// exposed to the user; validation and business messages are shown
    /// verbatim.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(message) | Self::Business(message) => message.clone(),
            Self::Auth(_) => "Your session has expired. Please log in again.".to_string(),
            Self::Network(_) => {
                "Network error. Please check your connection and try again.".to_string()
            }
            Self::Server { .. } => {
                "Something went wrong on our end. Please try again.".to_string()
            }
            Self::Storage(_) | Self::Parse(_) => {
                "Something went wrong. Please try again.".to_string()
            }
        }
    }
}

/// Result type alias for `StoreError`.
pub type Result<T> = std::result::Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_display() {
        let err = StoreError::Business("already in wishlist".to_string());
        assert_eq!(err.to_string(), "already in wishlist");

        let err = StoreError::Validation("quantity must be at least 1".to_string());
        assert_eq!(err.to_string(), "validation error: quantity must be at least 1");

        let err = StoreError::Server {
            status: 500,
            message: "boom".to_string(),
        };
        assert_eq!(err.to_string(), "server error (500): boom");
    }

    #[test]
    fn test_is_session_expired() {
        assert!(StoreError::Auth("expired".to_string()).is_session_expired());
        assert!(!StoreError::Business("nope".to_string()).is_session_expired());
    }

    #[test]
    fn test_user_message_hides_internals() {
        let err = StoreError::Server {
            status: 502,
            message: "upstream connect error".to_string(),
        };
        assert!(!err.user_message().contains("upstream"));

        let err = StoreError::Business("already in wishlist".to_string());
        assert_eq!(err.user_message(), "already in wishlist");
    }
}
