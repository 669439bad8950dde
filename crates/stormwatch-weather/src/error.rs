//! Gateway error types.

use thiserror::Error;

/// Why a forecast could not be fetched.
///
/// Every variant means the same thing to callers: no usable data this time.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GatewayError {
    /// The request exceeded the configured timeout.
    #[error("Request timed out")]
    Timeout,

    /// Connection or protocol failure.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The provider answered with a non-success status.
    #[error("Provider returned status {0}")]
    Status(u16),

    /// The body was not a forecast document.
    #[error("Malformed response: {0}")]
    Malformed(String),

    /// The HTTP client could not be built or the URL is invalid.
    #[error("Client error: {0}")]
    Client(String),
}

impl From<reqwest::Error> for GatewayError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            GatewayError::Timeout
        } else if e.is_decode() {
            GatewayError::Malformed(e.without_url().to_string())
        } else if let Some(status) = e.status() {
            GatewayError::Status(status.as_u16())
        } else {
            // Strip the URL: it carries the API key.
            GatewayError::Transport(e.without_url().to_string())
        }
    }
}

/// Result type for gateway operations.
pub type Result<T> = std::result::Result<T, GatewayError>;
