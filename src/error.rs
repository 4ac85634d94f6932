//! Error types for madabank-net
//!
//! This module defines all error types used throughout the crate, using
//! `thiserror` for ergonomic error handling.
//!
//! Two enums exist:
//!
//! - [`ApiError`] -- everything a caller of the API client can observe.
//! - [`RefreshError`] -- why a single token refresh attempt failed. These
//!   never reach API callers directly; a failed refresh surfaces as
//!   [`ApiError::Unauthorized`].

use std::time::Duration;

use thiserror::Error;

/// Main error type for madabank-net operations
///
/// Public operations return [`Result`], which carries an `ApiError` inside
/// an `anyhow::Error`. Use `err.downcast_ref::<ApiError>()` to match on a
/// specific kind.
#[derive(Error, Debug)]
pub enum ApiError {
    /// The endpoint could not be turned into a valid URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Connectivity, DNS or TLS failure reaching the server
    #[error("Network error: {0}")]
    Transport(String),

    /// The server rejected the credential and no refresh could recover it
    #[error("Unauthorized. Please login again.")]
    Unauthorized,

    /// A successful response whose body does not match the expected shape
    #[error("Failed to decode response: {0}")]
    Decoding(String),

    /// Non-success status other than 401
    #[error("Server error ({status}): {}", message.as_deref().unwrap_or("Unknown error"))]
    Server {
        /// HTTP status code returned by the server
        status: u16,
        /// `message` field of the error body, when one was sent
        message: Option<String>,
    },

    /// 404 without an error body
    #[error("Resource not found")]
    NotFound,

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Credential store errors other than keyring failures
    #[error("Credential store error: {0}")]
    Credentials(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Keyring/credential storage errors
    #[error("Keyring error: {0}")]
    Keyring(#[from] keyring::Error),
}

/// Why a token refresh attempt failed.
///
/// Every variant leads to the same outcome for waiting callers (credentials
/// cleared, `DoNotRetry`); the distinction exists for logs and metrics.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RefreshError {
    /// No refresh token was stored, so no request was sent
    #[error("no refresh token available")]
    MissingRefreshToken,

    /// The refresh endpoint could not be reached
    #[error("refresh request failed: {0}")]
    Transport(String),

    /// The refresh endpoint answered with a non-success status
    #[error("refresh endpoint rejected the refresh token with status {status}")]
    Rejected {
        /// HTTP status code of the refresh response
        status: u16,
    },

    /// The refresh endpoint answered 2xx with an unexpected body
    #[error("failed to parse refresh response: {0}")]
    Decoding(String),

    /// No answer within the configured timeout
    #[error("refresh request timed out after {0:?}")]
    Timeout(Duration),

    /// The refresh task panicked before producing a result
    #[error("refresh task aborted: {0}")]
    Aborted(String),
}

impl RefreshError {
    /// Stable, low-cardinality label used for log fields and metric labels.
    pub fn reason(&self) -> &'static str {
        match self {
            RefreshError::MissingRefreshToken => "missing_refresh_token",
            RefreshError::Transport(_) => "transport",
            RefreshError::Rejected { .. } => "rejected",
            RefreshError::Decoding(_) => "decoding",
            RefreshError::Timeout(_) => "timeout",
            RefreshError::Aborted(_) => "aborted",
        }
    }
}

/// Result type alias for madabank-net operations
///
/// Uses `anyhow::Error` so that context can be attached while propagating;
/// the root cause is normally an [`ApiError`].
pub type Result<T> = anyhow::Result<T>;
