//! Error types for the connector domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant.

use thiserror::Error;

/// The top-level error type for all connector operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Client input ---
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("No enabled route found for dataType={data_type} and characteristic={characteristic}")]
    RouteNotFound {
        data_type: String,
        characteristic: String,
    },

    #[error("Unsupported provider: {0}")]
    UnsupportedProvider(String),

    // --- Provider errors ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    // --- Storage errors ---
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Whether the caller sent something we can never serve (bad input, unknown
    /// route, unknown provider). Everything else is a server-side fault.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Error::Validation(_) | Error::RouteNotFound { .. } | Error::UnsupportedProvider(_)
        )
    }
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),
}

impl ProviderError {
    /// Missing configuration cannot be fixed by calling again.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, ProviderError::NotConfigured(_))
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),
}
