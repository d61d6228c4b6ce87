//! Error types for Strata

use thiserror::Error;

/// Result type alias for Strata operations
pub type Result<T> = std::result::Result<T, StrataError>;

/// Strata error types
///
/// Read paths (`get`/`has`) never surface these; providers degrade to a miss
/// instead. Write paths (`set`/`delete`/`clear`) propagate them.
#[derive(Error, Debug)]
pub enum StrataError {
    /// HTTP request error
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Invalid URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Backing service returned an error
    #[error("Server error: {0}")]
    ServerError(String),

    /// Response from the backing service did not match the expected shape
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}
