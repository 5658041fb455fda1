//! Error types for client construction

use thiserror::Error;

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, KxaClientError>;

/// Errors that can occur while building a client
///
/// Errors of a running stream are [`StreamError`](crate::StreamError).
#[derive(Error, Debug)]
pub enum KxaClientError {
    /// HTTP client could not be built
    #[error("HTTP client error: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Invalid URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// URL parsed but cannot serve as a base address
    #[error("Invalid base URL: {0}")]
    InvalidBaseUrl(String),
}
