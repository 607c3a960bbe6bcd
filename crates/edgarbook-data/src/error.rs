//! Error types for data operations.

use thiserror::Error;

/// Result type for data operations.
pub type Result<T> = std::result::Result<T, DataError>;

/// Errors that can occur while fetching, caching or parsing EDGAR data.
#[derive(Debug, Error)]
pub enum DataError {
    /// Network error
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Non-success HTTP status
    #[error("HTTP {status} for {url}")]
    Http {
        /// Status code returned
        status: u16,
        /// Requested URL
        url: String,
    },

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Data parsing error
    #[error("Data parsing error: {0}")]
    Parse(String),

    /// Invalid configuration value
    #[error("Invalid configuration {key}: {reason}")]
    Config {
        /// Setting that failed to parse
        key: String,
        /// Why it was rejected
        reason: String,
    },

    /// Invalid symbol or identifier
    #[error("Invalid symbol: {0}")]
    InvalidSymbol(String),

    /// CIK not found for ticker
    #[error("CIK not found for ticker: {0}")]
    CikNotFound(String),

    /// Filing not found
    #[error("Filing not found: {0}")]
    FilingNotFound(String),

    /// Unknown statement name
    #[error("Unknown statement: {0}")]
    UnknownStatement(String),
}
