//! Error types

use thiserror::Error;

/// Quote source errors
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("invalid source configuration: {0}")]
    InvalidConfig(String),

    #[error("request failed: {0}")]
    Request(String),

    #[error("fetch timed out")]
    Timeout,

    #[error("unexpected response status: {0}")]
    BadStatus(u16),

    #[error("price not found in response for {symbol}")]
    PriceNotFound { symbol: String },

    #[error("upstream session closed")]
    SessionClosed,
}

/// Distribution hub errors
#[derive(Debug, Error)]
pub enum HubError {
    #[error("hub command queue full")]
    QueueFull,

    #[error("hub is shut down")]
    Closed,
}

/// Result type aliases
pub type SourceResult<T> = Result<T, SourceError>;
pub type HubResult<T> = Result<T, HubError>;
