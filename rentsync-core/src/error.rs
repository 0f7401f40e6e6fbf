//! Error types for rentsync.

use thiserror::Error;

/// Errors that can occur in rentsync operations.
#[derive(Error, Debug)]
pub enum RentSyncError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Data store error: {0}")]
    Store(String),

    #[error("Data store request failed: {0}")]
    StoreHttp(#[from] reqwest::Error),

    #[error("Feed fetch failed: {0}")]
    FeedFetch(String),

    #[error("ICS parse error: {0}")]
    IcsParse(String),

    #[error("Push delivery failed: {0}")]
    Push(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{0}")]
    InvalidRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Forbidden(String),

    /// Requested month lies outside the owner's plan window.
    #[error("Calendar month is outside the allowed range of {limit} months")]
    MonthOutOfRange { limit: u32, is_paid: bool },
}

impl RentSyncError {
    /// Whether the error rejects a single request rather than signalling an
    /// infrastructure failure.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Self::InvalidRequest(_)
                | Self::NotFound(_)
                | Self::Forbidden(_)
                | Self::MonthOutOfRange { .. }
        )
    }
}

/// Result type alias for rentsync operations.
pub type RentSyncResult<T> = Result<T, RentSyncError>;
