use thiserror::Error;

use crate::http::HttpError;

/// Strict-parse failures for domain values and wire rows.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("'{value}' is not a valid yyyymmdd trading date")]
    InvalidDeven { value: String },

    #[error("'{value}' is not a valid instrument code")]
    InvalidInsCode { value: String },

    #[error("row has {got} fields, expected {expected}")]
    FieldCount { expected: usize, got: usize },

    #[error("field '{field}' holds non-numeric value '{value}'")]
    NumericField { field: &'static str, value: String },

    #[error("share counts must be positive")]
    NonPositiveShares,
}

/// Remote feed failures. Both variants are retryable at the chunk level;
/// the synchronizer treats them identically.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("transport error: {0}")]
    Transport(#[from] HttpError),

    #[error("protocol error: {0}")]
    Protocol(String),
}

impl FeedError {
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol(message.into())
    }
}

impl From<ValidationError> for FeedError {
    fn from(error: ValidationError) -> Self {
        Self::Protocol(error.to_string())
    }
}

/// Fatal synchronization failures. Per-chunk trouble is reported through
/// [`crate::sync::SyncOutcome`] instead and never aborts a run.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("last possible deven unavailable: {0}")]
    OracleUnavailable(#[from] FeedError),
}

/// Archive persistence failures, surfaced through the series-store trait.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("archive io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("corrupt archive record: {0}")]
    Corrupt(String),
}
