//! Error types for rate source operations.

use thiserror::Error;

/// Errors that can occur while fetching rates.
///
/// Every variant means the source is unavailable for this cycle; the caller
/// skips the cycle and tries again on the next one.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Rates request failed: {0}")]
    Request(String),

    #[error("Rates request timed out: {0}")]
    Timeout(String),

    #[error("Rates API returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Invalid rates payload: {0}")]
    Payload(String),

    #[error("Invalid rates endpoint: {0}")]
    InvalidEndpoint(String),
}

impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            SourceError::Timeout(err.to_string())
        } else if err.is_decode() {
            SourceError::Payload(err.to_string())
        } else {
            SourceError::Request(err.to_string())
        }
    }
}

impl From<serde_json::Error> for SourceError {
    fn from(err: serde_json::Error) -> Self {
        SourceError::Payload(err.to_string())
    }
}

impl From<url::ParseError> for SourceError {
    fn from(err: url::ParseError) -> Self {
        SourceError::InvalidEndpoint(err.to_string())
    }
}

impl From<rates_core::RateError> for SourceError {
    fn from(err: rates_core::RateError) -> Self {
        SourceError::Payload(err.to_string())
    }
}

impl SourceError {
    /// Returns true if the error is a configuration mistake, not a source outage.
    pub fn is_permanent(&self) -> bool {
        matches!(self, SourceError::InvalidEndpoint(_))
            || matches!(self, SourceError::Status { status: 401 | 403, .. })
    }
}
