//! Source error types
//!
//! Errors raised by history queries, live subscriptions and inserts
//! against the telemetry table.

use thiserror::Error;

/// Errors that can occur when talking to a reading source
#[derive(Error, Debug)]
pub enum SourceError {
    /// Table service could not be reached
    #[error("Table service unavailable")]
    Unavailable,

    /// Request timed out
    #[error("Request timeout")]
    Timeout,

    /// HTTP transport failure
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Table service answered with a non-success status
    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    /// Response body could not be decoded into readings
    #[error("Decode error: {0}")]
    Decode(String),

    /// Invalid source configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<serde_json::Error> for SourceError {
    fn from(err: serde_json::Error) -> Self {
        SourceError::Decode(err.to_string())
    }
}

impl SourceError {
    /// Classify a reqwest error the way callers care about it
    pub fn from_request(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            SourceError::Timeout
        } else if err.is_connect() {
            SourceError::Unavailable
        } else {
            SourceError::Request(err)
        }
    }
}

/// Result type alias for source operations
pub type SourceResult<T> = Result<T, SourceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SourceError::Api {
            status: 401,
            message: "Invalid API key".to_string(),
        };
        assert_eq!(err.to_string(), "API error 401: Invalid API key");
        assert_eq!(SourceError::Timeout.to_string(), "Request timeout");
    }

    #[test]
    fn test_json_error_conversion() {
        let json_err = serde_json::from_str::<Vec<u8>>("not json").unwrap_err();
        let err: SourceError = json_err.into();
        assert!(matches!(err, SourceError::Decode(_)));
    }
}
