//! Type Conversions for HttpError
//!
//! From implementations for common error types.

use super::types::HttpError;

impl From<serde_json::Error> for HttpError {
    fn from(err: serde_json::Error) -> Self {
        Self::EncodingError(err.to_string())
    }
}

impl From<url::ParseError> for HttpError {
    fn from(err: url::ParseError) -> Self {
        Self::InvalidAddress {
            address: String::new(),
            reason: err.to_string(),
        }
    }
}

impl From<reqwest::header::InvalidHeaderName> for HttpError {
    fn from(err: reqwest::header::InvalidHeaderName) -> Self {
        Self::InvalidArgument(format!("Invalid header name: {err}"))
    }
}

impl From<reqwest::header::InvalidHeaderValue> for HttpError {
    fn from(err: reqwest::header::InvalidHeaderValue) -> Self {
        Self::InvalidArgument(format!("Invalid header value: {err}"))
    }
}
