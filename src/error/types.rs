//! Core error types.

use crate::types::{ResponseBody, ResponseStatus};
use std::time::Duration;
use thiserror::Error;

/// Boxed error used as the underlying cause of wrapped failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Every failure a call can run into before, during or after the exchange.
#[derive(Error, Debug)]
pub enum HttpError {
    /// A caller supplied value is out of range (e.g. a negative timeout).
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The base address or an absolute override could not be parsed.
    #[error("Invalid address '{address}': {reason}")]
    InvalidAddress { address: String, reason: String },

    /// The outgoing body could not be serialized.
    #[error("Encoding error: {0}")]
    EncodingError(String),

    /// The incoming body could not be parsed.
    #[error("Decoding error: {message}")]
    DecodingError {
        message: String,
        #[source]
        source: BoxError,
    },

    /// The transport itself failed (connection refused, reset, ...).
    #[error("Transport failure: {message}")]
    TransportFailure {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    /// The exchange completed but the server answered with a non-success status.
    #[error("Response status error: {status}")]
    ResponseStatusError { status: ResponseStatus },

    /// The call was aborted by its caller.
    #[error("The request was aborted")]
    AbortError,

    /// The call's own timer fired before the exchange settled.
    #[error("The request timed out after {} ms", .after.as_millis())]
    TimeoutError { after: Duration },
}

/// Coarse discriminant of [`HttpError`], handy for matching on a borrowed error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidArgument,
    InvalidAddress,
    Encoding,
    Decoding,
    Transport,
    ResponseStatus,
    Abort,
    Timeout,
}

impl HttpError {
    pub fn decoding(
        message: impl Into<String>,
        source: impl Into<BoxError>,
    ) -> Self {
        Self::DecodingError {
            message: message.into(),
            source: source.into(),
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::TransportFailure {
            message: message.into(),
            source: None,
        }
    }

    pub fn transport_with_source(
        message: impl Into<String>,
        source: impl Into<BoxError>,
    ) -> Self {
        Self::TransportFailure {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    pub fn invalid_address(address: impl Into<String>, reason: impl ToString) -> Self {
        Self::InvalidAddress {
            address: address.into(),
            reason: reason.to_string(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidArgument(_) => ErrorKind::InvalidArgument,
            Self::InvalidAddress { .. } => ErrorKind::InvalidAddress,
            Self::EncodingError(_) => ErrorKind::Encoding,
            Self::DecodingError { .. } => ErrorKind::Decoding,
            Self::TransportFailure { .. } => ErrorKind::Transport,
            Self::ResponseStatusError { .. } => ErrorKind::ResponseStatus,
            Self::AbortError => ErrorKind::Abort,
            Self::TimeoutError { .. } => ErrorKind::Timeout,
        }
    }

    /// Status used when the error is normalized into a [`RequestError`].
    ///
    /// Abort and timeout get fixed sentinel statuses so callers can branch on
    /// the status code alone.
    pub fn status(&self) -> Option<ResponseStatus> {
        match self {
            Self::ResponseStatusError { status } => Some(status.clone()),
            Self::AbortError => Some(crate::defaults::status::aborted()),
            Self::TimeoutError { .. } => Some(crate::defaults::status::timed_out()),
            _ => None,
        }
    }
}

/// The single error shape every call resolves to on failure.
#[derive(Error, Debug)]
#[error("{message}")]
pub struct RequestError {
    message: String,
    url: Option<url::Url>,
    #[source]
    cause: HttpError,
    status: Option<ResponseStatus>,
    entity: Option<ResponseBody>,
}

impl RequestError {
    /// Normalize `cause` for a call that targeted `url`.
    pub fn new(url: Option<url::Url>, cause: HttpError) -> Self {
        let message = match &url {
            Some(url) => format!("An error has occurred with your request to: '{url}'"),
            None => format!("An error has occurred with your request: {cause}"),
        };
        Self {
            message,
            url,
            status: cause.status(),
            cause,
            entity: None,
        }
    }

    /// Attach the (best-effort) decoded error entity returned by the server.
    pub fn with_entity(mut self, entity: Option<ResponseBody>) -> Self {
        self.entity = entity;
        self
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn url(&self) -> Option<&url::Url> {
        self.url.as_ref()
    }

    pub fn cause(&self) -> &HttpError {
        &self.cause
    }

    pub fn into_cause(self) -> HttpError {
        self.cause
    }

    pub fn kind(&self) -> ErrorKind {
        self.cause.kind()
    }

    pub fn status(&self) -> Option<&ResponseStatus> {
        self.status.as_ref()
    }

    pub fn status_code(&self) -> Option<u16> {
        self.status.as_ref().map(|s| s.code())
    }

    pub fn status_text(&self) -> Option<&str> {
        self.status.as_ref().map(|s| s.text())
    }

    pub fn entity(&self) -> Option<&ResponseBody> {
        self.entity.as_ref()
    }

    pub fn take_entity(&mut self) -> Option<ResponseBody> {
        self.entity.take()
    }

    pub fn is_abort(&self) -> bool {
        self.kind() == ErrorKind::Abort
    }

    pub fn is_timeout(&self) -> bool {
        self.kind() == ErrorKind::Timeout
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn abort_and_timeout_get_sentinel_statuses() {
        let aborted = RequestError::new(None, HttpError::AbortError);
        assert_eq!(aborted.status_code(), Some(499));
        assert!(aborted.is_abort());

        let timed_out = RequestError::new(
            None,
            HttpError::TimeoutError {
                after: Duration::from_millis(50),
            },
        );
        assert_eq!(timed_out.status_code(), Some(504));
        assert_eq!(timed_out.status_text(), Some("Request Timeout"));
        assert!(timed_out.is_timeout());
    }

    #[test]
    fn transport_failure_has_no_status_but_keeps_its_cause() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let url = url::Url::parse("https://api.example.com/v1/users").unwrap();
        let err = RequestError::new(
            Some(url),
            HttpError::transport_with_source("connect failed", io),
        );

        assert_eq!(err.status_code(), None);
        assert_eq!(
            err.to_string(),
            "An error has occurred with your request to: 'https://api.example.com/v1/users'"
        );
        let cause = err.source().expect("cause");
        assert!(cause.to_string().contains("connect failed"));
        assert!(cause.source().is_some());
    }

    #[test]
    fn status_error_exposes_code_and_text() {
        let err = RequestError::new(
            None,
            HttpError::ResponseStatusError {
                status: ResponseStatus::new(404, "Not Found"),
            },
        );
        assert_eq!(err.kind(), ErrorKind::ResponseStatus);
        assert_eq!(err.status_code(), Some(404));
        assert_eq!(err.status_text(), Some("Not Found"));
    }
}
