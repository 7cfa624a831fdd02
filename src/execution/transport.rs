//! HTTP transport abstraction.
//!
//! The client resolves options, builds the URL and sets up cancellation; a
//! transport only performs the exchange. Tests and embedders can inject their
//! own implementation to observe the final request or return a synthetic
//! response without touching the network.

use crate::cancel::CancellationToken;
use crate::config::RequestConfig;
use crate::error::HttpError;
use crate::types::{BodySource, HeaderMap, HeaderValue};
use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, HeaderName};
use url::Url;

/// Everything a transport needs to perform one exchange.
#[derive(Debug, Clone)]
pub struct TransportRequest {
    pub request_id: String,
    pub url: Url,
    pub config: RequestConfig,
}

/// Status line, headers and a readable body.
#[derive(Debug)]
pub struct TransportResponse {
    pub status: u16,
    /// Reason phrase, when the transport knows it.
    pub status_text: Option<String>,
    pub headers: HeaderMap,
    pub body: BodySource,
}

impl TransportResponse {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            status_text: None,
            headers: HeaderMap::new(),
            body: BodySource::empty(),
        }
    }

    pub fn with_status_text(mut self, text: impl Into<String>) -> Self {
        self.status_text = Some(text.into());
        self
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn with_content_type(self, value: &'static str) -> Self {
        self.with_header(CONTENT_TYPE, HeaderValue::from_static(value))
    }

    pub fn with_body(mut self, body: impl Into<BodySource>) -> Self {
        self.body = body.into();
        self
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok())
    }
}

/// Performs a single network exchange.
///
/// Implementations should stop promptly once `cancel` fires and may return
/// the token's error (`cancel.reason()`) in that case; the client also races
/// the exchange against the token, so a transport that ignores it is still
/// abandoned on abort.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn perform(
        &self,
        request: TransportRequest,
        cancel: CancellationToken,
    ) -> Result<TransportResponse, HttpError>;
}
