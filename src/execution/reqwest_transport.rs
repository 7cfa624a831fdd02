//! `reqwest` backed transport.

use super::transport::{HttpTransport, TransportRequest, TransportResponse};
use crate::cancel::CancellationToken;
use crate::error::HttpError;
use crate::types::{BodySource, ByteStream, RedirectPolicy};
use async_trait::async_trait;
use futures_util::TryStreamExt;

/// Default transport.
///
/// Method, URL, headers and body are sent as resolved. `RedirectPolicy` picks
/// between a following and a non-following client (`Error` additionally
/// rejects any 3xx). Cache, credentials, mode, referrer and integrity are
/// browser concerns and are not applied here.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    follow: reqwest::Client,
    no_follow: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self, HttpError> {
        let follow = reqwest::Client::builder()
            .build()
            .map_err(|e| HttpError::transport_with_source("Failed to build HTTP client", e))?;
        let no_follow = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| HttpError::transport_with_source("Failed to build HTTP client", e))?;
        Ok(Self { follow, no_follow })
    }

    /// Use a preconfigured client for followed redirects (proxy, TLS, ...).
    /// Non-following requests still use a default client.
    pub fn with_client(client: reqwest::Client) -> Result<Self, HttpError> {
        let mut transport = Self::new()?;
        transport.follow = client;
        Ok(transport)
    }

    fn client_for(&self, redirect: RedirectPolicy) -> &reqwest::Client {
        match redirect {
            RedirectPolicy::Follow => &self.follow,
            RedirectPolicy::Manual | RedirectPolicy::Error => &self.no_follow,
        }
    }
}

fn cancelled_error(cancel: &CancellationToken) -> HttpError {
    cancel
        .reason()
        .map(|r| r.to_error())
        .unwrap_or(HttpError::AbortError)
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn perform(
        &self,
        request: TransportRequest,
        cancel: CancellationToken,
    ) -> Result<TransportResponse, HttpError> {
        let TransportRequest {
            request_id,
            url,
            config,
        } = request;

        let mut builder = self
            .client_for(config.redirect)
            .request(config.method.clone(), url.clone())
            .headers(config.headers.clone());
        if let Some(body) = config.body.clone() {
            builder = builder.body(body);
        }

        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(cancelled_error(&cancel)),
            result = builder.send() => result.map_err(|e| {
                HttpError::transport_with_source(format!("Request to '{url}' failed"), e)
            })?,
        };

        let status = response.status();
        if config.redirect == RedirectPolicy::Error && status.is_redirection() {
            return Err(HttpError::transport(format!(
                "Redirect ({status}) not allowed by redirect policy 'error'"
            )));
        }

        tracing::debug!(
            target: crate::defaults::LOG_TARGET,
            request_id = %request_id,
            status = status.as_u16(),
            "reqwest response headers received"
        );

        let headers = response.headers().clone();
        let stream = response
            .bytes_stream()
            .map_err(|e| HttpError::transport_with_source("Failed to read response body", e));

        Ok(TransportResponse {
            status: status.as_u16(),
            status_text: status.canonical_reason().map(str::to_string),
            headers,
            body: BodySource::Stream(ByteStream::new(stream)),
        })
    }
}
