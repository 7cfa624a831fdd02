//! Request configuration
//!
//! [`RequestOptions`] is one option layer; [`resolver::resolve`] merges the
//! library, instance and call layers into the effective [`RequestConfig`]
//! that the transport receives.

pub mod options;
pub mod resolver;

pub use options::RequestOptions;
pub use resolver::{resolve, resolve_layers};

use crate::cancel::CancellationToken;
use crate::types::{
    CachePolicy, CredentialsPolicy, HeaderMap, Method, ParameterMap, RedirectPolicy,
    ReferrerPolicy, RequestMode, Timeout,
};
use bytes::Bytes;

/// The merged, call-ready option set.
#[derive(Debug, Clone)]
pub struct RequestConfig {
    pub method: Method,
    pub headers: HeaderMap,
    /// Query parameters; already folded into the target URL by the client.
    pub query: ParameterMap,
    /// Wire-ready body. Always `None` for methods that carry no body.
    pub body: Option<Bytes>,
    pub cache: CachePolicy,
    pub credentials: CredentialsPolicy,
    pub mode: RequestMode,
    pub redirect: RedirectPolicy,
    pub referrer: String,
    pub referrer_policy: ReferrerPolicy,
    pub integrity: Option<String>,
    pub keepalive: bool,
    pub timeout: Timeout,
    /// Before the exchange this is the caller's token (if any); once the
    /// call is configured it is the call's own derived token.
    pub signal: Option<CancellationToken>,
    pub global: bool,
}

impl RequestConfig {
    pub fn header_str(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header_str(reqwest::header::CONTENT_TYPE.as_str())
    }
}
