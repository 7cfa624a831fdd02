//! One layer of request options.

use crate::cancel::CancellationToken;
use crate::defaults;
use crate::error::HttpError;
use crate::types::{
    CachePolicy, CredentialsPolicy, HeaderMap, HeaderName, HeaderValue, Method, ParameterMap,
    RedirectPolicy, ReferrerPolicy, RequestBody, RequestMode, Timeout,
};
use reqwest::header::{ACCEPT, CONTENT_TYPE};

/// Request options for a single layer (library, instance, call).
///
/// Every field is optional; an unset field defers to the layer below.
/// Headers and query parameters merge key by key across layers, the body is
/// taken from the most specific layer that has one.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub method: Option<Method>,
    pub headers: HeaderMap,
    pub query: ParameterMap,
    pub body: Option<RequestBody>,
    pub cache: Option<CachePolicy>,
    pub credentials: Option<CredentialsPolicy>,
    pub mode: Option<RequestMode>,
    pub redirect: Option<RedirectPolicy>,
    pub referrer: Option<String>,
    pub referrer_policy: Option<ReferrerPolicy>,
    pub integrity: Option<String>,
    pub keepalive: Option<bool>,
    pub timeout: Option<Timeout>,
    /// External token; aborting it aborts the call.
    pub signal: Option<CancellationToken>,
    /// Whether lifecycle events also reach process-wide subscribers.
    pub global: Option<bool>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// The lowest layer: library defaults.
    pub fn library_defaults() -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(defaults::request::ACCEPT));
        Self {
            method: Some(Method::GET),
            headers,
            query: ParameterMap::new(),
            body: None,
            cache: Some(CachePolicy::NoStore),
            credentials: Some(CredentialsPolicy::SameOrigin),
            mode: Some(RequestMode::Cors),
            redirect: Some(RedirectPolicy::Follow),
            referrer: Some(defaults::request::REFERRER.to_string()),
            referrer_policy: Some(ReferrerPolicy::StrictOriginWhenCrossOrigin),
            integrity: None,
            keepalive: Some(false),
            timeout: Some(defaults::default_timeout()),
            signal: None,
            global: Some(true),
        }
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    /// Set a header, replacing values of the same name in this layer.
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Add a header value without dropping earlier ones in this layer.
    pub fn append_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    /// Like [`header`](Self::header) but validates strings.
    pub fn try_header(self, name: &str, value: &str) -> Result<Self, HttpError> {
        let name = HeaderName::from_bytes(name.as_bytes())?;
        let value = HeaderValue::from_str(value)?;
        Ok(self.header(name, value))
    }

    pub fn headers(mut self, headers: HeaderMap) -> Self {
        for key in headers.keys() {
            self.headers.remove(key);
        }
        for (key, value) in headers.iter() {
            self.headers.append(key.clone(), value.clone());
        }
        self
    }

    pub fn content_type(self, value: &'static str) -> Self {
        self.header(CONTENT_TYPE, HeaderValue::from_static(value))
    }

    pub fn accept(self, value: &'static str) -> Self {
        self.header(ACCEPT, HeaderValue::from_static(value))
    }

    /// Set a query parameter (replacing earlier values in this layer).
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.set(key, value);
        self
    }

    pub fn append_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.append(key, value);
        self
    }

    pub fn query_params(mut self, params: ParameterMap) -> Self {
        self.query.set_all(&params);
        self
    }

    pub fn body(mut self, body: impl Into<RequestBody>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn cache(mut self, cache: CachePolicy) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn credentials(mut self, credentials: CredentialsPolicy) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub fn mode(mut self, mode: RequestMode) -> Self {
        self.mode = Some(mode);
        self
    }

    pub fn redirect(mut self, redirect: RedirectPolicy) -> Self {
        self.redirect = Some(redirect);
        self
    }

    pub fn referrer(mut self, referrer: impl Into<String>) -> Self {
        self.referrer = Some(referrer.into());
        self
    }

    pub fn referrer_policy(mut self, policy: ReferrerPolicy) -> Self {
        self.referrer_policy = Some(policy);
        self
    }

    pub fn integrity(mut self, integrity: impl Into<String>) -> Self {
        self.integrity = Some(integrity.into());
        self
    }

    pub fn keepalive(mut self, keepalive: bool) -> Self {
        self.keepalive = Some(keepalive);
        self
    }

    pub fn timeout(mut self, timeout: impl Into<Timeout>) -> Self {
        self.timeout = Some(timeout.into());
        self
    }

    /// Timeout in milliseconds. Negative values are rejected when the call
    /// is resolved.
    pub fn timeout_ms(self, millis: i64) -> Self {
        self.timeout(Timeout::Millis(millis))
    }

    pub fn no_timeout(self) -> Self {
        self.timeout(Timeout::Never)
    }

    pub fn signal(mut self, token: CancellationToken) -> Self {
        self.signal = Some(token);
        self
    }

    pub fn global(mut self, global: bool) -> Self {
        self.global = Some(global);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn library_defaults_fill_every_scalar() {
        let d = RequestOptions::library_defaults();
        assert_eq!(d.method, Some(Method::GET));
        assert_eq!(d.headers.get(ACCEPT).unwrap(), "application/json");
        assert!(d.headers.get(CONTENT_TYPE).is_none());
        assert_eq!(d.cache, Some(CachePolicy::NoStore));
        assert_eq!(d.global, Some(true));
        assert!(d.timeout.is_some());
    }

    #[test]
    fn try_header_validates() {
        assert!(RequestOptions::new().try_header("x-trace", "abc").is_ok());
        assert!(matches!(
            RequestOptions::new().try_header("bad header", "v"),
            Err(HttpError::InvalidArgument(_))
        ));
        assert!(matches!(
            RequestOptions::new().try_header("x-ok", "line\nbreak"),
            Err(HttpError::InvalidArgument(_))
        ));
    }

    #[test]
    fn headers_replace_by_key_within_a_layer() {
        let mut extra = HeaderMap::new();
        extra.append("x-tag", HeaderValue::from_static("b"));
        extra.append("x-tag", HeaderValue::from_static("c"));
        let opts = RequestOptions::new()
            .append_header(HeaderName::from_static("x-tag"), HeaderValue::from_static("a"))
            .headers(extra);
        let values: Vec<_> = opts.headers.get_all("x-tag").iter().collect();
        assert_eq!(values, ["b", "c"]);
    }
}
