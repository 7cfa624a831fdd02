//! HTTP client
//!
//! [`HttpClient`] runs every call through the same sequence: resolve options,
//! build the address, derive and register a cancellation token, publish
//! `Configured`, perform the exchange, decode, then publish `Success` or
//! `Error` followed by the completion bookkeeping.
//!
//! ```rust,ignore
//! use courier::prelude::*;
//!
//! let client = HttpClient::builder("https://api.example.com/v1/").build()?;
//! let user: User = client
//!     .get_json("/users/1", RequestOptions::new().query("expand", "roles"))
//!     .await?;
//! ```

use crate::cancel::CancellationToken;
use crate::config::{RequestConfig, RequestOptions, resolve_layers};
use crate::defaults;
use crate::encoding::{Decoder, DecoderRegistry, HtmlDocument, XmlDocument};
use crate::error::{HttpError, RequestError};
use crate::events::{EventBus, EventKind, RequestEvent, SubscriptionHandle, dispatch};
use crate::execution::{HttpTransport, ReqwestTransport, TransportRequest};
use crate::hub::Hub;
use crate::types::{
    Blob, ByteStream, HeaderMap, Method, RequestBody, ResponseBody, ResponseStatus, media_type,
};
use crate::utils::url::{build_address, parse_base};
use bytes::Bytes;
use serde::de::DeserializeOwned;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use url::Url;

/// A settled, successful exchange.
#[derive(Debug)]
pub struct Response {
    pub status: ResponseStatus,
    pub headers: HeaderMap,
    pub body: ResponseBody,
}

/// Fresh id used to correlate log lines and events of one call.
pub fn generate_request_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Per-verb overrides layered above the call's own options.
#[derive(Default)]
struct Verb {
    method: Option<Method>,
    accept: Option<&'static str>,
    decoder: Option<Decoder>,
}

impl Verb {
    fn method(method: Method) -> Self {
        Self {
            method: Some(method),
            ..Self::default()
        }
    }

    fn accessor(accept: &'static str, decoder: Decoder) -> Self {
        Self {
            method: Some(Method::GET),
            accept: Some(accept),
            decoder: Some(decoder),
        }
    }

    fn layer(&self) -> RequestOptions {
        let mut layer = RequestOptions::new();
        layer.method = self.method.clone();
        if let Some(accept) = self.accept {
            layer = layer.accept(accept);
        }
        layer
    }
}

/// A failed exchange plus whatever entity could be decoded from it.
struct Failure {
    error: HttpError,
    entity: Option<ResponseBody>,
}

impl From<HttpError> for Failure {
    fn from(error: HttpError) -> Self {
        Self {
            error,
            entity: None,
        }
    }
}

/// Keeps a token in the hub registry for the duration of a call. If the
/// call future is dropped mid-flight the token is removed and its timer
/// cleared.
struct Registration<'a> {
    hub: &'a Hub,
    token: CancellationToken,
    settled: bool,
}

impl<'a> Registration<'a> {
    fn new(hub: &'a Hub, token: &CancellationToken) -> Self {
        hub.track(token);
        Self {
            hub,
            token: token.clone(),
            settled: false,
        }
    }

    fn settle(mut self) {
        self.settled = true;
    }
}

impl Drop for Registration<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.token.clear_timeout();
            self.token.detach();
            self.hub.untrack(&self.token);
        }
    }
}

fn abort_error(token: &CancellationToken) -> HttpError {
    token
        .reason()
        .map(|r| r.to_error())
        .unwrap_or(HttpError::AbortError)
}

struct ClientInner {
    base: Url,
    options: RequestOptions,
    transport: Arc<dyn HttpTransport>,
    hub: Arc<Hub>,
    events: EventBus,
    decoders: DecoderRegistry,
}

/// HTTP client bound to a base address.
///
/// Cheap to clone; clones share instance options, listeners and transport.
#[derive(Clone)]
pub struct HttpClient {
    inner: Arc<ClientInner>,
}

impl fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpClient")
            .field("base", &self.inner.base.as_str())
            .field("listeners", &self.inner.events.len())
            .finish()
    }
}

impl HttpClient {
    pub fn builder(base: impl Into<String>) -> HttpClientBuilder {
        HttpClientBuilder::new(base)
    }

    /// Client with the default transport and the shared hub.
    pub fn new(base: impl Into<String>) -> Result<Self, HttpError> {
        Self::builder(base).build()
    }

    pub fn base_url(&self) -> &Url {
        &self.inner.base
    }

    /// Instance-level option layer.
    pub fn instance_options(&self) -> &RequestOptions {
        &self.inner.options
    }

    pub fn hub(&self) -> &Arc<Hub> {
        &self.inner.hub
    }

    /// Subscribe to this client's events only.
    pub fn register<F>(&self, kind: EventKind, listener: F) -> SubscriptionHandle
    where
        F: Fn(&RequestEvent<'_>) + Send + Sync + 'static,
    {
        self.inner.events.subscribe(kind, listener)
    }

    pub fn register_all<F>(&self, listener: F) -> SubscriptionHandle
    where
        F: Fn(&RequestEvent<'_>) + Send + Sync + 'static,
    {
        self.inner.events.subscribe_all(listener)
    }

    pub fn unregister(&self, handle: SubscriptionHandle) -> bool {
        self.inner.events.unsubscribe(handle)
    }

    /// Abort every call in flight on this client's hub.
    pub fn abort_all(&self) -> usize {
        self.inner.hub.abort_all()
    }

    /// Generic call: the method comes from `options` (GET by default) and the
    /// whole response is returned.
    pub async fn request(
        &self,
        path: &str,
        options: RequestOptions,
    ) -> Result<Response, RequestError> {
        let (response, ()) = self.execute(path, options, Verb::default(), |_| Ok(())).await?;
        Ok(response)
    }

    async fn body_of(
        &self,
        path: &str,
        options: RequestOptions,
        verb: Verb,
    ) -> Result<ResponseBody, RequestError> {
        let (response, ()) = self.execute(path, options, verb, |_| Ok(())).await?;
        Ok(response.body)
    }

    pub async fn get(
        &self,
        path: &str,
        options: RequestOptions,
    ) -> Result<ResponseBody, RequestError> {
        self.body_of(path, options, Verb::method(Method::GET)).await
    }

    pub async fn post(
        &self,
        path: &str,
        body: impl Into<RequestBody>,
        options: RequestOptions,
    ) -> Result<ResponseBody, RequestError> {
        let options = options.body(body);
        self.body_of(path, options, Verb::method(Method::POST)).await
    }

    /// PUT; the body, if any, comes from `options`.
    pub async fn put(
        &self,
        path: &str,
        options: RequestOptions,
    ) -> Result<ResponseBody, RequestError> {
        self.body_of(path, options, Verb::method(Method::PUT)).await
    }

    pub async fn patch(
        &self,
        path: &str,
        options: RequestOptions,
    ) -> Result<ResponseBody, RequestError> {
        self.body_of(path, options, Verb::method(Method::PATCH)).await
    }

    pub async fn delete(
        &self,
        path: &str,
        options: RequestOptions,
    ) -> Result<ResponseBody, RequestError> {
        self.body_of(path, options, Verb::method(Method::DELETE)).await
    }

    /// HEAD; the body is always empty, so the whole response is returned.
    pub async fn head(&self, path: &str, options: RequestOptions) -> Result<Response, RequestError> {
        let (response, ()) = self
            .execute(path, options, Verb::method(Method::HEAD), |_| Ok(()))
            .await?;
        Ok(response)
    }

    /// OPTIONS; returns the methods listed in the `Allow` header.
    pub async fn options(
        &self,
        path: &str,
        options: RequestOptions,
    ) -> Result<Vec<Method>, RequestError> {
        let (response, ()) = self
            .execute(path, options, Verb::method(Method::OPTIONS), |_| Ok(()))
            .await?;
        Ok(parse_allow(&response.headers))
    }

    /// GET and deserialize a JSON body. A body that does not fit `T` fails
    /// the call with a decoding error.
    pub async fn get_json<T>(&self, path: &str, options: RequestOptions) -> Result<T, RequestError>
    where
        T: DeserializeOwned + Send,
    {
        let verb = Verb::accessor(media_type::JSON, Decoder::Json);
        let (_, value) = self
            .execute(path, options, verb, |response| {
                let value = match &response.body {
                    ResponseBody::Json(value) => T::deserialize(value),
                    _ => T::deserialize(&serde_json::Value::Null),
                };
                value.map_err(|e| HttpError::decoding("JSON body does not match the expected type", e))
            })
            .await?;
        Ok(value)
    }

    pub async fn get_xml(
        &self,
        path: &str,
        options: RequestOptions,
    ) -> Result<XmlDocument, RequestError> {
        let verb = Verb::accessor(media_type::XML, Decoder::Xml);
        let (_, doc) = self
            .execute(path, options, verb, |response| match &response.body {
                ResponseBody::Xml(doc) => Ok(doc.clone()),
                _ => Err(HttpError::decoding(
                    "Expected an XML document",
                    "the response has no body",
                )),
            })
            .await?;
        Ok(doc)
    }

    pub async fn get_html(
        &self,
        path: &str,
        options: RequestOptions,
    ) -> Result<HtmlDocument, RequestError> {
        let verb = Verb::accessor(media_type::HTML, Decoder::Html);
        let body = self.body_of(path, options, verb).await?;
        Ok(body.into_html().unwrap_or_else(|| HtmlDocument::document("")))
    }

    /// GET an HTML fragment, optionally narrowed to the elements matching
    /// `selector`.
    pub async fn get_html_fragment(
        &self,
        path: &str,
        selector: Option<&str>,
        options: RequestOptions,
    ) -> Result<HtmlDocument, RequestError> {
        let verb = Verb::accessor(media_type::HTML, Decoder::HtmlFragment);
        let selector = selector.map(str::to_string);
        let (_, fragment) = self
            .execute(path, options, verb, move |response| {
                let doc = match &response.body {
                    ResponseBody::Html(doc) => doc.clone(),
                    _ => HtmlDocument::fragment(""),
                };
                match selector {
                    Some(css) => Ok(HtmlDocument::fragment(doc.select(&css)?.concat())),
                    None => Ok(doc),
                }
            })
            .await?;
        Ok(fragment)
    }

    pub async fn get_text(&self, path: &str, options: RequestOptions) -> Result<String, RequestError> {
        let verb = Verb::accessor(media_type::TEXT, Decoder::Text);
        let body = self.body_of(path, options, verb).await?;
        Ok(body.into_text().unwrap_or_default())
    }

    pub async fn get_blob(&self, path: &str, options: RequestOptions) -> Result<Blob, RequestError> {
        let verb = Verb::accessor(media_type::BIN, Decoder::Blob);
        let body = self.body_of(path, options, verb).await?;
        Ok(body.into_blob().unwrap_or(Blob {
            bytes: Bytes::new(),
            content_type: None,
        }))
    }

    pub async fn get_buffer(&self, path: &str, options: RequestOptions) -> Result<Bytes, RequestError> {
        let verb = Verb::accessor(media_type::BIN, Decoder::Buffer);
        let body = self.body_of(path, options, verb).await?;
        Ok(body.into_bytes().unwrap_or_default())
    }

    /// GET the raw body as a stream. The stream is not covered by the call's
    /// timeout once returned.
    pub async fn get_stream(
        &self,
        path: &str,
        options: RequestOptions,
    ) -> Result<ByteStream, RequestError> {
        let verb = Verb::accessor(media_type::BIN, Decoder::Stream);
        let body = self.body_of(path, options, verb).await?;
        Ok(body
            .into_stream()
            .unwrap_or_else(|| ByteStream::once(Bytes::new())))
    }

    fn publish(&self, global: bool, event: &RequestEvent<'_>) {
        dispatch(&self.inner.events, &self.inner.hub, global, event);
    }

    /// Failure before the token was registered: `Error` only.
    fn fail_early(
        &self,
        request_id: &str,
        global: bool,
        url: Option<Url>,
        cause: HttpError,
    ) -> RequestError {
        tracing::debug!(
            target: defaults::LOG_TARGET,
            request_id = %request_id,
            err = %cause,
            "request rejected before sending"
        );
        let error = RequestError::new(url, cause);
        self.publish(
            global,
            &RequestEvent::Error {
                request_id,
                error: &error,
            },
        );
        error
    }

    fn install_listeners(&self, token: &CancellationToken, request_id: &str, url: &Url, global: bool) {
        let client = self.clone();
        let id = request_id.to_string();
        let target = url.clone();
        token.on_abort(move |_| {
            client.publish(
                global,
                &RequestEvent::Aborted {
                    request_id: &id,
                    url: &target,
                },
            );
        });

        let client = self.clone();
        let id = request_id.to_string();
        let target = url.clone();
        token.on_timeout(move |reason| {
            let after = match reason {
                crate::cancel::AbortReason::TimedOut { after } => *after,
                crate::cancel::AbortReason::Aborted => std::time::Duration::ZERO,
            };
            client.publish(
                global,
                &RequestEvent::Timeout {
                    request_id: &id,
                    url: &target,
                    after,
                },
            );
        });
    }

    async fn execute<T, F>(
        &self,
        path: &str,
        call: RequestOptions,
        verb: Verb,
        check: F,
    ) -> Result<(Response, T), RequestError>
    where
        F: FnOnce(&Response) -> Result<T, HttpError> + Send,
        T: Send,
    {
        let request_id = generate_request_id();
        let global = call
            .global
            .or(self.inner.options.global)
            .unwrap_or(true);

        let library = RequestOptions::library_defaults();
        let verb_layer = verb.layer();
        let mut config = match resolve_layers(&[&library, &self.inner.options, &call, &verb_layer]) {
            Ok(config) => config,
            Err(e) => return Err(self.fail_early(&request_id, global, None, e)),
        };
        let path = Some(path.trim()).filter(|p| !p.is_empty());
        let url = match build_address(&self.inner.base, path, &config.query) {
            Ok(url) => url,
            Err(e) => return Err(self.fail_early(&request_id, global, None, e)),
        };

        let token = CancellationToken::new();
        self.install_listeners(&token, &request_id, &url, global);
        if let Err(e) = token.apply_timeout(config.timeout) {
            return Err(self.fail_early(&request_id, global, Some(url), e));
        }
        let parent = config.signal.replace(token.clone());
        let registration = Registration::new(&self.inner.hub, &token);

        self.publish(
            global,
            &RequestEvent::Configured {
                request_id: &request_id,
                url: &url,
                config: &config,
            },
        );
        tracing::debug!(
            target: defaults::LOG_TARGET,
            request_id = %request_id,
            method = %config.method,
            url = %url,
            "sending request"
        );
        // Chained after `Configured` so an already aborted caller token
        // reports `Aborted` after it.
        if let Some(parent) = parent {
            token.follow(&parent);
        }

        let started = Instant::now();
        let exchanged = self
            .exchange(&request_id, &url, config, &token, verb.decoder)
            .await;
        // From here on neither the timer nor a caller can change the outcome.
        let aborted = token.settle();
        token.detach();
        if aborted.is_some() {
            // Listeners publish `Aborted`/`Timeout`; let them finish first.
            token.cancelled().await;
        }

        let outcome = match (exchanged, &aborted) {
            (Ok(response), None) => check(&response)
                .map(|value| (response, value))
                .map_err(Failure::from),
            (Ok(_), Some(reason)) => Err(Failure::from(reason.to_error())),
            (Err(failure), Some(reason)) => Err(Failure {
                error: reason.to_error(),
                entity: failure.entity,
            }),
            (Err(failure), None) => Err(failure),
        };
        let result = outcome.map_err(|failure| {
            RequestError::new(Some(url.clone()), failure.error).with_entity(failure.entity)
        });

        match &result {
            Ok((response, _)) => {
                tracing::debug!(
                    target: defaults::LOG_TARGET,
                    request_id = %request_id,
                    url = %url,
                    status = response.status.code(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "response received"
                );
                self.publish(
                    global,
                    &RequestEvent::Success {
                        request_id: &request_id,
                        url: &url,
                        status: &response.status,
                        body: &response.body,
                    },
                );
            }
            Err(error) => {
                tracing::debug!(
                    target: defaults::LOG_TARGET,
                    request_id = %request_id,
                    url = %url,
                    err = %error.cause(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "request error"
                );
                self.publish(
                    global,
                    &RequestEvent::Error {
                        request_id: &request_id,
                        error,
                    },
                );
            }
        }

        if aborted.is_some() {
            self.inner.hub.untrack(&token);
        } else {
            let status = match &result {
                Ok((response, _)) => Some(&response.status),
                Err(error) => error.status(),
            };
            self.publish(
                global,
                &RequestEvent::Complete {
                    request_id: &request_id,
                    url: &url,
                    status,
                },
            );
            if self.inner.hub.complete(&token) {
                self.publish(global, &RequestEvent::AllComplete);
            }
        }
        registration.settle();

        result
    }

    async fn exchange(
        &self,
        request_id: &str,
        url: &Url,
        config: RequestConfig,
        token: &CancellationToken,
        forced: Option<Decoder>,
    ) -> Result<Response, Failure> {
        let method = config.method.clone();
        let request = TransportRequest {
            request_id: request_id.to_string(),
            url: url.clone(),
            config,
        };

        let response = tokio::select! {
            biased;
            _ = token.cancelled() => return Err(abort_error(token).into()),
            result = self.inner.transport.perform(request, token.clone()) => result?,
        };

        let status = ResponseStatus::from_code(response.status, response.status_text.as_deref());
        let content_type = response.content_type().map(str::to_string);
        let no_content = method == Method::HEAD || matches!(status.code(), 204 | 205 | 304);

        // Error entities are decoded by content type, never by a forced decoder.
        let decoder = match forced {
            Some(decoder) if status.is_success() => decoder,
            _ => self.inner.decoders.select(content_type.as_deref()).clone(),
        };
        let decode = async {
            if no_content {
                Ok(ResponseBody::Empty)
            } else {
                decoder.decode(response.body, content_type.as_deref()).await
            }
        };
        let decoded = tokio::select! {
            biased;
            _ = token.cancelled() => return Err(abort_error(token).into()),
            decoded = decode => decoded,
        };

        if !status.is_success() {
            return Err(Failure {
                error: HttpError::ResponseStatusError { status },
                entity: decoded.ok(),
            });
        }
        Ok(Response {
            status,
            headers: response.headers,
            body: decoded?,
        })
    }
}

/// Methods listed in an `Allow` header.
fn parse_allow(headers: &HeaderMap) -> Vec<Method> {
    headers
        .get_all(reqwest::header::ALLOW)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .filter_map(|m| Method::from_bytes(m.to_ascii_uppercase().as_bytes()).ok())
        .collect()
}

/// Builder for [`HttpClient`].
pub struct HttpClientBuilder {
    base: String,
    options: RequestOptions,
    transport: Option<Arc<dyn HttpTransport>>,
    hub: Option<Arc<Hub>>,
    decoders: Option<DecoderRegistry>,
}

impl HttpClientBuilder {
    pub fn new(base: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            options: RequestOptions::new(),
            transport: None,
            hub: None,
            decoders: None,
        }
    }

    /// Instance-level options, applied between library defaults and call options.
    pub fn options(mut self, options: RequestOptions) -> Self {
        self.options = options;
        self
    }

    pub fn transport<T: HttpTransport + 'static>(mut self, transport: T) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    pub fn transport_arc(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Use an explicit hub instead of [`Hub::shared`].
    pub fn hub(mut self, hub: Arc<Hub>) -> Self {
        self.hub = Some(hub);
        self
    }

    pub fn decoders(mut self, decoders: DecoderRegistry) -> Self {
        self.decoders = Some(decoders);
        self
    }

    pub fn build(self) -> Result<HttpClient, HttpError> {
        let base = parse_base(&self.base)?;
        let transport = match self.transport {
            Some(t) => t,
            None => Arc::new(ReqwestTransport::new()?),
        };
        Ok(HttpClient {
            inner: Arc::new(ClientInner {
                base,
                options: self.options,
                transport,
                hub: self.hub.unwrap_or_else(Hub::shared),
                events: EventBus::new(),
                decoders: self.decoders.unwrap_or_default(),
            }),
        })
    }
}
