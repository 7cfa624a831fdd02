//! Layered option resolution.

use super::{RequestConfig, RequestOptions};
use crate::defaults;
use crate::encoding::{carries_body, encode_body};
use crate::error::HttpError;
use crate::types::{
    CachePolicy, CredentialsPolicy, HeaderMap, HeaderValue, Method, ParameterMap, RedirectPolicy,
    ReferrerPolicy, RequestBody, RequestMode,
};
use reqwest::header::CONTENT_TYPE;

/// Merge `defaults < instance < call` into an effective configuration.
pub fn resolve(
    defaults: &RequestOptions,
    instance: &RequestOptions,
    call: &RequestOptions,
) -> Result<RequestConfig, HttpError> {
    resolve_layers(&[defaults, instance, call])
}

fn most_specific<T>(
    layers: &[&RequestOptions],
    field: impl Fn(&RequestOptions) -> Option<T>,
) -> Option<T> {
    layers.iter().rev().find_map(|layer| field(layer))
}

/// Merge any number of layers, least specific first.
pub fn resolve_layers(layers: &[&RequestOptions]) -> Result<RequestConfig, HttpError> {
    let mut headers = HeaderMap::new();
    let mut query = ParameterMap::new();
    for layer in layers {
        for key in layer.headers.keys() {
            headers.remove(key);
            for value in layer.headers.get_all(key) {
                headers.append(key.clone(), value.clone());
            }
        }
        query.set_all(&layer.query);
    }

    let method = most_specific(layers, |l| l.method.clone()).unwrap_or(Method::GET);
    let body = most_specific(layers, |l| l.body.clone());
    let timeout = most_specific(layers, |l| l.timeout).unwrap_or_else(defaults::default_timeout);
    // Reject a negative timeout before anything touches the network.
    timeout.duration()?;

    let body = if carries_body(&method) {
        match body {
            Some(body) => Some(prepare_body(body, &mut headers)?),
            None => None,
        }
    } else {
        if body.is_some() {
            tracing::warn!(
                target: defaults::LOG_TARGET,
                %method,
                "dropping the body of a request whose method carries none"
            );
        }
        headers.remove(CONTENT_TYPE);
        None
    };

    Ok(RequestConfig {
        method,
        headers,
        query,
        body,
        cache: most_specific(layers, |l| l.cache).unwrap_or(CachePolicy::NoStore),
        credentials: most_specific(layers, |l| l.credentials)
            .unwrap_or(CredentialsPolicy::SameOrigin),
        mode: most_specific(layers, |l| l.mode).unwrap_or(RequestMode::Cors),
        redirect: most_specific(layers, |l| l.redirect).unwrap_or(RedirectPolicy::Follow),
        referrer: most_specific(layers, |l| l.referrer.clone())
            .unwrap_or_else(|| defaults::request::REFERRER.to_string()),
        referrer_policy: most_specific(layers, |l| l.referrer_policy)
            .unwrap_or(ReferrerPolicy::StrictOriginWhenCrossOrigin),
        integrity: most_specific(layers, |l| l.integrity.clone()),
        keepalive: most_specific(layers, |l| l.keepalive).unwrap_or(false),
        timeout,
        signal: most_specific(layers, |l| l.signal.clone()),
        global: most_specific(layers, |l| l.global).unwrap_or(true),
    })
}

fn prepare_body(body: RequestBody, headers: &mut HeaderMap) -> Result<bytes::Bytes, HttpError> {
    if !headers.contains_key(CONTENT_TYPE) && !matches!(body, RequestBody::Multipart(_)) {
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static(defaults::request::CONTENT_TYPE),
        );
    }
    let content_type = match headers.get(CONTENT_TYPE) {
        Some(value) => Some(
            value
                .to_str()
                .map_err(|e| HttpError::EncodingError(format!("Unreadable content type: {e}")))?
                .to_string(),
        ),
        None => None,
    };

    let encoded = encode_body(body, content_type.as_deref())?;
    if let Some(ct) = encoded.content_type {
        headers.insert(CONTENT_TYPE, HeaderValue::from_str(&ct)?);
    }
    Ok(encoded.bytes)
}
