//! Outgoing body encoding.
//!
//! The effective `Content-Type` decides how a structured body goes on the
//! wire: JSON text, url-encoded pairs or multipart sections. Text and bytes
//! are the caller's wire format already and pass through.

use super::multipart::MultipartForm;
use crate::error::HttpError;
use crate::types::{MediaType, Method, ParameterMap, RequestBody, media_type};
use bytes::Bytes;
use serde_json::Value;

/// Methods whose body is sent.
pub fn carries_body(method: &Method) -> bool {
    *method == Method::POST || *method == Method::PUT || *method == Method::PATCH
}

/// `true` exactly when the method carries a body and the content type's
/// essence is `application/json`.
pub fn needs_serialization(method: &Method, content_type: Option<&str>) -> bool {
    carries_body(method)
        && content_type
            .and_then(MediaType::parse)
            .is_some_and(|m| m.is(media_type::JSON))
}

/// A wire-ready body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedBody {
    pub bytes: Bytes,
    /// Replacement `Content-Type`, set when encoding picked the header value
    /// (multipart boundaries).
    pub content_type: Option<String>,
}

impl EncodedBody {
    fn keep_header(bytes: impl Into<Bytes>) -> Self {
        Self {
            bytes: bytes.into(),
            content_type: None,
        }
    }
}

/// Encode `body` for `content_type` (the effective header value, if any).
pub fn encode_body(body: RequestBody, content_type: Option<&str>) -> Result<EncodedBody, HttpError> {
    match body {
        RequestBody::Text(text) => Ok(EncodedBody::keep_header(text)),
        RequestBody::Bytes(bytes) => Ok(EncodedBody::keep_header(bytes)),
        RequestBody::Multipart(form) => Ok(encode_multipart(&form)),
        structured => {
            let essence = match content_type {
                Some(ct) => MediaType::parse(ct)
                    .ok_or_else(|| {
                        HttpError::EncodingError(format!("Unrecognized content type '{ct}'"))
                    })?
                    .essence()
                    .to_string(),
                None => media_type::JSON.to_string(),
            };
            match essence.as_str() {
                media_type::JSON => encode_json(structured),
                media_type::FORM => {
                    let params = into_params(structured)?;
                    Ok(EncodedBody::keep_header(encode_form(&params)))
                }
                media_type::MULTIPART_FORM_DATA => {
                    let params = into_params(structured)?;
                    Ok(encode_multipart(&MultipartForm::from(&params)))
                }
                other => Err(HttpError::EncodingError(format!(
                    "Cannot encode a structured body as '{other}'"
                ))),
            }
        }
    }
}

fn encode_json(body: RequestBody) -> Result<EncodedBody, HttpError> {
    let bytes = match body {
        RequestBody::Json(value) => serde_json::to_vec(&value)?,
        RequestBody::Params(params) => serde_json::to_vec(&params.to_json())?,
        _ => {
            return Err(HttpError::EncodingError(
                "Only structured bodies can be JSON encoded".to_string(),
            ));
        }
    };
    Ok(EncodedBody::keep_header(bytes))
}

fn encode_multipart(form: &MultipartForm) -> EncodedBody {
    let boundary = MultipartForm::generate_boundary();
    EncodedBody {
        bytes: form.encode(&boundary),
        content_type: Some(MultipartForm::content_type(&boundary)),
    }
}

/// `application/x-www-form-urlencoded` serialization of `params`.
pub fn encode_form(params: &ParameterMap) -> String {
    url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(params.iter())
        .finish()
}

fn into_params(body: RequestBody) -> Result<ParameterMap, HttpError> {
    match body {
        RequestBody::Params(params) => Ok(params),
        RequestBody::Json(value) => flatten_object(&value),
        _ => Err(HttpError::EncodingError(
            "Only structured bodies can be form encoded".to_string(),
        )),
    }
}

/// Flatten a JSON object into pairs. Arrays become repeated keys; nested
/// objects have no form representation.
pub fn flatten_object(value: &Value) -> Result<ParameterMap, HttpError> {
    let Value::Object(obj) = value else {
        return Err(HttpError::EncodingError(
            "A form body must be a JSON object".to_string(),
        ));
    };

    let mut params = ParameterMap::new();
    for (key, value) in obj {
        match value {
            Value::Array(items) => {
                for item in items {
                    params.append(key.as_str(), scalar(key, item)?);
                }
            }
            Value::Null => {}
            other => {
                params.append(key.as_str(), scalar(key, other)?);
            }
        }
    }
    Ok(params)
}

fn scalar(key: &str, value: &Value) -> Result<String, HttpError> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Null => Ok(String::new()),
        Value::Array(_) | Value::Object(_) => Err(HttpError::EncodingError(format!(
            "Field '{key}' is nested and cannot be form encoded"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn json_serialization_is_method_and_type_gated() {
        assert!(needs_serialization(&Method::POST, Some("application/json; charset=utf-8")));
        assert!(needs_serialization(&Method::PATCH, Some("application/json")));
        assert!(!needs_serialization(&Method::GET, Some("application/json")));
        assert!(!needs_serialization(&Method::POST, Some(media_type::FORM)));
        assert!(!needs_serialization(&Method::PUT, None));
    }

    #[test]
    fn json_object_is_compact_text() {
        let encoded = encode_body(
            RequestBody::Json(json!({"id": 1, "name": "a"})),
            Some(media_type::JSON),
        )
        .unwrap();
        assert_eq!(encoded.bytes, Bytes::from_static(br#"{"id":1,"name":"a"}"#));
        assert_eq!(encoded.content_type, None);
    }

    #[test]
    fn params_as_json_use_single_or_array_shape() {
        let params = ParameterMap::from([("a", "1"), ("b", "2"), ("b", "3")]);
        let encoded = encode_body(RequestBody::Params(params), Some(media_type::JSON)).unwrap();
        assert_eq!(encoded.bytes, Bytes::from_static(br#"{"a":"1","b":["2","3"]}"#));
    }

    #[test]
    fn form_encoding_flattens_objects() {
        let encoded = encode_body(
            RequestBody::Json(json!({"q": "a b&c", "tag": ["x", "y"], "n": 3, "skip": null})),
            Some(media_type::FORM),
        )
        .unwrap();
        assert_eq!(encoded.bytes, Bytes::from_static(b"n=3&q=a+b%26c&tag=x&tag=y"));
    }

    #[test]
    fn nested_objects_cannot_be_form_encoded() {
        let err = encode_body(
            RequestBody::Json(json!({"user": {"id": 1}})),
            Some(media_type::FORM),
        )
        .unwrap_err();
        assert!(matches!(err, HttpError::EncodingError(_)));
    }

    #[test]
    fn multipart_sets_boundary_header() {
        let params = ParameterMap::from([("field", "value")]);
        let encoded =
            encode_body(RequestBody::Params(params), Some(media_type::MULTIPART_FORM_DATA)).unwrap();
        let ct = encoded.content_type.unwrap();
        let boundary = ct.split("boundary=").nth(1).unwrap();
        let text = String::from_utf8(encoded.bytes.to_vec()).unwrap();
        assert!(text.starts_with(&format!("--{boundary}\r\n")));
        assert!(text.ends_with(&format!("--{boundary}--\r\n")));
    }

    #[test]
    fn raw_bodies_pass_through() {
        let encoded = encode_body(RequestBody::Text("<a/>".into()), Some(media_type::XML)).unwrap();
        assert_eq!(encoded.bytes, Bytes::from_static(b"<a/>"));

        let err = encode_body(RequestBody::Json(json!({"a": 1})), Some(media_type::XML)).unwrap_err();
        assert!(matches!(err, HttpError::EncodingError(_)));
    }
}
