//! Request payloads, raw response bodies and decoded response values.

use crate::encoding::{HtmlDocument, MultipartForm, XmlDocument};
use crate::error::HttpError;
use crate::types::ParameterMap;
use bytes::{Bytes, BytesMut};
use futures::Stream;
use futures_util::StreamExt;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::pin::Pin;
use std::sync::{Mutex, PoisonError};
use std::task::{Context, Poll};

/// Outgoing payload as supplied by the caller.
///
/// Structured variants (`Json`, `Params`) are encoded according to the
/// effective `Content-Type`; `Multipart` always becomes a multipart body;
/// `Text` and `Bytes` are sent as-is.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Json(Value),
    Params(ParameterMap),
    Multipart(MultipartForm),
    Text(String),
    Bytes(Bytes),
}

impl RequestBody {
    /// Convert any serializable value into a JSON body.
    pub fn json<T: Serialize + ?Sized>(value: &T) -> Result<Self, HttpError> {
        Ok(Self::Json(serde_json::to_value(value)?))
    }

    /// Whether this payload still needs encoding before it is wire-ready.
    pub fn is_structured(&self) -> bool {
        matches!(self, Self::Json(_) | Self::Params(_))
    }
}

impl From<Value> for RequestBody {
    fn from(v: Value) -> Self {
        Self::Json(v)
    }
}

impl From<ParameterMap> for RequestBody {
    fn from(p: ParameterMap) -> Self {
        Self::Params(p)
    }
}

impl From<MultipartForm> for RequestBody {
    fn from(f: MultipartForm) -> Self {
        Self::Multipart(f)
    }
}

impl From<String> for RequestBody {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<&str> for RequestBody {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<Bytes> for RequestBody {
    fn from(b: Bytes) -> Self {
        Self::Bytes(b)
    }
}

impl From<Vec<u8>> for RequestBody {
    fn from(b: Vec<u8>) -> Self {
        Self::Bytes(Bytes::from(b))
    }
}

type BoxedChunks = Pin<Box<dyn Stream<Item = Result<Bytes, HttpError>> + Send>>;

/// A boxed stream of body chunks.
///
/// Held in a `Mutex` only to be `Sync`; polling goes through `get_mut` and
/// never locks.
pub struct ByteStream(Mutex<BoxedChunks>);

impl ByteStream {
    pub fn new<S>(stream: S) -> Self
    where
        S: Stream<Item = Result<Bytes, HttpError>> + Send + 'static,
    {
        Self(Mutex::new(Box::pin(stream)))
    }

    /// A stream yielding `bytes` as a single chunk.
    pub fn once(bytes: Bytes) -> Self {
        Self::new(futures::stream::once(async move { Ok(bytes) }))
    }

    /// Drain the stream into one contiguous buffer.
    pub async fn collect_bytes(mut self) -> Result<Bytes, HttpError> {
        let mut buf = BytesMut::new();
        while let Some(chunk) = self.next().await {
            buf.extend_from_slice(&chunk?);
        }
        Ok(buf.freeze())
    }
}

impl Stream for ByteStream {
    type Item = Result<Bytes, HttpError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.0
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .as_mut()
            .poll_next(cx)
    }
}

impl fmt::Debug for ByteStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ByteStream(..)")
    }
}

/// Raw body handed over by the transport.
#[derive(Debug)]
pub enum BodySource {
    Bytes(Bytes),
    Stream(ByteStream),
}

impl BodySource {
    pub fn empty() -> Self {
        Self::Bytes(Bytes::new())
    }

    /// Materialize the whole body.
    pub async fn into_bytes(self) -> Result<Bytes, HttpError> {
        match self {
            Self::Bytes(b) => Ok(b),
            Self::Stream(s) => s.collect_bytes().await,
        }
    }

    pub fn into_stream(self) -> ByteStream {
        match self {
            Self::Bytes(b) => ByteStream::once(b),
            Self::Stream(s) => s,
        }
    }
}

impl From<Bytes> for BodySource {
    fn from(b: Bytes) -> Self {
        Self::Bytes(b)
    }
}

impl From<&'static str> for BodySource {
    fn from(s: &'static str) -> Self {
        Self::Bytes(Bytes::from_static(s.as_bytes()))
    }
}

impl From<String> for BodySource {
    fn from(s: String) -> Self {
        Self::Bytes(Bytes::from(s))
    }
}

/// Opaque binary payload plus the content type it was served with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob {
    pub bytes: Bytes,
    pub content_type: Option<String>,
}

impl Blob {
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// A decoded response body.
#[derive(Debug)]
pub enum ResponseBody {
    /// No content (204, HEAD, ...).
    Empty,
    Json(Value),
    Xml(XmlDocument),
    Html(HtmlDocument),
    Text(String),
    Blob(Blob),
    Bytes(Bytes),
    Stream(ByteStream),
}

impl ResponseBody {
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Self::Json(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_xml(&self) -> Option<&XmlDocument> {
        match self {
            Self::Xml(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_html(&self) -> Option<&HtmlDocument> {
        match self {
            Self::Html(d) => Some(d),
            _ => None,
        }
    }

    pub fn into_json(self) -> Option<Value> {
        match self {
            Self::Json(v) => Some(v),
            _ => None,
        }
    }

    pub fn into_text(self) -> Option<String> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn into_xml(self) -> Option<XmlDocument> {
        match self {
            Self::Xml(d) => Some(d),
            _ => None,
        }
    }

    pub fn into_html(self) -> Option<HtmlDocument> {
        match self {
            Self::Html(d) => Some(d),
            _ => None,
        }
    }

    pub fn into_blob(self) -> Option<Blob> {
        match self {
            Self::Blob(b) => Some(b),
            _ => None,
        }
    }

    pub fn into_bytes(self) -> Option<Bytes> {
        match self {
            Self::Bytes(b) => Some(b),
            Self::Blob(b) => Some(b.bytes),
            _ => None,
        }
    }

    pub fn into_stream(self) -> Option<ByteStream> {
        match self {
            Self::Stream(s) => Some(s),
            _ => None,
        }
    }

    /// Short name of the variant, used in logs and error messages.
    pub fn variant_name(&self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::Json(_) => "json",
            Self::Xml(_) => "xml",
            Self::Html(_) => "html",
            Self::Text(_) => "text",
            Self::Blob(_) => "blob",
            Self::Bytes(_) => "bytes",
            Self::Stream(_) => "stream",
        }
    }
}
