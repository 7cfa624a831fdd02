//! Response decoding.
//!
//! A [`DecoderRegistry`] is an ordered table of `(MediaMatcher, Decoder)`
//! pairs. Exact `type/subtype` matchers are checked first, then subtype (or
//! `+suffix`) matchers, then top-level type matchers; the first hit wins and
//! anything unmatched decodes as text.

use super::{HtmlDocument, XmlDocument};
use crate::error::{BoxError, HttpError};
use crate::types::{Blob, BodySource, MediaType, ResponseBody, media_type};
use bytes::Bytes;
use std::fmt;
use std::sync::Arc;

type CustomFn = Arc<dyn Fn(Bytes) -> Result<ResponseBody, BoxError> + Send + Sync>;

/// How a response body is turned into a [`ResponseBody`].
#[derive(Clone)]
pub enum Decoder {
    Json,
    Xml,
    Html,
    HtmlFragment,
    Text,
    /// Bytes plus content type.
    Blob,
    /// Raw bytes.
    Buffer,
    /// The body stream, untouched.
    Stream,
    Custom(CustomFn),
}

impl Decoder {
    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(Bytes) -> Result<ResponseBody, BoxError> + Send + Sync + 'static,
    {
        Self::Custom(Arc::new(f))
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Xml => "xml",
            Self::Html => "html",
            Self::HtmlFragment => "html-fragment",
            Self::Text => "text",
            Self::Blob => "blob",
            Self::Buffer => "buffer",
            Self::Stream => "stream",
            Self::Custom(_) => "custom",
        }
    }

    /// Decode `body`. Read failures surface as `TransportFailure` (from the
    /// body source), parse failures as `DecodingError`.
    pub async fn decode(
        &self,
        body: BodySource,
        content_type: Option<&str>,
    ) -> Result<ResponseBody, HttpError> {
        if let Self::Stream = self {
            return Ok(ResponseBody::Stream(body.into_stream()));
        }
        let bytes = body.into_bytes().await?;
        self.decode_bytes(bytes, content_type)
    }

    pub fn decode_bytes(
        &self,
        bytes: Bytes,
        content_type: Option<&str>,
    ) -> Result<ResponseBody, HttpError> {
        match self {
            Self::Json => {
                if bytes.iter().all(u8::is_ascii_whitespace) {
                    return Ok(ResponseBody::Empty);
                }
                serde_json::from_slice(&bytes)
                    .map(ResponseBody::Json)
                    .map_err(|e| HttpError::decoding("Response body is not valid JSON", e))
            }
            Self::Xml => XmlDocument::parse(lossy(&bytes)).map(ResponseBody::Xml),
            Self::Html => Ok(ResponseBody::Html(HtmlDocument::document(lossy(&bytes)))),
            Self::HtmlFragment => Ok(ResponseBody::Html(HtmlDocument::fragment(lossy(&bytes)))),
            Self::Text => Ok(ResponseBody::Text(lossy(&bytes))),
            Self::Blob => Ok(ResponseBody::Blob(Blob {
                bytes,
                content_type: content_type.map(str::to_string),
            })),
            Self::Buffer => Ok(ResponseBody::Bytes(bytes)),
            Self::Stream => Ok(ResponseBody::Stream(crate::types::ByteStream::once(bytes))),
            Self::Custom(f) => {
                f(bytes).map_err(|e| HttpError::decoding("Custom decoder failed", e))
            }
        }
    }
}

fn lossy(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

impl fmt::Debug for Decoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl PartialEq for Decoder {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Custom(a), Self::Custom(b)) => Arc::ptr_eq(a, b),
            _ => self.name() == other.name(),
        }
    }
}

/// Predicate over a response media type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaMatcher {
    /// Whole essence, e.g. `application/json`.
    Exact(String),
    /// Subtype or structured suffix, e.g. `json` matches `application/problem+json`.
    Subtype(String),
    /// Top-level type, e.g. `text`.
    Type(String),
}

impl MediaMatcher {
    pub fn exact(essence: &str) -> Self {
        Self::Exact(essence.to_ascii_lowercase())
    }

    pub fn subtype(subtype: &str) -> Self {
        Self::Subtype(subtype.to_ascii_lowercase())
    }

    pub fn type_(type_: &str) -> Self {
        Self::Type(type_.to_ascii_lowercase())
    }

    pub fn matches(&self, media: &MediaType) -> bool {
        match self {
            Self::Exact(essence) => media.is(essence),
            Self::Subtype(subtype) => media.has_subtype(subtype),
            Self::Type(type_) => media.type_().eq_ignore_ascii_case(type_),
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Self::Exact(_) => 0,
            Self::Subtype(_) => 1,
            Self::Type(_) => 2,
        }
    }
}

/// Priority-ordered decoder table.
#[derive(Debug, Clone)]
pub struct DecoderRegistry {
    entries: Vec<(MediaMatcher, Decoder)>,
    fallback: Decoder,
}

impl Default for DecoderRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        for (matcher, decoder) in [
            (MediaMatcher::exact(media_type::JSON), Decoder::Json),
            (MediaMatcher::exact(media_type::HTML), Decoder::Html),
            (MediaMatcher::exact(media_type::XML), Decoder::Xml),
            (MediaMatcher::exact(media_type::TEXT_XML), Decoder::Xml),
            (MediaMatcher::exact(media_type::BIN), Decoder::Stream),
            (MediaMatcher::exact(media_type::EVENT_STREAM), Decoder::Stream),
            (MediaMatcher::subtype("json"), Decoder::Json),
            (MediaMatcher::subtype("xml"), Decoder::Xml),
            (MediaMatcher::subtype("html"), Decoder::Html),
            (MediaMatcher::type_("text"), Decoder::Text),
            (MediaMatcher::type_("image"), Decoder::Blob),
            (MediaMatcher::type_("audio"), Decoder::Blob),
            (MediaMatcher::type_("video"), Decoder::Blob),
        ] {
            registry.push(matcher, decoder);
        }
        registry
    }
}

impl DecoderRegistry {
    /// A table with no entries; everything falls back to text.
    pub fn empty() -> Self {
        Self {
            entries: Vec::new(),
            fallback: Decoder::Text,
        }
    }

    fn push(&mut self, matcher: MediaMatcher, decoder: Decoder) {
        let at = self
            .entries
            .iter()
            .position(|(m, _)| m.rank() > matcher.rank())
            .unwrap_or(self.entries.len());
        self.entries.insert(at, (matcher, decoder));
    }

    /// Register `decoder` ahead of every existing entry of the same
    /// specificity, so it overrides a built-in for the same media type.
    pub fn register(&mut self, matcher: MediaMatcher, decoder: Decoder) -> &mut Self {
        let at = self
            .entries
            .iter()
            .position(|(m, _)| m.rank() >= matcher.rank())
            .unwrap_or(self.entries.len());
        self.entries.insert(at, (matcher, decoder));
        self
    }

    pub fn with(mut self, matcher: MediaMatcher, decoder: Decoder) -> Self {
        self.register(matcher, decoder);
        self
    }

    /// Decoder used when nothing matches.
    pub fn set_fallback(&mut self, decoder: Decoder) -> &mut Self {
        self.fallback = decoder;
        self
    }

    /// Pick the decoder for a `Content-Type` header value.
    pub fn select(&self, content_type: Option<&str>) -> &Decoder {
        let Some(media) = content_type.and_then(MediaType::parse) else {
            return &self.fallback;
        };
        self.entries
            .iter()
            .find(|(matcher, _)| matcher.matches(&media))
            .map(|(_, decoder)| decoder)
            .unwrap_or(&self.fallback)
    }
}
