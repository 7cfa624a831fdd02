//! Media type catalog and parsing.
//!
//! The constants are plain strings; [`MediaType`] wraps [`mime::Mime`] to
//! answer the type/subtype/suffix questions the codecs ask.

use std::fmt;
use std::str::FromStr;

pub const JSON: &str = "application/json";
pub const XML: &str = "application/xml";
pub const TEXT_XML: &str = "text/xml";
pub const HTML: &str = "text/html";
pub const TEXT: &str = "text/plain";
pub const CSS: &str = "text/css";
pub const JAVA_SCRIPT: &str = "text/javascript";
pub const BIN: &str = "application/octet-stream";
pub const FORM: &str = "application/x-www-form-urlencoded";
pub const MULTIPART_FORM_DATA: &str = "multipart/form-data";
pub const PNG: &str = "image/png";
pub const JPEG: &str = "image/jpeg";
pub const GIF: &str = "image/gif";
pub const SVG: &str = "image/svg+xml";
pub const PDF: &str = "application/pdf";
pub const EVENT_STREAM: &str = "text/event-stream";

/// A parsed `type/subtype[+suffix]; params` value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaType(mime::Mime);

impl MediaType {
    /// Parse a header value; `None` when it is not a valid media type.
    pub fn parse(value: &str) -> Option<Self> {
        value.trim().parse::<mime::Mime>().ok().map(Self)
    }

    /// `type/subtype` without parameters, lowercase.
    pub fn essence(&self) -> &str {
        self.0.essence_str()
    }

    pub fn type_(&self) -> &str {
        self.0.type_().as_str()
    }

    pub fn subtype(&self) -> &str {
        self.0.subtype().as_str()
    }

    /// Structured syntax suffix, e.g. `json` for `application/problem+json`.
    pub fn suffix(&self) -> Option<&str> {
        self.0.suffix().map(|s| s.as_str())
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.0.get_param(name).map(|v| v.as_str())
    }

    /// Whether the subtype (or its suffix) names `subtype`.
    pub fn has_subtype(&self, subtype: &str) -> bool {
        let own = self.subtype();
        own.eq_ignore_ascii_case(subtype)
            || own
                .rsplit_once('+')
                .is_some_and(|(_, tail)| tail.eq_ignore_ascii_case(subtype))
            || self.suffix().is_some_and(|s| s.eq_ignore_ascii_case(subtype))
    }

    pub fn is(&self, essence: &str) -> bool {
        self.essence().eq_ignore_ascii_case(essence)
    }

    pub fn as_mime(&self) -> &mime::Mime {
        &self.0
    }
}

impl FromStr for MediaType {
    type Err = crate::error::HttpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| {
            crate::error::HttpError::InvalidArgument(format!("Invalid media type '{s}'"))
        })
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_parameters_and_suffix() {
        let mt = MediaType::parse("Application/JSON; charset=utf-8").unwrap();
        assert_eq!(mt.essence(), "application/json");
        assert_eq!(mt.param("charset"), Some("utf-8"));
        assert!(mt.is(JSON));

        let problem = MediaType::parse("application/problem+json").unwrap();
        assert!(problem.has_subtype("json"));
        assert!(!problem.is(JSON));
    }

    #[test]
    fn rejects_garbage() {
        assert!(MediaType::parse("not a media type").is_none());
        assert!("".parse::<MediaType>().is_err());
    }
}
