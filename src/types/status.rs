//! Response status (code + reason text).

use serde::{Deserialize, Serialize};
use std::fmt;

/// Status code and text of a response, or a synthesized sentinel.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResponseStatus {
    code: u16,
    text: String,
}

impl ResponseStatus {
    pub fn new(code: u16, text: impl Into<String>) -> Self {
        Self {
            code,
            text: text.into(),
        }
    }

    /// Build from a status code, using the canonical reason phrase when the
    /// transport did not supply one.
    pub fn from_code(code: u16, text: Option<&str>) -> Self {
        let text = match text {
            Some(t) if !t.is_empty() => t.to_string(),
            _ => reqwest::StatusCode::from_u16(code)
                .ok()
                .and_then(|s| s.canonical_reason())
                .unwrap_or_default()
                .to_string(),
        };
        Self { code, text }
    }

    pub fn code(&self) -> u16 {
        self.code
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// `true` for 2xx codes.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.code)
    }
}

impl fmt::Display for ResponseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.text.is_empty() {
            write!(f, "{}", self.code)
        } else {
            write!(f, "{} {}", self.code, self.text)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_reason_fills_missing_text() {
        let status = ResponseStatus::from_code(404, None);
        assert_eq!(status.text(), "Not Found");
        assert_eq!(status.to_string(), "404 Not Found");
        assert!(!status.is_success());
        assert!(ResponseStatus::from_code(204, Some("")).is_success());
    }
}
