//! HTML response bodies.
//!
//! `scraper`'s DOM is not `Send`, so the document keeps its source text and
//! parses on demand when queried.

use crate::error::HttpError;
use scraper::{Html, Selector};

/// A decoded HTML body.
///
/// The structured form is produced lazily: only the source is stored, and
/// [`select`](Self::select), [`title`](Self::title) and [`text`](Self::text)
/// each parse it into a `scraper` DOM for the duration of the query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HtmlDocument {
    source: String,
    fragment: bool,
}

impl HtmlDocument {
    /// A full document (`<html>`, `<head>` and `<body>` implied).
    pub fn document(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            fragment: false,
        }
    }

    /// A fragment, parsed without implying a document skeleton.
    pub fn fragment(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            fragment: true,
        }
    }

    pub fn is_fragment(&self) -> bool {
        self.fragment
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    fn parse(&self) -> Html {
        if self.fragment {
            Html::parse_fragment(&self.source)
        } else {
            Html::parse_document(&self.source)
        }
    }

    fn selector(css: &str) -> Result<Selector, HttpError> {
        Selector::parse(css)
            .map_err(|e| HttpError::InvalidArgument(format!("Invalid selector '{css}': {e}")))
    }

    /// Outer HTML of every element matching `css`, in document order.
    pub fn select(&self, css: &str) -> Result<Vec<String>, HttpError> {
        let selector = Self::selector(css)?;
        let html = self.parse();
        Ok(html.select(&selector).map(|el| el.html()).collect())
    }

    /// Text content of every element matching `css`.
    pub fn select_text(&self, css: &str) -> Result<Vec<String>, HttpError> {
        let selector = Self::selector(css)?;
        let html = self.parse();
        Ok(html
            .select(&selector)
            .map(|el| el.text().collect::<String>())
            .collect())
    }

    pub fn title(&self) -> Option<String> {
        let selector = Selector::parse("title").ok()?;
        let html = self.parse();
        let title = html
            .select(&selector)
            .next()
            .map(|el| el.text().collect::<String>().trim().to_string());
        title
    }

    /// All text content, tags stripped.
    pub fn text(&self) -> String {
        self.parse().root_element().text().collect()
    }
}
