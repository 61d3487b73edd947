//! External collaborators consumed by handlers.
//!
//! Markup parsing, content-type detection and binary-format parsing are
//! services the pipeline calls but does not own. Each is a narrow trait so
//! callers can plug in whatever library they already use. Two small default
//! implementations are provided:
//!
//! * [`HtmlParser`]: CSS-selector queries over HTML via `scraper`
//! * [`SniffingDetector`]: magic-byte and file-extension content typing
//!
//! There is no default [`BinaryParser`]; PDF/Office extraction is left to
//! the caller.

use crate::error::HandlerError;
use crate::metadata::Metadata;
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use tracing::debug;

// ── Markup parser ────────────────────────────────────────────────────────────

/// What to pull out of each element matched by a selector.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Extract {
    /// Whitespace-normalised text content. (default)
    #[default]
    Text,
    /// Inner HTML.
    Html,
    /// The element itself, serialised.
    OuterHtml,
    /// The value of an attribute; elements without it yield nothing.
    Attr(String),
}

impl TryFrom<String> for Extract {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "text" => Ok(Extract::Text),
            "html" => Ok(Extract::Html),
            "outer_html" => Ok(Extract::OuterHtml),
            other => match other.strip_prefix("attr:") {
                Some(name) if !name.trim().is_empty() => Ok(Extract::Attr(name.trim().to_string())),
                _ => Err(format!(
                    "unknown extract mode '{other}' (expected text, html, outer_html or attr:<name>)"
                )),
            },
        }
    }
}

impl From<Extract> for String {
    fn from(value: Extract) -> Self {
        value.to_string()
    }
}

impl fmt::Display for Extract {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Extract::Text => write!(f, "text"),
            Extract::Html => write!(f, "html"),
            Extract::OuterHtml => write!(f, "outer_html"),
            Extract::Attr(name) => write!(f, "attr:{name}"),
        }
    }
}

/// Parses markup and answers selector queries with ordered results.
pub trait MarkupParser: Send + Sync + fmt::Debug {
    fn select(
        &self,
        markup: &[u8],
        charset: Option<&str>,
        selector: &str,
        extract: &Extract,
    ) -> Result<Vec<String>, HandlerError>;
}

/// HTML parser backed by the `scraper` crate.
///
/// Content is decoded as UTF-8 (lossily); other declared charsets are
/// logged and decoded the same way.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlParser;

impl MarkupParser for HtmlParser {
    fn select(
        &self,
        markup: &[u8],
        charset: Option<&str>,
        selector: &str,
        extract: &Extract,
    ) -> Result<Vec<String>, HandlerError> {
        if let Some(cs) = charset.filter(|cs| !cs.eq_ignore_ascii_case("utf-8")) {
            debug!("Decoding markup declared as {} as UTF-8", cs);
        }
        let parsed_selector =
            Selector::parse(selector).map_err(|e| HandlerError::UnsupportedSelector {
                selector: selector.to_string(),
                detail: e.to_string(),
            })?;
        let html = Html::parse_document(&String::from_utf8_lossy(markup));

        let values = html
            .select(&parsed_selector)
            .filter_map(|element| match extract {
                Extract::Text => Some(normalise_whitespace(&element.text().collect::<String>())),
                Extract::Html => Some(element.inner_html()),
                Extract::OuterHtml => Some(element.html()),
                Extract::Attr(name) => element.value().attr(name).map(str::to_string),
            })
            .collect();
        Ok(values)
    }
}

fn normalise_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Verifies a selector parses, for validation at construction time.
pub(crate) fn check_selector(selector: &str) -> Result<(), String> {
    Selector::parse(selector).map(|_| ()).map_err(|e| e.to_string())
}

// ── Content-type detector ────────────────────────────────────────────────────

/// Detects a content type from raw bytes and the document name.
///
/// The returned value may carry parameters (`text/html; charset=utf-8`);
/// callers strip them before storing.
pub trait ContentTypeDetector: Send + Sync + fmt::Debug {
    fn detect(&self, content: &[u8], name: &str) -> Result<String, HandlerError>;
}

/// Magic-byte sniffing with a file-extension fallback.
#[derive(Debug, Clone, Copy, Default)]
pub struct SniffingDetector;

const MAGIC: &[(&[u8], &str)] = &[
    (b"%PDF-", "application/pdf"),
    (b"PK\x03\x04", "application/zip"),
    (b"\x89PNG\r\n\x1a\n", "image/png"),
    (b"\xff\xd8\xff", "image/jpeg"),
    (b"GIF8", "image/gif"),
];

const EXTENSIONS: &[(&str, &str)] = &[
    ("html", "text/html"),
    ("htm", "text/html"),
    ("xml", "application/xml"),
    ("json", "application/json"),
    ("txt", "text/plain"),
    ("md", "text/markdown"),
    ("csv", "text/csv"),
    ("pdf", "application/pdf"),
];

impl ContentTypeDetector for SniffingDetector {
    fn detect(&self, content: &[u8], name: &str) -> Result<String, HandlerError> {
        if let Some((_, mime)) = MAGIC.iter().find(|(magic, _)| content.starts_with(magic)) {
            return Ok((*mime).to_string());
        }

        let head = String::from_utf8_lossy(&content[..content.len().min(512)]);
        let head = head.trim_start_matches('\u{FEFF}').trim_start().to_ascii_lowercase();
        if head.starts_with("<!doctype html") || head.starts_with("<html") {
            return Ok("text/html".to_string());
        }
        if head.starts_with("<?xml") {
            return Ok("application/xml".to_string());
        }

        let by_extension = Path::new(name)
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .and_then(|ext| {
                EXTENSIONS
                    .iter()
                    .find(|(known, _)| *known == ext)
                    .map(|(_, mime)| (*mime).to_string())
            });
        if let Some(mime) = by_extension {
            return Ok(mime);
        }

        if std::str::from_utf8(content).is_ok() {
            Ok("text/plain".to_string())
        } else {
            Ok("application/octet-stream".to_string())
        }
    }
}

// ── Binary-format parser ─────────────────────────────────────────────────────

/// Text and metadata extracted from a binary document.
#[derive(Debug, Clone, Default)]
pub struct ParsedContent {
    pub text: String,
    pub fields: Metadata,
}

/// Extracts plain text and metadata from a binary format (PDF, Office, …).
pub trait BinaryParser: Send + Sync + fmt::Debug {
    fn extract(&self, content: &[u8], password: Option<&str>)
        -> Result<ParsedContent, HandlerError>;
}
