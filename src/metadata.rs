//! Document metadata: an ordered, multi-valued property bag.
//!
//! Every handler reads and writes the same [`Metadata`] instance while a
//! document travels through the pipeline. Fields keep the order they were
//! first inserted in, and values within a field keep the order they were
//! added in. A field holding zero values reads exactly like an absent field.
//!
//! Well-known fields (document reference, content type, …) are ordinary
//! entries with conventional names; the store applies no special rules to
//! them. The accessors at the bottom of the `impl` block only read them.

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

// ── Well-known field names ───────────────────────────────────────────────────

/// Reference (usually the URL or path) of the document.
pub const DOC_REFERENCE: &str = "document.reference";
/// Detected content type, without parameters.
pub const DOC_CONTENT_TYPE: &str = "document.contentType";
/// Character encoding of the content.
pub const DOC_CONTENT_ENCODING: &str = "document.contentEncoding";
/// Content length in bytes.
pub const DOC_CONTENT_LENGTH: &str = "document.contentLength";
/// URLs referenced by the document, collected during processing.
pub const DOC_REFERENCED_URLS: &str = "document.referencedUrls";
/// Reference of the parent a split child was derived from.
pub const DOC_PARENT_REFERENCE: &str = "document.embedded.parent.reference";
/// 1-based position of a split child within its parent.
pub const DOC_EMBEDDED_INDEX: &str = "document.embedded.index";
/// Raw HTTP `Content-Type` header, possibly carrying parameters.
pub const HTTP_CONTENT_TYPE: &str = "Content-Type";

/// Multi-valued, insertion-ordered metadata for a single document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Metadata {
    fields: IndexMap<String, Vec<String>>,
}

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the metadata of a freshly ingested document, recording its
    /// reference.
    pub fn for_document(reference: impl Into<String>) -> Self {
        let mut metadata = Self::new();
        metadata.set_value(DOC_REFERENCE, reference);
        metadata
    }

    // ── Mutation ─────────────────────────────────────────────────────────

    /// Replace every value of `field`.
    pub fn set_values<I, S>(&mut self, field: &str, values: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let values: Vec<String> = values.into_iter().map(Into::into).collect();
        match self.fields.get_mut(field) {
            Some(existing) => *existing = values,
            None => {
                self.fields.insert(field.to_string(), values);
            }
        }
    }

    /// Append values to `field`, creating it if needed.
    pub fn add_values<I, S>(&mut self, field: &str, values: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields
            .entry(field.to_string())
            .or_default()
            .extend(values.into_iter().map(Into::into));
    }

    pub fn set_value(&mut self, field: &str, value: impl Into<String>) {
        self.set_values(field, [value.into()]);
    }

    pub fn add_value(&mut self, field: &str, value: impl Into<String>) {
        self.add_values(field, [value.into()]);
    }

    /// Remove a field entirely, returning its values.
    pub fn remove(&mut self, field: &str) -> Option<Vec<String>> {
        self.fields.shift_remove(field)
    }

    /// Append every field of `other` to this bag, in `other`'s order.
    pub fn merge(&mut self, other: &Metadata) {
        for (field, values) in other.iter() {
            self.add_values(field, values.iter().cloned());
        }
    }

    /// Copy this bag for a derived document, leaving out `exclude`d fields.
    pub fn derive_child(&self, exclude: &[String]) -> Metadata {
        let fields = self
            .fields
            .iter()
            .filter(|(name, _)| !exclude.iter().any(|e| e == *name))
            .map(|(name, values)| (name.clone(), values.clone()))
            .collect();
        Metadata { fields }
    }

    // ── Reads ────────────────────────────────────────────────────────────

    /// All values of `field`, in insertion order. Empty when absent.
    pub fn get_values(&self, field: &str) -> &[String] {
        self.fields.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn get_first(&self, field: &str) -> Option<&str> {
        self.get_values(field).first().map(String::as_str)
    }

    /// Whether `field` exists as a key, even with zero values.
    pub fn contains_key(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    /// Whether `field` holds at least one value.
    pub fn has_values(&self, field: &str) -> bool {
        !self.get_values(field).is_empty()
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Number of fields (including empty ones).
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    // ── Well-known accessors ─────────────────────────────────────────────

    pub fn document_url(&self) -> Option<&str> {
        self.get_first(DOC_REFERENCE)
    }

    pub fn referenced_urls(&self) -> &[String] {
        self.get_values(DOC_REFERENCED_URLS)
    }

    /// Content type with any `;`-parameters stripped.
    ///
    /// Prefers the detected `document.contentType` and falls back to the raw
    /// HTTP header.
    pub fn content_type(&self) -> Option<&str> {
        self.get_first(DOC_CONTENT_TYPE)
            .or_else(|| self.get_first(HTTP_CONTENT_TYPE))
            .map(strip_parameters)
            .filter(|t| !t.is_empty())
    }

    /// Declared character encoding: `document.contentEncoding`, else the
    /// `charset` parameter of the raw `Content-Type` header.
    pub fn charset(&self) -> Option<&str> {
        self.get_first(DOC_CONTENT_ENCODING).or_else(|| {
            self.get_first(HTTP_CONTENT_TYPE)
                .and_then(|header| RE_CHARSET.captures(header))
                .and_then(|caps| caps.get(1))
                .map(|m| m.as_str())
        })
    }

    pub fn content_length(&self) -> Option<u64> {
        self.get_first(DOC_CONTENT_LENGTH)
            .and_then(|v| v.trim().parse().ok())
    }
}

static RE_CHARSET: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i);\s*charset\s*=\s*"?([^";\s]+)"#).unwrap());

/// Strip a `; charset=…`-style parameter suffix from a content-type value.
pub fn strip_parameters(content_type: &str) -> &str {
    content_type
        .split_once(';')
        .map_or(content_type, |(head, _)| head)
        .trim()
}

impl<K, V> FromIterator<(K, V)> for Metadata
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut metadata = Metadata::new();
        for (k, v) in iter {
            metadata.add_value(&k.into(), v);
        }
        metadata
    }
}
