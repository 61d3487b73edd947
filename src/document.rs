//! The in-flight document: reference, raw content and metadata.

use crate::metadata::{Metadata, DOC_CONTENT_LENGTH};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

/// One document travelling through the pipeline.
///
/// Owned by the driver for the duration of its processing; never shared
/// between documents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub reference: String,
    #[serde(with = "content_as_text")]
    pub content: Vec<u8>,
    pub metadata: Metadata,
}

impl Document {
    /// Create a document, recording its reference in the metadata.
    pub fn new(reference: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        let reference = reference.into();
        Self {
            metadata: Metadata::for_document(reference.clone()),
            reference,
            content: content.into(),
        }
    }

    /// Create a document with pre-existing metadata (e.g. HTTP headers).
    pub fn with_metadata(
        reference: impl Into<String>,
        content: impl Into<Vec<u8>>,
        metadata: Metadata,
    ) -> Self {
        Self {
            reference: reference.into(),
            content: content.into(),
            metadata,
        }
    }

    /// Content as text, lossily decoded as UTF-8.
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.content)
    }

    /// Replace the content and refresh the recorded content length.
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.content = text.into().into_bytes();
        self.metadata
            .set_value(DOC_CONTENT_LENGTH, self.content.len().to_string());
    }
}

mod content_as_text {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(content: &[u8], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&String::from_utf8_lossy(content))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
        Ok(String::deserialize(d)?.into_bytes())
    }
}
