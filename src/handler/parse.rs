//! Parse tagger: hand binary content to a [`BinaryParser`] and keep its
//! plain text and metadata.
//!
//! Encrypted content may carry its own password in a metadata field (see
//! [`ParseTagger::password_field`]); the configured password is the fallback.

use super::DocumentTagger;
use crate::collaborator::BinaryParser;
use crate::document::Document;
use crate::error::HandlerError;
use std::sync::Arc;
use tracing::debug;

/// Replaces the document content with the text extracted by the parser and
/// merges the parser's fields into the metadata.
#[derive(Debug, Clone)]
pub struct ParseTagger {
    parser: Arc<dyn BinaryParser>,
    password: Option<String>,
    password_field: Option<String>,
}

impl ParseTagger {
    pub fn new(parser: Arc<dyn BinaryParser>) -> Self {
        Self {
            parser,
            password: None,
            password_field: None,
        }
    }

    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Read a per-document password from the first value of `field`.
    pub fn password_field(mut self, field: impl Into<String>) -> Self {
        self.password_field = Some(field.into());
        self
    }

    fn password_for<'a>(&'a self, doc: &'a Document) -> Option<&'a str> {
        self.password_field
            .as_deref()
            .and_then(|field| doc.metadata.get_first(field))
            .or(self.password.as_deref())
    }
}

impl DocumentTagger for ParseTagger {
    fn tag(&self, doc: &mut Document) -> Result<(), HandlerError> {
        let parsed = self.parser.extract(&doc.content, self.password_for(doc))?;
        debug!(
            "Parsed {}: {} chars, {} field(s)",
            doc.reference,
            parsed.text.len(),
            parsed.fields.len()
        );
        doc.metadata.merge(&parsed.fields);
        doc.set_text(parsed.text);
        Ok(())
    }
}
