//! UUID tagger: give each document a random identifier.

use super::{require, store, DocumentTagger};
use crate::document::Document;
use crate::error::{HandlerError, ImporterError};

/// Default field for generated identifiers.
pub const DEFAULT_UUID_FIELD: &str = "document.uuid";

#[derive(Debug, Clone)]
pub struct UuidTagger {
    field: String,
    overwrite: bool,
}

impl UuidTagger {
    pub fn new(field: impl Into<String>, overwrite: bool) -> Result<Self, ImporterError> {
        let field = field.into();
        require("uuid", "field", &field)?;
        Ok(Self { field, overwrite })
    }
}

impl Default for UuidTagger {
    fn default() -> Self {
        Self {
            field: DEFAULT_UUID_FIELD.to_string(),
            overwrite: true,
        }
    }
}

impl DocumentTagger for UuidTagger {
    fn tag(&self, doc: &mut Document) -> Result<(), HandlerError> {
        let id = ::uuid::Uuid::new_v4().to_string();
        store(&mut doc.metadata, &self.field, vec![id], self.overwrite);
        Ok(())
    }
}
