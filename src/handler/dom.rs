//! DOM tagger: copy selector query results into a metadata field.

use super::{require, store, DocumentTagger};
use crate::collaborator::{check_selector, Extract, HtmlParser, MarkupParser};
use crate::document::Document;
use crate::error::{HandlerError, ImporterError};
use std::sync::Arc;

/// Runs a CSS selector against the document markup and stores the results,
/// in document order, under `to_field`.
#[derive(Debug, Clone)]
pub struct DomTagger {
    selector: String,
    to_field: String,
    extract: Extract,
    overwrite: bool,
    parser: Arc<dyn MarkupParser>,
}

impl DomTagger {
    /// Build a tagger using the default [`HtmlParser`].
    pub fn new(
        selector: impl Into<String>,
        to_field: impl Into<String>,
    ) -> Result<Self, ImporterError> {
        let selector = selector.into();
        let to_field = to_field.into();
        require("dom", "selector", &selector)?;
        require("dom", "to_field", &to_field)?;
        check_selector(&selector).map_err(|detail| {
            ImporterError::InvalidConfig(format!("dom selector '{selector}': {detail}"))
        })?;
        Ok(Self {
            selector,
            to_field,
            extract: Extract::default(),
            overwrite: false,
            parser: Arc::new(HtmlParser),
        })
    }

    pub fn extract(mut self, extract: Extract) -> Self {
        self.extract = extract;
        self
    }

    pub fn overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    /// Swap in another markup parser.
    pub fn parser(mut self, parser: Arc<dyn MarkupParser>) -> Self {
        self.parser = parser;
        self
    }
}

impl DocumentTagger for DomTagger {
    fn tag(&self, doc: &mut Document) -> Result<(), HandlerError> {
        let values = self.parser.select(
            &doc.content,
            doc.metadata.charset(),
            &self.selector,
            &self.extract,
        )?;
        store(&mut doc.metadata, &self.to_field, values, self.overwrite);
        Ok(())
    }
}
