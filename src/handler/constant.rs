//! Constant tagger: write fixed values to a field.

use super::{require, store, DocumentTagger};
use crate::document::Document;
use crate::error::{HandlerError, ImporterError};

#[derive(Debug, Clone)]
pub struct ConstantTagger {
    field: String,
    values: Vec<String>,
    overwrite: bool,
}

impl ConstantTagger {
    pub fn new<I, S>(field: impl Into<String>, values: I, overwrite: bool) -> Result<Self, ImporterError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let field = field.into();
        require("constant", "field", &field)?;
        Ok(Self {
            field,
            values: values.into_iter().map(Into::into).collect(),
            overwrite,
        })
    }
}

impl DocumentTagger for ConstantTagger {
    fn tag(&self, doc: &mut Document) -> Result<(), HandlerError> {
        store(&mut doc.metadata, &self.field, self.values.clone(), self.overwrite);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn appends_by_default() {
        let tagger = ConstantTagger::new("source", ["crawler"], false).unwrap();
        let mut doc = Document::new("a", "");
        doc.metadata.add_value("source", "manual");
        tagger.tag(&mut doc).unwrap();
        assert_eq!(doc.metadata.get_values("source"), ["manual", "crawler"]);
    }

    #[test]
    fn overwrite_replaces() {
        let tagger = ConstantTagger::new("source", ["a", "b"], true).unwrap();
        let mut doc = Document::new("a", "");
        doc.metadata.add_value("source", "manual");
        tagger.tag(&mut doc).unwrap();
        assert_eq!(doc.metadata.get_values("source"), ["a", "b"]);
    }
}
