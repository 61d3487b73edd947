//! Content-type tagger: detect and record the document's media type.

use super::DocumentTagger;
use crate::collaborator::{ContentTypeDetector, SniffingDetector};
use crate::document::Document;
use crate::error::HandlerError;
use crate::metadata::{strip_parameters, DOC_CONTENT_LENGTH, DOC_CONTENT_TYPE};
use std::sync::Arc;

/// Stores the detected content type (parameters stripped) under
/// `document.contentType` and the byte length under
/// `document.contentLength`.
#[derive(Debug, Clone)]
pub struct ContentTypeTagger {
    detector: Arc<dyn ContentTypeDetector>,
}

impl ContentTypeTagger {
    pub fn new(detector: Arc<dyn ContentTypeDetector>) -> Self {
        Self { detector }
    }
}

impl Default for ContentTypeTagger {
    fn default() -> Self {
        Self::new(Arc::new(SniffingDetector))
    }
}

impl DocumentTagger for ContentTypeTagger {
    fn tag(&self, doc: &mut Document) -> Result<(), HandlerError> {
        let detected = self.detector.detect(&doc.content, &doc.reference)?;
        doc.metadata
            .set_value(DOC_CONTENT_TYPE, strip_parameters(&detected));
        doc.metadata
            .set_value(DOC_CONTENT_LENGTH, doc.content.len().to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct FixedDetector(&'static str);

    impl ContentTypeDetector for FixedDetector {
        fn detect(&self, _: &[u8], _: &str) -> Result<String, HandlerError> {
            Ok(self.0.to_string())
        }
    }

    #[test]
    fn parameters_are_stripped() {
        let tagger = ContentTypeTagger::new(Arc::new(FixedDetector("text/html; charset=UTF-8")));
        let mut doc = Document::new("a", "<p>hi</p>");
        tagger.tag(&mut doc).unwrap();
        assert_eq!(doc.metadata.get_values(DOC_CONTENT_TYPE), ["text/html"]);
        assert_eq!(doc.metadata.content_length(), Some(9));
    }

    #[test]
    fn default_detector_sniffs_html() {
        let mut doc = Document::new("page", "<html><body>x</body></html>");
        ContentTypeTagger::default().tag(&mut doc).unwrap();
        assert_eq!(doc.metadata.content_type(), Some("text/html"));
    }
}
