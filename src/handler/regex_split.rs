//! Regex splitter: cut the content at every separator match.

use super::{compile_pattern, require_pattern, DocumentSplitter, SplitPart};
use crate::document::Document;
use crate::error::{HandlerError, ImporterError};
use crate::metadata::Metadata;
use regex::Regex;

/// Byte offset of a part within its parent's text.
pub const SPLIT_OFFSET: &str = "document.split.offset";

/// Splits text on a separator pattern. Parts that are blank after trimming
/// are dropped; the rest keep their exact text.
#[derive(Debug, Clone)]
pub struct RegexSplitter {
    separator: Regex,
}

impl RegexSplitter {
    pub fn new(separator: &str, case_sensitive: bool) -> Result<Self, ImporterError> {
        require_pattern("regex_split", "separator", separator)?;
        Ok(Self {
            separator: compile_pattern("regex_split separator", separator, case_sensitive, true)?,
        })
    }
}

impl DocumentSplitter for RegexSplitter {
    fn split(&self, doc: &Document) -> Result<Vec<SplitPart>, HandlerError> {
        let text = doc.text();
        let mut parts = Vec::new();
        let mut cursor = 0;
        let bounds = self
            .separator
            .find_iter(&text)
            .map(|m| (m.start(), m.end()))
            .chain(std::iter::once((text.len(), text.len())));

        for (sep_start, sep_end) in bounds {
            let piece = &text[cursor..sep_start];
            if !piece.trim().is_empty() {
                let mut fields = Metadata::new();
                fields.set_value(SPLIT_OFFSET, cursor.to_string());
                parts.push(SplitPart {
                    content: piece.as_bytes().to_vec(),
                    fields,
                });
            }
            cursor = sep_end;
        }
        Ok(parts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(parts: &[SplitPart]) -> Vec<String> {
        parts
            .iter()
            .map(|p| String::from_utf8(p.content.clone()).unwrap())
            .collect()
    }

    #[test]
    fn splits_on_separator() {
        let s = RegexSplitter::new(r"\n-{3,}\n", true).unwrap();
        let doc = Document::new("a", "one\n---\ntwo\n-----\nthree");
        let parts = s.split(&doc).unwrap();
        assert_eq!(texts(&parts), ["one", "two", "three"]);
        assert_eq!(parts[1].fields.get_first(SPLIT_OFFSET), Some("8"));
    }

    #[test]
    fn blank_parts_are_dropped() {
        let s = RegexSplitter::new("#", true).unwrap();
        let parts = s.split(&Document::new("a", "#a## \n#b#")).unwrap();
        assert_eq!(texts(&parts), ["a", "b"]);
    }

    #[test]
    fn no_separator_yields_single_part() {
        let s = RegexSplitter::new("SPLIT", false).unwrap();
        let parts = s.split(&Document::new("a", "whole")).unwrap();
        assert_eq!(texts(&parts), ["whole"]);
    }
}
