//! Text-between tagger: extract spans bounded by start/end patterns.
//!
//! Each [`TextBetween`] pair names a target field and two regular
//! expressions. For every pair the tagger walks the text for successive,
//! non-overlapping start matches; each one is closed by the nearest end
//! match at or after the start match's end. Captured spans are appended to
//! the pair's field in **reverse discovery order**.
//!
//! ```text
//! "x OPEN hello CLOSE y"
//!    └──┘       └───┘
//!   start        end      inclusive = false → " hello "
//!                         inclusive = true  → "OPEN hello CLOSE"
//! ```
//!
//! A start with no end after it stops extraction for that pair; spans
//! already found for the pair are still written. Patterns always run with
//! `.` matching newlines; one `case_sensitive` flag governs every pair.

use super::{compile_pattern, require, require_pattern, DocumentTagger};
use crate::document::Document;
use crate::error::{HandlerError, ImporterError};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::ops::Range;
use tracing::debug;

/// A named start/end pattern pair.
///
/// Pairs are processed in `(start, end, name)` order, not declaration
/// order. Two pairs are equal when name, start and end all match.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TextBetween {
    /// Target metadata field.
    pub name: String,
    pub start: String,
    pub end: String,
}

impl TextBetween {
    pub fn new(name: impl Into<String>, start: impl Into<String>, end: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            start: start.into(),
            end: end.into(),
        }
    }
}

impl Ord for TextBetween {
    fn cmp(&self, other: &Self) -> Ordering {
        (&self.start, &self.end, &self.name).cmp(&(&other.start, &other.end, &other.name))
    }
}

impl PartialOrd for TextBetween {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[derive(Debug)]
struct CompiledPair {
    field: String,
    start: Regex,
    end: Regex,
}

/// Extracts text found between start and end patterns into metadata fields.
#[derive(Debug)]
pub struct TextBetweenTagger {
    pairs: Vec<CompiledPair>,
    inclusive: bool,
    case_sensitive: bool,
}

impl TextBetweenTagger {
    /// Validate, sort, deduplicate and compile `pairs`.
    ///
    /// # Errors
    /// [`ImporterError::MissingField`] for a blank name or an empty pattern, and
    /// [`ImporterError::InvalidPattern`] for a pattern that fails to compile.
    pub fn new(
        pairs: impl IntoIterator<Item = TextBetween>,
        inclusive: bool,
        case_sensitive: bool,
    ) -> Result<Self, ImporterError> {
        let mut pairs: Vec<TextBetween> = pairs.into_iter().collect();
        if pairs.is_empty() {
            return Err(ImporterError::missing("text_between", "pairs"));
        }
        for pair in &pairs {
            require("text_between", "name", &pair.name)?;
            require_pattern("text_between", "start", &pair.start)?;
            require_pattern("text_between", "end", &pair.end)?;
        }
        pairs.sort();
        pairs.dedup();

        let compiled = pairs
            .into_iter()
            .map(|pair| {
                let context = format!("text_between '{}'", pair.name);
                Ok(CompiledPair {
                    start: compile_pattern(&context, &pair.start, case_sensitive, true)?,
                    end: compile_pattern(&context, &pair.end, case_sensitive, true)?,
                    field: pair.name,
                })
            })
            .collect::<Result<Vec<_>, ImporterError>>()?;

        Ok(Self {
            pairs: compiled,
            inclusive,
            case_sensitive,
        })
    }

    pub fn is_inclusive(&self) -> bool {
        self.inclusive
    }

    pub fn is_case_sensitive(&self) -> bool {
        self.case_sensitive
    }

    /// Target fields in processing order.
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.pairs.iter().map(|p| p.field.as_str())
    }

    /// Run every pair over `text`, returning `(field, value)` in the order
    /// values are to be appended.
    pub fn extract<'t>(&'t self, text: &'t str) -> Vec<(&'t str, &'t str)> {
        let mut out = Vec::new();
        for pair in &self.pairs {
            let ranges = self.ranges(pair, text);
            out.extend(
                ranges
                    .into_iter()
                    .rev()
                    .map(|range| (pair.field.as_str(), &text[range])),
            );
        }
        out
    }

    fn ranges(&self, pair: &CompiledPair, text: &str) -> Vec<Range<usize>> {
        let mut ranges = Vec::new();
        for start in pair.start.find_iter(text) {
            let Some(end) = pair.end.find_at(text, start.end()) else {
                break;
            };
            if self.inclusive {
                ranges.push(start.start()..end.end());
            } else {
                ranges.push(start.end()..end.start());
            }
        }
        ranges
    }
}

impl DocumentTagger for TextBetweenTagger {
    fn tag(&self, doc: &mut Document) -> Result<(), HandlerError> {
        let text = doc.text().into_owned();
        let extracted = self.extract(&text);
        debug!(
            "text_between: {} value(s) extracted from {}",
            extracted.len(),
            doc.reference
        );
        for (field, value) in extracted {
            doc.metadata.add_value(field, value);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn tag(tagger: &TextBetweenTagger, text: &str) -> Document {
        let mut doc = Document::new("test", text);
        tagger.tag(&mut doc).unwrap();
        doc
    }

    fn open_close(inclusive: bool) -> TextBetweenTagger {
        TextBetweenTagger::new([TextBetween::new("f", "OPEN", "CLOSE")], inclusive, false).unwrap()
    }

    #[test]
    fn exclusive_strips_delimiters() {
        let doc = tag(&open_close(false), "x OPEN hello CLOSE y");
        assert_eq!(doc.metadata.get_values("f"), [" hello "]);
    }

    #[test]
    fn inclusive_keeps_delimiters() {
        let doc = tag(&open_close(true), "x OPEN hello CLOSE y");
        assert_eq!(doc.metadata.get_values("f"), ["OPEN hello CLOSE"]);
    }

    #[test]
    fn values_are_appended_in_reverse_discovery_order() {
        let doc = tag(&open_close(false), "OPEN1CLOSE OPEN2CLOSE OPEN3CLOSE");
        assert_eq!(doc.metadata.get_values("f"), ["3", "2", "1"]);
    }

    #[test]
    fn unterminated_start_yields_nothing() {
        let doc = tag(&open_close(false), "x OPEN hello");
        assert!(doc.metadata.get_values("f").is_empty());
    }

    #[test]
    fn unterminated_start_stops_the_pair_but_keeps_earlier_spans() {
        let doc = tag(&open_close(false), "OPEN a CLOSE OPEN b");
        assert_eq!(doc.metadata.get_values("f"), [" a "]);
    }

    #[test]
    fn nearest_end_closes_each_start() {
        // The second start lies inside the first span; both share one end.
        let doc = tag(&open_close(false), "OPEN a OPEN b CLOSE");
        assert_eq!(doc.metadata.get_values("f"), [" b ", " a OPEN b "]);
    }

    #[test]
    fn empty_captures_are_kept() {
        let doc = tag(&open_close(false), "OPENCLOSE");
        assert_eq!(doc.metadata.get_values("f"), [""]);
    }

    #[test]
    fn case_insensitive_by_default_flag() {
        let doc = tag(&open_close(false), "open x close");
        assert_eq!(doc.metadata.get_values("f"), [" x "]);

        let strict =
            TextBetweenTagger::new([TextBetween::new("f", "OPEN", "CLOSE")], false, true).unwrap();
        let doc = tag(&strict, "open x close");
        assert!(doc.metadata.get_values("f").is_empty());
    }

    #[test]
    fn dot_matches_newlines() {
        let tagger =
            TextBetweenTagger::new([TextBetween::new("f", "<b>", "</b>.")], false, false).unwrap();
        let doc = tag(&tagger, "<b>multi\nline</b>\n");
        assert_eq!(doc.metadata.get_values("f"), ["multi\nline"]);
    }

    #[test]
    fn newline_end_delimiter_closes_the_line() {
        let tagger =
            TextBetweenTagger::new([TextBetween::new("subject", "Subject:", "\n")], false, false)
                .unwrap();
        let doc = tag(&tagger, "From: a\nSubject: quarterly numbers\nBody");
        assert_eq!(doc.metadata.get_values("subject"), [" quarterly numbers"]);
    }

    #[test]
    fn empty_delimiter_is_missing_field() {
        let err = TextBetweenTagger::new([TextBetween::new("f", "", "x")], false, false)
            .unwrap_err();
        assert!(matches!(err, ImporterError::MissingField { ref field, .. } if field == "start"));
    }

    #[test]
    fn pairs_run_in_pattern_order_not_declaration_order() {
        let tagger = TextBetweenTagger::new(
            [
                TextBetween::new("f", "ZZ", "zz"),
                TextBetween::new("f", "AA", "aa"),
            ],
            false,
            true,
        )
        .unwrap();
        let doc = tag(&tagger, "ZZ second zz AA first aa");
        assert_eq!(doc.metadata.get_values("f"), [" first ", " second "]);
    }

    #[test]
    fn ordering_is_start_end_name() {
        let mut pairs = vec![
            TextBetween::new("b", "s", "e"),
            TextBetween::new("a", "s", "e"),
            TextBetween::new("z", "s", "d"),
            TextBetween::new("z", "r", "z"),
        ];
        pairs.sort();
        let names: Vec<_> = pairs.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["z", "z", "a", "b"]);
        assert_eq!(pairs[0].start, "r");
    }

    #[test]
    fn duplicate_pairs_collapse() {
        let tagger = TextBetweenTagger::new(
            [
                TextBetween::new("f", "OPEN", "CLOSE"),
                TextBetween::new("f", "OPEN", "CLOSE"),
            ],
            false,
            false,
        )
        .unwrap();
        let doc = tag(&tagger, "OPEN x CLOSE");
        assert_eq!(doc.metadata.get_values("f"), [" x "]);
    }

    #[test]
    fn existing_values_are_kept() {
        let mut doc = Document::new("t", "OPEN x CLOSE");
        doc.metadata.add_value("f", "before");
        open_close(false).tag(&mut doc).unwrap();
        assert_eq!(doc.metadata.get_values("f"), ["before", " x "]);
    }

    #[test]
    fn blank_name_is_a_configuration_error() {
        let err = TextBetweenTagger::new([TextBetween::new(" ", "OPEN", "CLOSE")], false, false)
            .unwrap_err();
        assert!(matches!(err, ImporterError::MissingField { ref field, .. } if field == "name"));
        let err = TextBetweenTagger::new(Vec::new(), false, false).unwrap_err();
        assert!(matches!(err, ImporterError::MissingField { .. }));
    }

    #[test]
    fn malformed_regex_is_a_configuration_error() {
        let err = TextBetweenTagger::new([TextBetween::new("f", "(", "CLOSE")], false, false)
            .unwrap_err();
        assert!(matches!(err, ImporterError::InvalidPattern { .. }));
    }

    proptest! {
        #[test]
        fn exclusive_values_never_contain_delimiters(
            chunks in proptest::collection::vec("[a-z ]{0,6}", 1..6)
        ) {
            let text = chunks.join("[[x]]");
            let text = format!("{{{{{text}}}}}");
            let tagger = TextBetweenTagger::new(
                [TextBetween::new("f", r"\{\{", r"\}\}")],
                false,
                true,
            ).unwrap();
            let doc = tag(&tagger, &text);
            for value in doc.metadata.get_values("f") {
                prop_assert!(!value.contains("{{"));
                prop_assert!(!value.contains("}}"));
            }
        }
    }
}
