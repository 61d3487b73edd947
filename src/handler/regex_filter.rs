//! Regex filters over metadata values or document content.

use super::{compile_pattern, require, require_pattern, DocumentFilter};
use crate::document::Document;
use crate::error::{HandlerError, ImporterError};
use crate::filter::FilterDecision;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// What a pattern match means for the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnMatch {
    /// Keep documents that match; reject the rest. (default)
    #[default]
    Include,
    /// Reject documents that match.
    Exclude,
}

impl OnMatch {
    fn decide(self, matched: bool, what: impl FnOnce() -> String) -> FilterDecision {
        match (self, matched) {
            (OnMatch::Include, true) | (OnMatch::Exclude, false) => FilterDecision::accepted(),
            (OnMatch::Include, false) => {
                FilterDecision::rejected_with(format!("{} does not match", what()))
            }
            (OnMatch::Exclude, true) => {
                FilterDecision::rejected_with(format!("{} matches an exclusion", what()))
            }
        }
    }
}

/// Keeps or drops documents depending on whether a metadata field has a
/// value matching `pattern`. An absent field never matches.
#[derive(Debug, Clone)]
pub struct RegexMetadataFilter {
    field: String,
    pattern: Regex,
    on_match: OnMatch,
}

impl RegexMetadataFilter {
    pub fn new(
        field: impl Into<String>,
        pattern: &str,
        case_sensitive: bool,
        on_match: OnMatch,
    ) -> Result<Self, ImporterError> {
        let field = field.into();
        require("regex_metadata", "field", &field)?;
        require_pattern("regex_metadata", "pattern", pattern)?;
        Ok(Self {
            pattern: compile_pattern(
                &format!("regex_metadata filter on '{field}'"),
                pattern,
                case_sensitive,
                false,
            )?,
            field,
            on_match,
        })
    }
}

impl DocumentFilter for RegexMetadataFilter {
    fn filter(&self, doc: &Document) -> Result<FilterDecision, HandlerError> {
        let matched = doc
            .metadata
            .get_values(&self.field)
            .iter()
            .any(|v| self.pattern.is_match(v));
        Ok(self.on_match.decide(matched, || {
            format!("field '{}' against /{}/", self.field, self.pattern.as_str())
        }))
    }
}

/// Keeps or drops documents depending on whether the content matches
/// `pattern` (with `.` matching newlines).
#[derive(Debug, Clone)]
pub struct RegexContentFilter {
    pattern: Regex,
    on_match: OnMatch,
}

impl RegexContentFilter {
    pub fn new(pattern: &str, case_sensitive: bool, on_match: OnMatch) -> Result<Self, ImporterError> {
        require_pattern("regex_content", "pattern", pattern)?;
        Ok(Self {
            pattern: compile_pattern("regex_content filter", pattern, case_sensitive, true)?,
            on_match,
        })
    }
}

impl DocumentFilter for RegexContentFilter {
    fn filter(&self, doc: &Document) -> Result<FilterDecision, HandlerError> {
        let matched = self.pattern.is_match(&doc.text());
        Ok(self
            .on_match
            .decide(matched, || format!("content against /{}/", self.pattern.as_str())))
    }
}
