//! Restrictions: metadata conditions gating whether a handler applies.
//!
//! A handler carries a [`Restrictions`] set. The handler runs when the set is
//! empty, or when **any** restriction finds a match in **any** value of its
//! field. Patterns are compiled once, when the restriction is built, so an
//! invalid regex surfaces while the pipeline is assembled rather than in the
//! middle of a batch.

use crate::error::ImporterError;
use crate::metadata::Metadata;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

/// A single `(field, regex, case-sensitivity)` condition.
#[derive(Debug, Clone)]
pub struct Restriction {
    field: String,
    pattern: Regex,
    case_sensitive: bool,
}

impl Restriction {
    /// Compile a restriction. Case-insensitive matching uses Unicode case
    /// folding.
    pub fn new(
        field: impl Into<String>,
        pattern: &str,
        case_sensitive: bool,
    ) -> Result<Self, ImporterError> {
        let field = field.into();
        let compiled = RegexBuilder::new(pattern)
            .case_insensitive(!case_sensitive)
            .build()
            .map_err(|e| ImporterError::pattern(format!("restriction on '{field}'"), pattern, e))?;
        Ok(Self {
            field,
            pattern: compiled,
            case_sensitive,
        })
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }

    pub fn is_case_sensitive(&self) -> bool {
        self.case_sensitive
    }

    /// Whether any value of this restriction's field matches.
    pub fn matches(&self, metadata: &Metadata) -> bool {
        metadata
            .get_values(&self.field)
            .iter()
            .any(|value| self.pattern.is_match(value))
    }
}

/// Serialisable form of a [`Restriction`], as found in pipeline definitions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RestrictionSpec {
    pub field: String,
    pub pattern: String,
    #[serde(default)]
    pub case_sensitive: bool,
}

impl RestrictionSpec {
    pub fn compile(&self) -> Result<Restriction, ImporterError> {
        Restriction::new(self.field.clone(), &self.pattern, self.case_sensitive)
    }
}

/// An OR-combined set of restrictions. Empty means "always applies".
#[derive(Debug, Clone, Default)]
pub struct Restrictions {
    items: Vec<Restriction>,
}

impl Restrictions {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn new(items: Vec<Restriction>) -> Self {
        Self { items }
    }

    /// Compile a list of definition entries, failing on the first bad regex.
    pub fn compile(specs: &[RestrictionSpec]) -> Result<Self, ImporterError> {
        let items = specs
            .iter()
            .map(RestrictionSpec::compile)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { items })
    }

    /// Add a restriction, builder-style.
    pub fn with(
        mut self,
        field: impl Into<String>,
        pattern: &str,
        case_sensitive: bool,
    ) -> Result<Self, ImporterError> {
        self.items.push(Restriction::new(field, pattern, case_sensitive)?);
        Ok(self)
    }

    pub fn push(&mut self, restriction: Restriction) {
        self.items.push(restriction);
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Restriction> {
        self.items.iter()
    }

    /// `true` when the set is empty or any restriction matches.
    pub fn matches(&self, metadata: &Metadata) -> bool {
        self.items.is_empty() || self.items.iter().any(|r| r.matches(metadata))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn html_doc() -> Metadata {
        let mut m = Metadata::for_document("http://example.org/a");
        m.add_values("document.contentType", ["text/plain", "text/html"]);
        m
    }

    #[test]
    fn empty_set_always_matches() {
        assert!(Restrictions::none().matches(&Metadata::new()));
    }

    #[test]
    fn absent_field_never_matches() {
        let r = Restrictions::none().with("missing", ".*", false).unwrap();
        assert!(!r.matches(&html_doc()));
    }

    #[test]
    fn every_value_is_tested() {
        let r = Restrictions::none()
            .with("document.contentType", "^text/html$", true)
            .unwrap();
        assert!(r.matches(&html_doc()));
    }

    #[test]
    fn case_insensitive_by_flag() {
        let insensitive = Restriction::new("document.contentType", "TEXT/HTML", false).unwrap();
        let sensitive = Restriction::new("document.contentType", "TEXT/HTML", true).unwrap();
        assert!(insensitive.matches(&html_doc()));
        assert!(!sensitive.matches(&html_doc()));
    }

    #[test]
    fn unicode_case_folding() {
        let mut m = Metadata::new();
        m.set_value("city", "ÉCOLE");
        let r = Restriction::new("city", "école", false).unwrap();
        assert!(r.matches(&m));
    }

    #[test]
    fn any_restriction_suffices() {
        let r = Restrictions::none()
            .with("missing", "x", false)
            .unwrap()
            .with("document.reference", "example\\.org", false)
            .unwrap();
        assert!(r.matches(&html_doc()));
    }

    #[test]
    fn invalid_regex_fails_at_construction() {
        let err = Restriction::new("f", "([a-z", false).unwrap_err();
        assert!(matches!(err, ImporterError::InvalidPattern { .. }));
    }

    #[test]
    fn spec_defaults_to_case_insensitive() {
        let spec: RestrictionSpec =
            serde_json::from_str(r#"{"field":"f","pattern":"ABC"}"#).unwrap();
        assert!(!spec.case_sensitive);
        let mut m = Metadata::new();
        m.set_value("f", "xabcx");
        assert!(spec.compile().unwrap().matches(&m));
    }

    proptest! {
        #[test]
        fn matching_is_idempotent(values in proptest::collection::vec("[a-c]{0,4}", 0..4)) {
            let mut m = Metadata::new();
            m.add_values("f", values.clone());
            let r = Restrictions::none().with("f", "^ab", true).unwrap();
            let first = r.matches(&m);
            let second = r.matches(&m);
            prop_assert_eq!(first, second);
            prop_assert_eq!(first, values.iter().any(|v| v.starts_with("ab")));
            prop_assert_eq!(m.get_values("f"), values.as_slice());
        }
    }
}
