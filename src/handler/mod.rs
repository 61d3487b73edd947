//! Handler contracts and the built-in handlers.
//!
//! A handler has exactly one capability:
//!
//! | Kind | Trait | Effect |
//! |------|-------|--------|
//! | tagger   | [`DocumentTagger`]   | mutates the document's metadata (or content) |
//! | filter   | [`DocumentFilter`]   | inspects and returns a [`FilterDecision`] |
//! | splitter | [`DocumentSplitter`] | turns one document into ordered parts |
//!
//! The driver sees them through the closed [`Handler`] enum, wrapped in a
//! [`HandlerEntry`] that adds a name and the restriction set gating it.
//! Handlers are immutable once built and must be `Send + Sync` so a single
//! pipeline can serve many workers.

pub mod constant;
pub mod content_type;
pub mod dom;
pub mod parse;
pub mod regex_filter;
pub mod regex_split;
pub mod text_between;
pub mod uuid;

pub use constant::ConstantTagger;
pub use content_type::ContentTypeTagger;
pub use dom::DomTagger;
pub use parse::ParseTagger;
pub use regex_filter::{OnMatch, RegexContentFilter, RegexMetadataFilter};
pub use regex_split::RegexSplitter;
pub use text_between::{TextBetween, TextBetweenTagger};
pub use self::uuid::UuidTagger;

use crate::document::Document;
use crate::error::{HandlerError, ImporterError};
use crate::filter::FilterDecision;
use crate::metadata::Metadata;
use crate::restriction::Restrictions;
use regex::{Regex, RegexBuilder};
use std::fmt;

/// Adds or overwrites metadata without ever rejecting the document.
pub trait DocumentTagger: Send + Sync + fmt::Debug {
    fn tag(&self, doc: &mut Document) -> Result<(), HandlerError>;
}

/// Decides whether a document is kept. Filters only read.
pub trait DocumentFilter: Send + Sync + fmt::Debug {
    fn filter(&self, doc: &Document) -> Result<FilterDecision, HandlerError>;
}

/// One output part of a split.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SplitPart {
    pub content: Vec<u8>,
    /// Fields that override what the child inherits from its parent.
    pub fields: Metadata,
}

/// Turns one document into an ordered sequence of parts.
pub trait DocumentSplitter: Send + Sync + fmt::Debug {
    fn split(&self, doc: &Document) -> Result<Vec<SplitPart>, HandlerError>;
}

/// The closed set of handler capabilities.
#[derive(Debug)]
pub enum Handler {
    Tagger(Box<dyn DocumentTagger>),
    Filter(Box<dyn DocumentFilter>),
    Splitter {
        splitter: Box<dyn DocumentSplitter>,
        /// Parent fields children do not inherit.
        exclude_fields: Vec<String>,
    },
}

impl Handler {
    pub fn kind(&self) -> &'static str {
        match self {
            Handler::Tagger(_) => "tagger",
            Handler::Filter(_) => "filter",
            Handler::Splitter { .. } => "splitter",
        }
    }
}

/// A named handler together with the restrictions that gate it.
#[derive(Debug)]
pub struct HandlerEntry {
    pub name: String,
    pub restrictions: Restrictions,
    pub handler: Handler,
}

impl HandlerEntry {
    pub fn new(name: impl Into<String>, restrictions: Restrictions, handler: Handler) -> Self {
        Self {
            name: name.into(),
            restrictions,
            handler,
        }
    }

    pub fn applies_to(&self, metadata: &Metadata) -> bool {
        self.restrictions.matches(metadata)
    }
}

/// Compile a handler-level pattern, optionally case-insensitive and with
/// `.` matching newlines.
pub(crate) fn compile_pattern(
    context: &str,
    pattern: &str,
    case_sensitive: bool,
    dot_all: bool,
) -> Result<Regex, ImporterError> {
    RegexBuilder::new(pattern)
        .case_insensitive(!case_sensitive)
        .dot_matches_new_line(dot_all)
        .build()
        .map_err(|e| ImporterError::pattern(context, pattern, e))
}

/// Fail with [`ImporterError::MissingField`] when `value` is blank.
pub(crate) fn require(handler: &str, field: &str, value: &str) -> Result<(), ImporterError> {
    if value.trim().is_empty() {
        Err(ImporterError::missing(handler, field))
    } else {
        Ok(())
    }
}

/// Fail with [`ImporterError::MissingField`] when a pattern is empty.
/// Whitespace-only patterns such as `\n` are real delimiters.
pub(crate) fn require_pattern(handler: &str, field: &str, pattern: &str) -> Result<(), ImporterError> {
    if pattern.is_empty() {
        Err(ImporterError::missing(handler, field))
    } else {
        Ok(())
    }
}

/// Write `values` to `field`, replacing or appending.
pub(crate) fn store(metadata: &mut Metadata, field: &str, values: Vec<String>, overwrite: bool) {
    if overwrite {
        metadata.set_values(field, values);
    } else {
        metadata.add_values(field, values);
    }
}
