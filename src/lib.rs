//! # edgequake-importer
//!
//! A document import pipeline: an ordered chain of handlers that tags,
//! filters and splits documents on their way into an index.
//!
//! ## Pipeline Overview
//!
//! ```text
//! Document (reference + bytes + metadata)
//!  │
//!  ├─ for each handler, in order:
//!  │     restrictions match?  no ──▶ skipped
//!  │                          yes ─▶ tagger   adds / overwrites metadata
//!  │                                 filter   accepts or rejects
//!  │                                 splitter replaces the document by children
//!  ▼
//! ImportResult (accepted | rejected + reason, per output document)
//! ```
//!
//! Handlers are gated by [`Restrictions`]: `(field, regex)` pairs matched
//! against metadata values, any one of which lets the handler run.
//! The [`TextBetweenTagger`] copies every span between a start and an end
//! pattern into a metadata field; [`DomTagger`] does the same for CSS
//! selectors over HTML.
//!
//! ## Quick Start
//!
//! ```rust
//! use edgequake_importer::{load_pipeline, Document};
//! use tokio_util::sync::CancellationToken;
//!
//! let pipeline = load_pipeline(r#"{
//!     "handlers": [
//!         { "type": "text_between", "name": "subject",
//!           "pairs": [{ "name": "subject", "start": "Subject:", "end": "\n" }] },
//!         { "type": "regex_metadata", "name": "has-subject",
//!           "field": "subject", "pattern": "\\S" }
//!     ]
//! }"#).unwrap();
//!
//! let doc = Document::new("mail-1", "Subject: quarterly numbers\nBody");
//! let results = pipeline.process(doc, &CancellationToken::new()).unwrap();
//! assert!(results[0].is_accepted());
//! assert_eq!(results[0].document.metadata.get_values("subject"), [" quarterly numbers"]);
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `importer` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! edgequake-importer = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod collaborator;
pub mod config;
pub mod document;
pub mod error;
pub mod filter;
pub mod handler;
pub mod import;
pub mod loader;
pub mod metadata;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod restriction;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use collaborator::{
    BinaryParser, ContentTypeDetector, Extract, HtmlParser, MarkupParser, ParsedContent,
    SniffingDetector,
};
pub use config::{FaultPolicy, FilterPolicy, ImporterConfig, ImporterConfigBuilder, SplitPolicy};
pub use document::Document;
pub use error::{HandlerError, ImporterError};
pub use filter::{FilterDecision, FilterTally};
pub use handler::{
    ConstantTagger, ContentTypeTagger, DocumentFilter, DocumentSplitter, DocumentTagger,
    DomTagger, Handler, HandlerEntry, OnMatch, ParseTagger, RegexContentFilter,
    RegexMetadataFilter, RegexSplitter, SplitPart, TextBetween, TextBetweenTagger, UuidTagger,
};
pub use import::{import_batch, import_stream, import_sync, ImportStream};
pub use loader::{load_pipeline, load_pipeline_file, HandlerSpec, PipelineDefinition};
pub use metadata::Metadata;
pub use output::{BatchOutput, BatchStats, DocumentStatus, ImportResult, StageOutcome, StageRecord};
pub use pipeline::{Pipeline, PipelineBuilder};
pub use progress::{ImportProgressCallback, NoopProgressCallback, ProgressCallback};
pub use restriction::{Restriction, RestrictionSpec, Restrictions};
