//! Error types for the edgequake-importer library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`ImporterError`] is **fatal**: the pipeline cannot be assembled (bad
//!   regex, missing handler parameter, malformed definition) or a batch was
//!   aborted. Returned as `Err(ImporterError)` from pipeline construction and
//!   from the `import*` entry points.
//!
//! * [`HandlerError`] is **per-document**: a handler or one of its
//!   collaborators failed on a single document (corrupt markup, parser
//!   crash). Depending on [`crate::config::FaultPolicy`] the driver either
//!   turns it into a rejection for that document or escalates it to
//!   [`ImporterError::HandlerFault`].
//!
//! Extraction misses and filter rejections are not errors at all.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the edgequake-importer library.
#[derive(Debug, Error)]
pub enum ImporterError {
    // ── Configuration errors ──────────────────────────────────────────────
    /// A restriction, delimiter or filter pattern failed to compile.
    #[error("Invalid regular expression in {context}: '{pattern}'\n{source}")]
    InvalidPattern {
        context: String,
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// A handler was configured without one of its required parameters.
    #[error("Handler '{handler}' is missing required parameter '{field}'")]
    MissingField { handler: String, field: String },

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Definition loading ────────────────────────────────────────────────
    /// The JSON pipeline definition could not be deserialised.
    #[error("Invalid pipeline definition: {0}")]
    InvalidDefinition(String),

    /// The pipeline definition file could not be read.
    #[error("Failed to read pipeline definition '{path}': {source}")]
    DefinitionIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Runtime ───────────────────────────────────────────────────────────
    /// A handler failed and the active fault policy aborts the batch.
    #[error("Handler '{handler}' failed on document '{reference}': {source}")]
    HandlerFault {
        reference: String,
        handler: String,
        #[source]
        source: HandlerError,
    },

    /// Processing was cancelled between two handler invocations.
    #[error("Processing of '{reference}' was cancelled")]
    Cancelled { reference: String },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ImporterError {
    /// Wrap a `regex::Error` raised while compiling `pattern`.
    pub(crate) fn pattern(context: impl Into<String>, pattern: &str, source: regex::Error) -> Self {
        ImporterError::InvalidPattern {
            context: context.into(),
            pattern: pattern.to_string(),
            source,
        }
    }

    pub(crate) fn missing(handler: impl Into<String>, field: impl Into<String>) -> Self {
        ImporterError::MissingField {
            handler: handler.into(),
            field: field.into(),
        }
    }
}

/// A failure scoped to a single document.
///
/// Stored in rejection descriptions when the fault policy is
/// [`crate::config::FaultPolicy::RejectDocument`].
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize, serde::Deserialize)]
pub enum HandlerError {
    /// An external collaborator (parser, detector) reported a failure.
    #[error("{collaborator} failed: {detail}")]
    Collaborator { collaborator: String, detail: String },

    /// The markup parser rejected a selector.
    #[error("Unsupported selector '{selector}': {detail}")]
    UnsupportedSelector { selector: String, detail: String },

    /// Any other handler-specific failure.
    #[error("{0}")]
    Other(String),
}

impl HandlerError {
    pub fn collaborator(collaborator: impl Into<String>, detail: impl ToString) -> Self {
        HandlerError::Collaborator {
            collaborator: collaborator.into(),
            detail: detail.to_string(),
        }
    }
}
