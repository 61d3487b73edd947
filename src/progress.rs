//! Progress-callback trait for per-document import events.
//!
//! Inject an [`Arc<dyn ImportProgressCallback>`] via
//! [`crate::config::ImporterConfigBuilder::progress_callback`] to receive
//! events as the batch runner processes each document.
//!
//! # Example
//!
//! ```rust
//! use edgequake_importer::{ImportProgressCallback, ImporterConfig};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     rejected: AtomicUsize,
//! }
//!
//! impl ImportProgressCallback for CountingCallback {
//!     fn on_document_rejected(&self, reference: &str, reason: &str) {
//!         self.rejected.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("{reference} rejected: {reason}");
//!     }
//! }
//!
//! let config = ImporterConfig::builder()
//!     .progress_callback(Arc::new(CountingCallback { rejected: AtomicUsize::new(0) }))
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the batch runner as it processes each document.
///
/// Implementations must be `Send + Sync`: documents are processed
/// concurrently and events for different documents may interleave. All
/// methods default to no-ops.
pub trait ImportProgressCallback: Send + Sync {
    /// Called once before any document is processed.
    fn on_batch_start(&self, total_documents: usize) {
        let _ = total_documents;
    }

    /// Called just before a document enters the handler chain.
    fn on_document_start(&self, reference: &str) {
        let _ = reference;
    }

    /// Called when a document (or one of its split children) is accepted.
    fn on_document_accepted(&self, reference: &str) {
        let _ = reference;
    }

    /// Called when a document (or one of its split children) is rejected.
    fn on_document_rejected(&self, reference: &str, reason: &str) {
        let _ = (reference, reason);
    }

    /// Called when a document could not be processed at all (cancellation,
    /// aborting fault).
    fn on_document_error(&self, reference: &str, error: &str) {
        let _ = (reference, error);
    }

    /// Called once per input document after it leaves the handler chain,
    /// with the number of results it produced (split children included, zero
    /// on error). Fires after the per-result events for that document.
    fn on_document_complete(&self, reference: &str, outputs: usize) {
        let _ = (reference, outputs);
    }

    /// Called once after every document has been attempted.
    fn on_batch_complete(&self, total_documents: usize, accepted: usize, rejected: usize) {
        let _ = (total_documents, accepted, rejected);
    }
}

/// A no-op implementation, the default when no callback is configured.
pub struct NoopProgressCallback;

impl ImportProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ImporterConfig`].
pub type ProgressCallback = Arc<dyn ImportProgressCallback>;
