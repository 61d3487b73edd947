//! Batch entry points: run many documents through one pipeline.
//!
//! Every document is processed on the blocking pool (the handler chain is
//! CPU-bound regex and DOM work) with at most `config.concurrency` in flight.
//! [`import_batch`] waits for all of them; [`import_stream`] yields results
//! as documents complete. Split children are emitted individually.

use crate::document::Document;
use crate::error::ImporterError;
use crate::output::{BatchOutput, BatchStats, DocumentStatus, ImportResult};
use crate::pipeline::Pipeline;
use crate::progress::ProgressCallback;
use futures::stream::{self, StreamExt};
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio_stream::Stream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// A boxed stream of per-document results.
pub type ImportStream = Pin<Box<dyn Stream<Item = Result<ImportResult, ImporterError>> + Send>>;

/// Import a batch and wait for every document.
///
/// Results keep input order; children of a split document stay together in
/// split order.
///
/// # Errors
/// The first fatal error ends the batch: [`ImporterError::Cancelled`] when
/// `cancel` fires, [`ImporterError::HandlerFault`] under
/// [`crate::config::FaultPolicy::AbortBatch`]. Documents still in flight are
/// told to stop at their next handler boundary.
pub async fn import_batch(
    pipeline: Arc<Pipeline>,
    documents: Vec<Document>,
    cancel: CancellationToken,
) -> Result<BatchOutput, ImporterError> {
    let total_start = Instant::now();
    let total = documents.len();
    let config = pipeline.config();
    let callback = config.progress_callback.clone();
    info!(
        "Starting import of {} document(s), concurrency {}",
        total, config.concurrency
    );
    if let Some(ref cb) = callback {
        cb.on_batch_start(total);
    }

    // Stop the rest of the batch on the first fatal error without touching
    // the caller's token.
    let batch_cancel = cancel.child_token();
    let mut in_flight = stream::iter(documents.into_iter().enumerate().map(|(idx, doc)| {
        let pipeline = Arc::clone(&pipeline);
        let token = batch_cancel.clone();
        async move { (idx, process_one(pipeline, doc, token).await) }
    }))
    .buffer_unordered(config.concurrency);

    let mut collected: Vec<(usize, Vec<ImportResult>)> = Vec::with_capacity(total);
    while let Some((idx, outcome)) = in_flight.next().await {
        match outcome {
            Ok(results) => collected.push((idx, results)),
            Err(e) => {
                warn!("Import aborted: {}", e);
                batch_cancel.cancel();
                return Err(e);
            }
        }
    }

    collected.sort_by_key(|(idx, _)| *idx);
    let results: Vec<ImportResult> = collected.into_iter().flat_map(|(_, r)| r).collect();

    let accepted = results.iter().filter(|r| r.is_accepted()).count();
    let stats = BatchStats {
        input_documents: total,
        output_documents: results.len(),
        accepted,
        rejected: results.len() - accepted,
        total_duration_ms: total_start.elapsed().as_millis() as u64,
    };
    info!(
        "Import complete: {} accepted, {} rejected, {}ms total",
        stats.accepted, stats.rejected, stats.total_duration_ms
    );
    if let Some(ref cb) = callback {
        cb.on_batch_complete(total, stats.accepted, stats.rejected);
    }

    Ok(BatchOutput { results, stats })
}

/// Import a batch, yielding results in completion order.
///
/// A fatal error for one document is yielded in its place; the stream keeps
/// going for the others unless `cancel` fires. The progress callback sees
/// `on_batch_start` when the stream is created and `on_batch_complete` once
/// the last result has been yielded. A stream dropped early never completes.
pub fn import_stream(
    pipeline: Arc<Pipeline>,
    documents: Vec<Document>,
    cancel: CancellationToken,
) -> ImportStream {
    let total = documents.len();
    let concurrency = pipeline.config().concurrency;
    let callback = pipeline.config().progress_callback.clone();
    info!("Starting streaming import of {} document(s)", total);
    if let Some(ref cb) = callback {
        cb.on_batch_start(total);
    }

    let counts = Arc::new(StreamCounts::default());
    let results = stream::iter(documents.into_iter().map(move |doc| {
        let pipeline = Arc::clone(&pipeline);
        let token = cancel.clone();
        async move { process_one(pipeline, doc, token).await }
    }))
    .buffer_unordered(concurrency)
    .flat_map(|outcome| {
        let items: Vec<Result<ImportResult, ImporterError>> = match outcome {
            Ok(results) => results.into_iter().map(Ok).collect(),
            Err(e) => vec![Err(e)],
        };
        stream::iter(items)
    })
    .inspect({
        let counts = Arc::clone(&counts);
        move |item| counts.record(item)
    });

    let complete = stream::once(async move {
        let accepted = counts.accepted.load(Ordering::SeqCst);
        let rejected = counts.rejected.load(Ordering::SeqCst);
        info!(
            "Streaming import complete: {} accepted, {} rejected",
            accepted, rejected
        );
        if let Some(ref cb) = callback {
            cb.on_batch_complete(total, accepted, rejected);
        }
    })
    .filter_map(|()| async { None::<Result<ImportResult, ImporterError>> });

    Box::pin(results.chain(complete))
}

/// Synchronous wrapper around [`import_batch`].
///
/// Creates a temporary tokio runtime internally.
pub fn import_sync(
    pipeline: Arc<Pipeline>,
    documents: Vec<Document>,
) -> Result<BatchOutput, ImporterError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| ImporterError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(import_batch(pipeline, documents, CancellationToken::new()))
}

// ── Internal helpers ─────────────────────────────────────────────────────

async fn process_one(
    pipeline: Arc<Pipeline>,
    doc: Document,
    cancel: CancellationToken,
) -> Result<Vec<ImportResult>, ImporterError> {
    let reference = doc.reference.clone();
    let callback = pipeline.config().progress_callback.clone();
    if let Some(ref cb) = callback {
        cb.on_document_start(&reference);
    }

    let worker = Arc::clone(&pipeline);
    let outcome = tokio::task::spawn_blocking(move || worker.process(doc, &cancel))
        .await
        .map_err(|e| ImporterError::Internal(format!("worker for {reference} failed: {e}")))
        .and_then(|r| r);

    if let Some(ref cb) = callback {
        notify(cb, &reference, &outcome);
        cb.on_document_complete(&reference, outcome.as_ref().map_or(0, Vec::len));
    }
    if let Ok(ref results) = outcome {
        debug!("{}: {} result(s)", reference, results.len());
    }
    outcome
}

fn notify(
    cb: &ProgressCallback,
    reference: &str,
    outcome: &Result<Vec<ImportResult>, ImporterError>,
) {
    match outcome {
        Ok(results) => {
            for result in results {
                match &result.status {
                    DocumentStatus::Accepted => cb.on_document_accepted(&result.document.reference),
                    DocumentStatus::Rejected { decision } => {
                        cb.on_document_rejected(&result.document.reference, &decision.to_string())
                    }
                }
            }
        }
        Err(e) => cb.on_document_error(reference, &e.to_string()),
    }
}

#[derive(Default)]
struct StreamCounts {
    accepted: AtomicUsize,
    rejected: AtomicUsize,
}

impl StreamCounts {
    fn record(&self, item: &Result<ImportResult, ImporterError>) {
        let counter = match item {
            Ok(result) if result.is_accepted() => &self.accepted,
            Ok(_) => &self.rejected,
            Err(_) => return,
        };
        counter.fetch_add(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FaultPolicy, ImporterConfig, SplitPolicy};
    use crate::error::HandlerError;
    use crate::handler::{DocumentTagger, OnMatch, RegexContentFilter, RegexSplitter};
    use crate::progress::ImportProgressCallback;
    use crate::restriction::Restrictions;

    fn keep_english(config: ImporterConfig) -> Arc<Pipeline> {
        Arc::new(
            Pipeline::builder(config)
                .filter(
                    "english",
                    Restrictions::none(),
                    RegexContentFilter::new(r"\bthe\b", false, OnMatch::Include).unwrap(),
                )
                .build()
                .unwrap(),
        )
    }

    fn docs() -> Vec<Document> {
        vec![
            Document::new("a", "The cat"),
            Document::new("b", "le chat"),
            Document::new("c", "over the moon"),
        ]
    }

    #[derive(Default)]
    struct Counter {
        batch_started: AtomicUsize,
        started: AtomicUsize,
        accepted: AtomicUsize,
        rejected: AtomicUsize,
        finished_inputs: AtomicUsize,
        outputs: AtomicUsize,
        completed: AtomicUsize,
        final_accepted: AtomicUsize,
    }

    impl ImportProgressCallback for Counter {
        fn on_batch_start(&self, _: usize) {
            self.batch_started.fetch_add(1, Ordering::SeqCst);
        }
        fn on_document_start(&self, _: &str) {
            self.started.fetch_add(1, Ordering::SeqCst);
        }
        fn on_document_accepted(&self, _: &str) {
            self.accepted.fetch_add(1, Ordering::SeqCst);
        }
        fn on_document_rejected(&self, _: &str, _: &str) {
            self.rejected.fetch_add(1, Ordering::SeqCst);
        }
        fn on_document_complete(&self, _: &str, outputs: usize) {
            self.finished_inputs.fetch_add(1, Ordering::SeqCst);
            self.outputs.fetch_add(outputs, Ordering::SeqCst);
        }
        fn on_batch_complete(&self, _: usize, accepted: usize, _: usize) {
            self.completed.fetch_add(1, Ordering::SeqCst);
            self.final_accepted.store(accepted, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn batch_keeps_input_order_and_counts() {
        let counter = Arc::new(Counter::default());
        let config = ImporterConfig::builder()
            .concurrency(2)
            .progress_callback(counter.clone())
            .build()
            .unwrap();
        let out = import_batch(keep_english(config), docs(), CancellationToken::new())
            .await
            .unwrap();

        let refs: Vec<_> = out.results.iter().map(|r| r.document.reference.as_str()).collect();
        assert_eq!(refs, ["a", "b", "c"]);
        assert_eq!(out.stats.accepted, 2);
        assert_eq!(out.stats.rejected, 1);
        assert_eq!(out.rejected().next().unwrap().document.reference, "b");

        assert_eq!(counter.started.load(Ordering::SeqCst), 3);
        assert_eq!(counter.accepted.load(Ordering::SeqCst), 2);
        assert_eq!(counter.rejected.load(Ordering::SeqCst), 1);
        assert_eq!(counter.completed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn split_children_are_counted_individually() {
        let counter = Arc::new(Counter::default());
        let config = ImporterConfig::builder()
            .split_policy(SplitPolicy::Terminal)
            .progress_callback(counter.clone())
            .build()
            .unwrap();
        let pipeline = Arc::new(
            Pipeline::builder(config)
                .splitter(
                    "pages",
                    Restrictions::none(),
                    RegexSplitter::new("\u{c}", true).unwrap(),
                    vec![],
                )
                .build()
                .unwrap(),
        );
        let out = import_batch(
            pipeline,
            vec![Document::new("book", "p1\u{c}p2\u{c}p3")],
            CancellationToken::new(),
        )
        .await
        .unwrap();
        assert_eq!(out.stats.input_documents, 1);
        assert_eq!(out.stats.output_documents, 3);
        assert_eq!(out.results[2].document.reference, "book!3");

        // One completion per input, however many children it produced.
        assert_eq!(counter.accepted.load(Ordering::SeqCst), 3);
        assert_eq!(counter.finished_inputs.load(Ordering::SeqCst), 1);
        assert_eq!(counter.outputs.load(Ordering::SeqCst), 3);
    }

    #[derive(Debug)]
    struct Explodes;

    impl DocumentTagger for Explodes {
        fn tag(&self, _: &mut Document) -> Result<(), HandlerError> {
            Err(HandlerError::Other("boom".into()))
        }
    }

    #[tokio::test]
    async fn abort_batch_fault_fails_the_batch() {
        let config = ImporterConfig::builder()
            .fault_policy(FaultPolicy::AbortBatch)
            .build()
            .unwrap();
        let pipeline = Arc::new(
            Pipeline::builder(config)
                .tagger("explodes", Restrictions::none(), Explodes)
                .build()
                .unwrap(),
        );
        let caller = CancellationToken::new();
        let err = import_batch(pipeline, docs(), caller.clone()).await.unwrap_err();
        assert!(matches!(err, ImporterError::HandlerFault { ref handler, .. } if handler == "explodes"));
        assert!(!caller.is_cancelled());
    }

    #[tokio::test]
    async fn cancelled_batch_reports_cancellation() {
        let token = CancellationToken::new();
        token.cancel();
        let err = import_batch(keep_english(ImporterConfig::default()), docs(), token)
            .await
            .unwrap_err();
        assert!(matches!(err, ImporterError::Cancelled { .. }));
    }

    #[tokio::test]
    async fn stream_yields_every_result() {
        let mut s = import_stream(
            keep_english(ImporterConfig::default()),
            docs(),
            CancellationToken::new(),
        );
        let mut seen = Vec::new();
        while let Some(item) = s.next().await {
            seen.push(item.unwrap().document.reference);
        }
        seen.sort();
        assert_eq!(seen, ["a", "b", "c"]);
    }

    #[tokio::test]
    async fn stream_reports_batch_start_and_completion() {
        let counter = Arc::new(Counter::default());
        let config = ImporterConfig::builder()
            .progress_callback(counter.clone())
            .build()
            .unwrap();
        let s = import_stream(keep_english(config), docs(), CancellationToken::new());
        assert_eq!(counter.batch_started.load(Ordering::SeqCst), 1);

        let items: Vec<_> = s.collect().await;
        assert_eq!(items.len(), 3);
        assert_eq!(counter.completed.load(Ordering::SeqCst), 1);
        assert_eq!(counter.final_accepted.load(Ordering::SeqCst), 2);
        assert_eq!(counter.finished_inputs.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn sync_wrapper_runs_batch() {
        let out = import_sync(keep_english(ImporterConfig::default()), docs()).unwrap();
        assert_eq!(out.stats.output_documents, 3);
    }
}
