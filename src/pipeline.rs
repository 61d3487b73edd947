//! The pipeline driver.
//!
//! ## Per-document state machine
//!
//! ```text
//! PENDING
//!   │
//!   ├─ for each handler ──▶ RESTRICTION_CHECK ──▶ SKIPPED
//!   │                                        └──▶ APPLIED ── tagger:   mutate metadata
//!   │                                                     ├─ filter:   record decision
//!   │                                                     └─ splitter: replace document by children
//!   ▼
//! ACCEPTED | REJECTED
//! ```
//!
//! Under `FilterPolicy::All` the first rejection is terminal and the
//! remaining handlers never run. Under `FilterPolicy::Any` rejections are
//! held back until the chain ends, and the document is rejected only if no
//! applied filter accepted it.
//!
//! A splitter replaces its input by ordered children. With
//! [`SplitPolicy::Continue`] each child runs the handlers that follow the
//! splitter; with [`SplitPolicy::Terminal`] the chain stops at the splitter
//! and every child takes the verdict of the filters that ran before it. A
//! child of an otherwise unfiltered document is accepted.
//!
//! Cancellation is checked before every handler. Handlers themselves are
//! never interrupted.

use crate::config::{FaultPolicy, ImporterConfig, SplitPolicy};
use crate::document::Document;
use crate::error::{HandlerError, ImporterError};
use crate::filter::{FilterDecision, FilterTally};
use crate::handler::{
    DocumentFilter, DocumentSplitter, DocumentTagger, Handler, HandlerEntry, SplitPart,
};
use crate::metadata::{
    DOC_CONTENT_LENGTH, DOC_EMBEDDED_INDEX, DOC_PARENT_REFERENCE, DOC_REFERENCE,
};
use crate::output::{DocumentStatus, ImportResult, StageOutcome, StageRecord};
use crate::restriction::Restrictions;
use std::collections::HashSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// An assembled, immutable handler chain.
///
/// `Pipeline` is `Send + Sync`; wrap it in an `Arc` to share it between
/// workers.
#[derive(Debug)]
pub struct Pipeline {
    handlers: Vec<HandlerEntry>,
    config: ImporterConfig,
    split_policy: SplitPolicy,
}

impl Pipeline {
    pub fn builder(config: ImporterConfig) -> PipelineBuilder {
        PipelineBuilder {
            config,
            handlers: Vec::new(),
        }
    }

    pub fn config(&self) -> &ImporterConfig {
        &self.config
    }

    pub fn handlers(&self) -> &[HandlerEntry] {
        &self.handlers
    }

    /// Run one document through the chain.
    ///
    /// Returns one result per output document: a single entry unless a
    /// splitter ran, in which case there is one per child (possibly none).
    ///
    /// # Errors
    /// [`ImporterError::Cancelled`] when `cancel` fires between handlers, and
    /// [`ImporterError::HandlerFault`] when a handler fails under
    /// [`FaultPolicy::AbortBatch`].
    pub fn process(
        &self,
        doc: Document,
        cancel: &CancellationToken,
    ) -> Result<Vec<ImportResult>, ImporterError> {
        let tally = FilterTally::new(self.config.filter_policy);
        self.run(doc, 0, Vec::new(), tally, cancel)
    }

    fn run(
        &self,
        mut doc: Document,
        from: usize,
        mut stages: Vec<StageRecord>,
        mut tally: FilterTally,
        cancel: &CancellationToken,
    ) -> Result<Vec<ImportResult>, ImporterError> {
        for (index, entry) in self.handlers.iter().enumerate().skip(from) {
            if cancel.is_cancelled() {
                return Err(ImporterError::Cancelled {
                    reference: doc.reference,
                });
            }

            if !entry.applies_to(&doc.metadata) {
                debug!("{}: skipped '{}' (restrictions)", doc.reference, entry.name);
                stages.push(record(entry, StageOutcome::Skipped));
                continue;
            }

            match &entry.handler {
                Handler::Tagger(tagger) => {
                    stages.push(record(entry, StageOutcome::Applied));
                    if let Err(e) = tagger.tag(&mut doc) {
                        return self.fault(doc, entry, e, stages);
                    }
                }

                Handler::Filter(filter) => {
                    if !tally.wants_more() {
                        stages.push(record(entry, StageOutcome::Skipped));
                        continue;
                    }
                    stages.push(record(entry, StageOutcome::Applied));
                    let decision = match filter.filter(&doc) {
                        Ok(d) => d.attributed_to(&entry.name),
                        Err(e) => return self.fault(doc, entry, e, stages),
                    };
                    if let Some(rejection) = tally.record(decision) {
                        debug!("{}: {}", doc.reference, rejection);
                        return Ok(vec![finish(doc, rejection, stages)]);
                    }
                }

                Handler::Splitter {
                    splitter,
                    exclude_fields,
                } => {
                    stages.push(record(entry, StageOutcome::Applied));
                    let parts = match splitter.split(&doc) {
                        Ok(parts) => parts,
                        Err(e) => return self.fault(doc, entry, e, stages),
                    };
                    debug!(
                        "{}: '{}' produced {} part(s)",
                        doc.reference,
                        entry.name,
                        parts.len()
                    );
                    let children = derive_children(&doc, parts, exclude_fields);

                    let mut results = Vec::with_capacity(children.len());
                    for child in children {
                        match self.split_policy {
                            SplitPolicy::Continue => results.extend(self.run(
                                child,
                                index + 1,
                                stages.clone(),
                                tally.clone(),
                                cancel,
                            )?),
                            SplitPolicy::Terminal => results.push(finish(
                                child,
                                tally.clone().finish(),
                                stages.clone(),
                            )),
                        }
                    }
                    return Ok(results);
                }
            }
        }

        let verdict = tally.finish();
        Ok(vec![finish(doc, verdict, stages)])
    }

    fn fault(
        &self,
        doc: Document,
        entry: &HandlerEntry,
        error: HandlerError,
        stages: Vec<StageRecord>,
    ) -> Result<Vec<ImportResult>, ImporterError> {
        match self.config.fault_policy {
            FaultPolicy::RejectDocument => {
                warn!(
                    "Handler '{}' failed on {}: {}; rejecting document",
                    entry.name, doc.reference, error
                );
                let decision =
                    FilterDecision::rejected(entry.name.clone(), format!("handler fault: {error}"));
                Ok(vec![finish(doc, decision, stages)])
            }
            FaultPolicy::AbortBatch => Err(ImporterError::HandlerFault {
                reference: doc.reference,
                handler: entry.name.clone(),
                source: error,
            }),
        }
    }
}

fn record(entry: &HandlerEntry, outcome: StageOutcome) -> StageRecord {
    StageRecord {
        handler: entry.name.clone(),
        outcome,
    }
}

fn finish(document: Document, verdict: FilterDecision, stages: Vec<StageRecord>) -> ImportResult {
    let status = if verdict.is_rejected() {
        DocumentStatus::Rejected { decision: verdict }
    } else {
        DocumentStatus::Accepted
    };
    ImportResult {
        document,
        status,
        stages,
    }
}

/// Build child documents: inherit the parent's metadata minus `exclude`,
/// then let the part's own fields override.
fn derive_children(parent: &Document, parts: Vec<SplitPart>, exclude: &[String]) -> Vec<Document> {
    parts
        .into_iter()
        .enumerate()
        .map(|(i, part)| {
            let position = i + 1;
            let reference = format!("{}!{}", parent.reference, position);
            let mut metadata = parent.metadata.derive_child(exclude);
            for (field, values) in part.fields.iter() {
                metadata.set_values(field, values.iter().cloned());
            }
            metadata.set_value(DOC_REFERENCE, reference.clone());
            metadata.set_value(DOC_PARENT_REFERENCE, parent.reference.clone());
            metadata.set_value(DOC_EMBEDDED_INDEX, position.to_string());
            metadata.set_value(DOC_CONTENT_LENGTH, part.content.len().to_string());
            Document::with_metadata(reference, part.content, metadata)
        })
        .collect()
}

/// Assembles a [`Pipeline`] from handlers in execution order.
#[derive(Debug)]
pub struct PipelineBuilder {
    config: ImporterConfig,
    handlers: Vec<HandlerEntry>,
}

impl PipelineBuilder {
    pub fn tagger(
        self,
        name: impl Into<String>,
        restrictions: Restrictions,
        tagger: impl DocumentTagger + 'static,
    ) -> Self {
        self.handler(HandlerEntry::new(
            name,
            restrictions,
            Handler::Tagger(Box::new(tagger)),
        ))
    }

    pub fn filter(
        self,
        name: impl Into<String>,
        restrictions: Restrictions,
        filter: impl DocumentFilter + 'static,
    ) -> Self {
        self.handler(HandlerEntry::new(
            name,
            restrictions,
            Handler::Filter(Box::new(filter)),
        ))
    }

    pub fn splitter(
        self,
        name: impl Into<String>,
        restrictions: Restrictions,
        splitter: impl DocumentSplitter + 'static,
        exclude_fields: Vec<String>,
    ) -> Self {
        self.handler(HandlerEntry::new(
            name,
            restrictions,
            Handler::Splitter {
                splitter: Box::new(splitter),
                exclude_fields,
            },
        ))
    }

    pub fn handler(mut self, entry: HandlerEntry) -> Self {
        self.handlers.push(entry);
        self
    }

    /// Validate and freeze the chain.
    ///
    /// # Errors
    /// [`ImporterError::InvalidConfig`] for blank or duplicate handler names,
    /// or when a splitter is present but no [`SplitPolicy`] was chosen.
    pub fn build(self) -> Result<Pipeline, ImporterError> {
        let mut seen = HashSet::new();
        for entry in &self.handlers {
            if entry.name.trim().is_empty() {
                return Err(ImporterError::InvalidConfig(format!(
                    "a {} has a blank name",
                    entry.handler.kind()
                )));
            }
            if !seen.insert(entry.name.as_str()) {
                return Err(ImporterError::InvalidConfig(format!(
                    "duplicate handler name '{}'",
                    entry.name
                )));
            }
        }

        let has_splitter = self
            .handlers
            .iter()
            .any(|e| matches!(e.handler, Handler::Splitter { .. }));
        let split_policy = match (self.config.split_policy, has_splitter) {
            (Some(policy), _) => policy,
            (None, false) => SplitPolicy::Terminal,
            (None, true) => {
                return Err(ImporterError::InvalidConfig(
                    "pipeline contains a splitter: choose a split policy (continue or terminal)"
                        .into(),
                ))
            }
        };

        debug!(
            "Pipeline assembled: {} handler(s), filter policy {:?}",
            self.handlers.len(),
            self.config.filter_policy
        );
        Ok(Pipeline {
            handlers: self.handlers,
            config: self.config,
            split_policy,
        })
    }
}
