//! Output types produced by the pipeline driver and the batch runner.

use crate::document::Document;
use crate::filter::FilterDecision;
use serde::{Deserialize, Serialize};

/// Terminal state of one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DocumentStatus {
    /// Every filter stage passed; taggers and splitters ran.
    Accepted,
    /// A filter stage (or a converted handler fault) rejected the document.
    Rejected { decision: FilterDecision },
}

/// What happened at one handler for one document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageOutcome {
    /// Restrictions did not match; the handler was not invoked.
    Skipped,
    /// The handler ran.
    Applied,
}

/// Trace entry for one handler visit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageRecord {
    pub handler: String,
    pub outcome: StageOutcome,
}

/// Final result for one document (or one split child).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportResult {
    pub document: Document,
    #[serde(flatten)]
    pub status: DocumentStatus,
    /// Handler visits in order, including those inherited from a parent
    /// before it was split.
    pub stages: Vec<StageRecord>,
}

impl ImportResult {
    pub fn is_accepted(&self) -> bool {
        matches!(self.status, DocumentStatus::Accepted)
    }

    pub fn is_rejected(&self) -> bool {
        !self.is_accepted()
    }

    /// The rejection decision, if any.
    pub fn rejection(&self) -> Option<&FilterDecision> {
        match &self.status {
            DocumentStatus::Rejected { decision } => Some(decision),
            DocumentStatus::Accepted => None,
        }
    }

    /// Names of the handlers that actually ran.
    pub fn applied_handlers(&self) -> impl Iterator<Item = &str> {
        self.stages
            .iter()
            .filter(|s| s.outcome == StageOutcome::Applied)
            .map(|s| s.handler.as_str())
    }
}

/// Aggregate statistics for a batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchStats {
    /// Documents submitted to the batch.
    pub input_documents: usize,
    /// Results emitted (split children count individually).
    pub output_documents: usize,
    pub accepted: usize,
    pub rejected: usize,
    pub total_duration_ms: u64,
}

/// Everything a batch produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchOutput {
    pub results: Vec<ImportResult>,
    pub stats: BatchStats,
}

impl BatchOutput {
    pub fn accepted(&self) -> impl Iterator<Item = &ImportResult> {
        self.results.iter().filter(|r| r.is_accepted())
    }

    pub fn rejected(&self) -> impl Iterator<Item = &ImportResult> {
        self.results.iter().filter(|r| r.is_rejected())
    }
}
