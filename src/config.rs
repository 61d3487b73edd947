//! Configuration types for the import pipeline.
//!
//! Pipeline-wide behaviour lives in [`ImporterConfig`], built via its
//! [`ImporterConfigBuilder`]. Handler-specific parameters (patterns, target
//! fields, flags) belong to the handlers themselves and are fixed when each
//! handler is constructed.
//!
//! Nothing here is mutated once a pipeline is running: the config is cloned
//! into the pipeline and shared read-only with every worker.

use crate::error::ImporterError;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Configuration for an import pipeline.
///
/// # Example
/// ```rust
/// use edgequake_importer::{FilterPolicy, ImporterConfig, SplitPolicy};
///
/// let config = ImporterConfig::builder()
///     .filter_policy(FilterPolicy::Any)
///     .split_policy(SplitPolicy::Continue)
///     .concurrency(4)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct ImporterConfig {
    /// How decisions from several filters combine. Default: [`FilterPolicy::All`].
    pub filter_policy: FilterPolicy,

    /// What happens to split children. No default: a pipeline containing a
    /// splitter refuses to build until this is chosen.
    pub split_policy: Option<SplitPolicy>,

    /// What a handler fault does to the batch. Default:
    /// [`FaultPolicy::RejectDocument`].
    pub fault_policy: FaultPolicy,

    /// Number of documents processed at once by the batch runner. Default: 8.
    pub concurrency: usize,

    /// Optional per-document progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ImporterConfig {
    fn default() -> Self {
        Self {
            filter_policy: FilterPolicy::default(),
            split_policy: None,
            fault_policy: FaultPolicy::default(),
            concurrency: 8,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ImporterConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImporterConfig")
            .field("filter_policy", &self.filter_policy)
            .field("split_policy", &self.split_policy)
            .field("fault_policy", &self.fault_policy)
            .field("concurrency", &self.concurrency)
            .field(
                "progress_callback",
                &self
                    .progress_callback
                    .as_ref()
                    .map(|_| "<dyn ImportProgressCallback>"),
            )
            .finish()
    }
}

impl ImporterConfig {
    /// Create a new builder for `ImporterConfig`.
    pub fn builder() -> ImporterConfigBuilder {
        ImporterConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ImporterConfig`].
#[derive(Debug)]
pub struct ImporterConfigBuilder {
    config: ImporterConfig,
}

impl ImporterConfigBuilder {
    pub fn filter_policy(mut self, policy: FilterPolicy) -> Self {
        self.config.filter_policy = policy;
        self
    }

    pub fn split_policy(mut self, policy: SplitPolicy) -> Self {
        self.config.split_policy = Some(policy);
        self
    }

    pub fn fault_policy(mut self, policy: FaultPolicy) -> Self {
        self.config.fault_policy = policy;
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ImporterConfig, ImporterError> {
        if self.config.concurrency == 0 {
            return Err(ImporterError::InvalidConfig(
                "Concurrency must be ≥ 1".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Policies ─────────────────────────────────────────────────────────────

/// How the decisions of several filters combine into one verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterPolicy {
    /// Every applied filter must accept; the first reject ends the chain. (default)
    #[default]
    All,
    /// At least one applied filter must accept. The document is rejected
    /// only when every applied filter rejected it.
    Any,
}

/// What the driver does with the children a splitter produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SplitPolicy {
    /// Run every child through the handlers that follow the splitter.
    Continue,
    /// Accept the children as they are; the chain ends at the splitter.
    Terminal,
}

/// What a handler fault does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FaultPolicy {
    /// Reject the faulty document with the fault as the reason. (default)
    #[default]
    RejectDocument,
    /// Stop the batch and return [`ImporterError::HandlerFault`].
    AbortBatch,
}
