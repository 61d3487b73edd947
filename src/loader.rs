//! JSON pipeline definitions.
//!
//! A definition names the policies and lists the handlers in execution
//! order. Each handler entry is tagged by `type`:
//!
//! ```json
//! {
//!   "filter_policy": "all",
//!   "split_policy": "continue",
//!   "handlers": [
//!     { "type": "content_type" },
//!     { "type": "regex_metadata", "field": "document.contentType",
//!       "pattern": "^text/", "on_match": "include" },
//!     { "type": "text_between", "name": "title",
//!       "restrict_to": [{ "field": "document.contentType", "pattern": "html" }],
//!       "pairs": [{ "name": "title", "start": "<title>", "end": "</title>" }] }
//!   ]
//! }
//! ```
//!
//! Handlers without a `name` are called `<type>#<position>` (1-based).
//! Unknown keys and unknown handler types are refused.

use crate::collaborator::Extract;
use crate::config::{FaultPolicy, FilterPolicy, ImporterConfig, ImporterConfigBuilder, SplitPolicy};
use crate::error::ImporterError;
use crate::handler::{
    ConstantTagger, ContentTypeTagger, DomTagger, Handler, HandlerEntry, OnMatch,
    RegexContentFilter, RegexMetadataFilter, RegexSplitter, TextBetween, TextBetweenTagger,
    UuidTagger,
};
use crate::handler::uuid::DEFAULT_UUID_FIELD;
use crate::pipeline::Pipeline;
use crate::restriction::{RestrictionSpec, Restrictions};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

fn default_concurrency() -> usize {
    8
}

fn default_uuid_field() -> String {
    DEFAULT_UUID_FIELD.to_string()
}

fn default_true() -> bool {
    true
}

/// Top-level pipeline definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PipelineDefinition {
    #[serde(default)]
    pub filter_policy: FilterPolicy,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub split_policy: Option<SplitPolicy>,
    #[serde(default)]
    pub fault_policy: FaultPolicy,
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    #[serde(default)]
    pub handlers: Vec<HandlerSpec>,
}

/// One handler entry, tagged by `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HandlerSpec {
    TextBetween(TextBetweenSpec),
    Dom(DomSpec),
    Constant(ConstantSpec),
    Uuid(UuidSpec),
    ContentType(ContentTypeSpec),
    RegexMetadata(RegexMetadataSpec),
    RegexContent(RegexContentSpec),
    RegexSplit(RegexSplitSpec),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TextBetweenSpec {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub restrict_to: Vec<RestrictionSpec>,
    pub pairs: Vec<TextBetween>,
    #[serde(default)]
    pub inclusive: bool,
    #[serde(default)]
    pub case_sensitive: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DomSpec {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub restrict_to: Vec<RestrictionSpec>,
    pub selector: String,
    pub to_field: String,
    #[serde(default)]
    pub extract: Extract,
    #[serde(default)]
    pub overwrite: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConstantSpec {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub restrict_to: Vec<RestrictionSpec>,
    pub field: String,
    pub values: Vec<String>,
    #[serde(default)]
    pub overwrite: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UuidSpec {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub restrict_to: Vec<RestrictionSpec>,
    #[serde(default = "default_uuid_field")]
    pub field: String,
    #[serde(default = "default_true")]
    pub overwrite: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ContentTypeSpec {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub restrict_to: Vec<RestrictionSpec>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegexMetadataSpec {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub restrict_to: Vec<RestrictionSpec>,
    pub field: String,
    pub pattern: String,
    #[serde(default)]
    pub case_sensitive: bool,
    #[serde(default)]
    pub on_match: OnMatch,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegexContentSpec {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub restrict_to: Vec<RestrictionSpec>,
    pub pattern: String,
    #[serde(default)]
    pub case_sensitive: bool,
    #[serde(default)]
    pub on_match: OnMatch,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegexSplitSpec {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub restrict_to: Vec<RestrictionSpec>,
    pub separator: String,
    #[serde(default)]
    pub case_sensitive: bool,
    #[serde(default)]
    pub exclude_fields: Vec<String>,
}

impl HandlerSpec {
    pub fn type_name(&self) -> &'static str {
        match self {
            HandlerSpec::TextBetween(_) => "text_between",
            HandlerSpec::Dom(_) => "dom",
            HandlerSpec::Constant(_) => "constant",
            HandlerSpec::Uuid(_) => "uuid",
            HandlerSpec::ContentType(_) => "content_type",
            HandlerSpec::RegexMetadata(_) => "regex_metadata",
            HandlerSpec::RegexContent(_) => "regex_content",
            HandlerSpec::RegexSplit(_) => "regex_split",
        }
    }

    fn common(&self) -> (Option<&str>, &[RestrictionSpec]) {
        let (name, restrict_to) = match self {
            HandlerSpec::TextBetween(s) => (&s.name, &s.restrict_to),
            HandlerSpec::Dom(s) => (&s.name, &s.restrict_to),
            HandlerSpec::Constant(s) => (&s.name, &s.restrict_to),
            HandlerSpec::Uuid(s) => (&s.name, &s.restrict_to),
            HandlerSpec::ContentType(s) => (&s.name, &s.restrict_to),
            HandlerSpec::RegexMetadata(s) => (&s.name, &s.restrict_to),
            HandlerSpec::RegexContent(s) => (&s.name, &s.restrict_to),
            HandlerSpec::RegexSplit(s) => (&s.name, &s.restrict_to),
        };
        (name.as_deref(), restrict_to.as_slice())
    }

    /// Compile this entry. `position` is 1-based and only used for the
    /// fallback name.
    pub fn compile(&self, position: usize) -> Result<HandlerEntry, ImporterError> {
        let (name, restrict_to) = self.common();
        let name = match name {
            Some(n) => n.to_string(),
            None => format!("{}#{}", self.type_name(), position),
        };
        let restrictions = Restrictions::compile(restrict_to)?;

        let handler = match self {
            HandlerSpec::TextBetween(s) => Handler::Tagger(Box::new(TextBetweenTagger::new(
                s.pairs.iter().cloned(),
                s.inclusive,
                s.case_sensitive,
            )?)),
            HandlerSpec::Dom(s) => Handler::Tagger(Box::new(
                DomTagger::new(&s.selector, &s.to_field)?
                    .extract(s.extract.clone())
                    .overwrite(s.overwrite),
            )),
            HandlerSpec::Constant(s) => Handler::Tagger(Box::new(ConstantTagger::new(
                &s.field,
                s.values.iter().cloned(),
                s.overwrite,
            )?)),
            HandlerSpec::Uuid(s) => {
                Handler::Tagger(Box::new(UuidTagger::new(&s.field, s.overwrite)?))
            }
            HandlerSpec::ContentType(_) => Handler::Tagger(Box::new(ContentTypeTagger::default())),
            HandlerSpec::RegexMetadata(s) => Handler::Filter(Box::new(RegexMetadataFilter::new(
                &s.field,
                &s.pattern,
                s.case_sensitive,
                s.on_match,
            )?)),
            HandlerSpec::RegexContent(s) => Handler::Filter(Box::new(RegexContentFilter::new(
                &s.pattern,
                s.case_sensitive,
                s.on_match,
            )?)),
            HandlerSpec::RegexSplit(s) => Handler::Splitter {
                splitter: Box::new(RegexSplitter::new(&s.separator, s.case_sensitive)?),
                exclude_fields: s.exclude_fields.clone(),
            },
        };

        Ok(HandlerEntry::new(name, restrictions, handler))
    }
}

impl PipelineDefinition {
    /// Parse a definition without compiling it.
    pub fn from_json(json: &str) -> Result<Self, ImporterError> {
        serde_json::from_str(json).map_err(|e| ImporterError::InvalidDefinition(e.to_string()))
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ImporterError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ImporterError::DefinitionIo {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json).map_err(|e| match e {
            ImporterError::InvalidDefinition(msg) => {
                ImporterError::InvalidDefinition(format!("{}: {msg}", path.display()))
            }
            other => other,
        })
    }

    /// A config builder preloaded with this definition's policies, so
    /// callers can still override concurrency or attach a progress callback.
    pub fn config_builder(&self) -> ImporterConfigBuilder {
        let builder = ImporterConfig::builder()
            .filter_policy(self.filter_policy)
            .fault_policy(self.fault_policy)
            .concurrency(self.concurrency);
        match self.split_policy {
            Some(policy) => builder.split_policy(policy),
            None => builder,
        }
    }

    /// Compile every handler and assemble the pipeline under `config`.
    pub fn into_pipeline(self, config: ImporterConfig) -> Result<Pipeline, ImporterError> {
        let mut builder = Pipeline::builder(config);
        for (i, spec) in self.handlers.iter().enumerate() {
            builder = builder.handler(spec.compile(i + 1)?);
        }
        let pipeline = builder.build()?;
        debug!("Loaded pipeline definition with {} handler(s)", self.handlers.len());
        Ok(pipeline)
    }
}

/// Parse and compile a JSON definition.
///
/// # Errors
/// [`ImporterError::InvalidDefinition`] for malformed JSON, unknown keys or
/// unknown handler types; any construction error of the handlers
/// themselves (bad patterns, blank required fields, missing split policy).
pub fn load_pipeline(json: &str) -> Result<Pipeline, ImporterError> {
    let definition = PipelineDefinition::from_json(json)?;
    let config = definition.config_builder().build()?;
    definition.into_pipeline(config)
}

/// [`load_pipeline`] from a file on disk.
pub fn load_pipeline_file(path: impl AsRef<Path>) -> Result<Pipeline, ImporterError> {
    let definition = PipelineDefinition::from_file(path)?;
    let config = definition.config_builder().build()?;
    definition.into_pipeline(config)
}
