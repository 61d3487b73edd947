//! Filter decisions and their aggregation across a handler chain.
//!
//! A filter answers "keep this document?" with a [`FilterDecision`]. An
//! accepted decision carries nothing; a rejected one carries the identity of
//! the rejecting filter and a description that explains the exclusion.
//!
//! The driver feeds every decision into a [`FilterTally`], which applies the
//! configured [`FilterPolicy`] and tells it when the outcome is settled.

use crate::config::FilterPolicy;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome of a single filter invocation.
///
/// `is_rejected()` is `true` exactly when a description is present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterDecision {
    /// Name of the rejecting filter, `None` for declarative rejections.
    pub filter: Option<String>,
    /// Why the document was rejected. `None` means accepted.
    pub description: Option<String>,
}

impl FilterDecision {
    pub fn accepted() -> Self {
        Self::default()
    }

    pub fn rejected(filter: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            filter: Some(filter.into()),
            description: Some(description.into()),
        }
    }

    /// A rejection not attributed to any filter instance.
    pub fn rejected_with(description: impl Into<String>) -> Self {
        Self {
            filter: None,
            description: Some(description.into()),
        }
    }

    pub fn is_rejected(&self) -> bool {
        self.description.is_some()
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn filter(&self) -> Option<&str> {
        self.filter.as_deref()
    }

    /// Attribute an anonymous rejection to `filter`. Attributed decisions
    /// are returned unchanged.
    pub fn attributed_to(mut self, filter: &str) -> Self {
        if self.is_rejected() && self.filter.is_none() {
            self.filter = Some(filter.to_string());
        }
        self
    }
}

impl fmt::Display for FilterDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.filter, &self.description) {
            (_, None) => write!(f, "accepted"),
            (Some(filter), Some(desc)) => write!(f, "rejected by {filter}: {desc}"),
            (None, Some(desc)) => write!(f, "rejected: {desc}"),
        }
    }
}

/// Running aggregation of filter decisions for one document.
#[derive(Debug, Clone)]
pub struct FilterTally {
    policy: FilterPolicy,
    first_rejection: Option<FilterDecision>,
    accepted_any: bool,
}

impl FilterTally {
    pub fn new(policy: FilterPolicy) -> Self {
        Self {
            policy,
            first_rejection: None,
            accepted_any: false,
        }
    }

    /// Whether further filters still need consulting.
    ///
    /// Under [`FilterPolicy::Any`] a single accept settles the outcome.
    pub fn wants_more(&self) -> bool {
        match self.policy {
            FilterPolicy::All => true,
            FilterPolicy::Any => !self.accepted_any,
        }
    }

    /// Record a decision. Returns the rejection when it is terminal right
    /// away, which only happens under [`FilterPolicy::All`].
    pub fn record(&mut self, decision: FilterDecision) -> Option<FilterDecision> {
        if !decision.is_rejected() {
            self.accepted_any = true;
            return None;
        }
        match self.policy {
            FilterPolicy::All => Some(decision),
            FilterPolicy::Any => {
                if self.first_rejection.is_none() {
                    self.first_rejection = Some(decision);
                }
                None
            }
        }
    }

    /// Final verdict once the chain is exhausted.
    pub fn finish(self) -> FilterDecision {
        match (self.accepted_any, self.first_rejection) {
            (false, Some(rejection)) => rejection,
            _ => FilterDecision::accepted(),
        }
    }
}
