//! Degradation-aware call outcomes.
//!
//! The engine recovers from most external failures (a query variant timing
//! out, a reranker returning garbage) instead of failing the call. Those
//! recoveries must stay observable to callers, so successful results carry
//! an explicit `Complete` / `Degraded` tag instead of silently falling back.

use std::fmt;

/// Something the engine fell back on during an otherwise successful call.
#[derive(Debug, Clone, PartialEq)]
pub enum Degradation {
    /// Query rewrite failed; the original query was used as-is.
    RewriteFailed(String),
    /// Multi-query expansion produced nothing usable.
    ExpansionFailed(String),
    /// HyDE passage generation failed; retrieval proceeded without it.
    HydeFailed(String),
    /// Query planning exceeded the overall deadline; the original query
    /// was searched unaltered.
    PlanTimedOut,
    /// One recall variant's embed+search failed and was skipped.
    VariantFailed { query: String, reason: String },
    /// Reranking failed or returned nothing; similarity order kept.
    RerankSkipped(String),
    /// Overall deadline hit; only the completed variants were merged.
    DeadlineExceeded { completed: usize, total: usize },
}

impl fmt::Display for Degradation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RewriteFailed(r) => write!(f, "rewrite failed ({r}), original query kept"),
            Self::ExpansionFailed(r) => write!(f, "expansion failed ({r})"),
            Self::HydeFailed(r) => write!(f, "hyde failed ({r})"),
            Self::PlanTimedOut => {
                write!(f, "query planning exceeded the deadline, original query used")
            }
            Self::VariantFailed { query, reason } => {
                write!(f, "variant '{query}' skipped ({reason})")
            }
            Self::RerankSkipped(r) => write!(f, "rerank skipped ({r})"),
            Self::DeadlineExceeded { completed, total } => {
                write!(f, "deadline exceeded with {completed}/{total} variants done")
            }
        }
    }
}

/// A successful result that may have taken fallback paths along the way.
#[derive(Debug, Clone, PartialEq)]
pub enum Retrieved<T> {
    /// Every enabled stage ran as configured.
    Complete(T),
    /// The value is usable, but one or more stages degraded.
    Degraded { value: T, reasons: Vec<Degradation> },
}

impl<T> Retrieved<T> {
    /// Wrap a value, tagging it as degraded when any reasons were recorded.
    pub fn from_parts(value: T, reasons: Vec<Degradation>) -> Self {
        if reasons.is_empty() {
            Self::Complete(value)
        } else {
            Self::Degraded { value, reasons }
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::Degraded { .. })
    }

    pub fn reasons(&self) -> &[Degradation] {
        match self {
            Self::Complete(_) => &[],
            Self::Degraded { reasons, .. } => reasons,
        }
    }

    /// The inner value, discarding the degradation tag.
    pub fn into_inner(self) -> T {
        match self {
            Self::Complete(v) | Self::Degraded { value: v, .. } => v,
        }
    }

    pub fn as_inner(&self) -> &T {
        match self {
            Self::Complete(v) | Self::Degraded { value: v, .. } => v,
        }
    }
}
