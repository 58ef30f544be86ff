//! Second-pass relevance scoring capability.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::RankedDoc;

/// Relevance-orders a bounded candidate set against a query.
///
/// Implementations must return only in-range indices (each a valid position
/// into `documents`), dropping malformed entries instead of propagating
/// them. The orchestrator treats an `Err` or an empty ordering the same
/// way: it keeps the similarity-based order.
#[async_trait]
pub trait Reranker: Send + Sync {
    /// Provider name for logging.
    fn name(&self) -> &str;

    /// Score `documents` against `query`, best first, at most `top_k` entries.
    async fn rerank(&self, query: &str, documents: &[String], top_k: usize)
    -> Result<Vec<RankedDoc>>;
}
