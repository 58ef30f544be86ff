//! Passage and query-plan types shared across the engine.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A stored passage surfaced by a similarity search, with its score.
///
/// Ephemeral: created per query and discarded after the call returns.
/// `rerank_score` is only set when a reranker re-ordered the candidate set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredPassage {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    /// Cosine similarity against the query vector, in [-1, 1].
    pub score: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rerank_score: Option<f32>,
}

impl ScoredPassage {
    /// Stable identity key for cross-variant deduplication.
    ///
    /// Prefers `source#chunk` so the same chunk surfacing under several
    /// query variants collapses to one entry; falls back to the record id.
    pub fn identity_key(&self) -> String {
        match (self.metadata.get("source"), self.metadata.get("chunk")) {
            (Some(source), Some(chunk)) => format!("{source}#{chunk}"),
            _ => self.id.clone(),
        }
    }

    /// Effective ranking score: rerank score when present, else similarity.
    pub fn effective_score(&self) -> f32 {
        self.rerank_score.unwrap_or(self.score)
    }
}

/// Query variants produced by the transformer for one retrieval call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryPlan {
    /// Standalone rewrite of the user query (or the query itself).
    pub primary: String,
    /// Alternative phrasings / keyword variants, in generation order.
    pub alternatives: Vec<String>,
    /// Cross-lingual companion query, when script detection was conclusive.
    pub mirror: Option<String>,
    /// Hypothetical answer passage for HyDE search.
    pub hypothetical: Option<String>,
}

impl QueryPlan {
    /// A plan that is just the original query, no widening.
    pub fn passthrough(query: &str) -> Self {
        Self {
            primary: query.to_string(),
            ..Self::default()
        }
    }

    /// All query strings to search, in deterministic plan order:
    /// primary, then alternatives, then mirror.
    pub fn variants(&self) -> Vec<String> {
        let mut out = Vec::with_capacity(2 + self.alternatives.len());
        out.push(self.primary.clone());
        out.extend(self.alternatives.iter().cloned());
        if let Some(m) = &self.mirror {
            out.push(m.clone());
        }
        out
    }
}

/// One entry of a reranker's relevance ordering.
///
/// `index` points into the candidate document slice handed to the reranker;
/// providers must validate it into range before returning.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankedDoc {
    pub index: usize,
    pub score: f32,
}
