//! Remote rerank service client.
//!
//! Request: `{query, documents, top_k, model}`. Response, strict shape:
//! `{"results": [{"index": 0, "score": 0.93}, ...]}`. One lenient fallback
//! is tolerated (a `"ranking"` key, scores under `"relevance_score"`) —
//! anything else parses to nothing and the orchestrator keeps the
//! similarity ordering. Out-of-range or malformed entries are dropped here,
//! never propagated.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};

use ragkit_core::config::RerankConfig;
use ragkit_core::error::{RagKitError, Result};
use ragkit_core::traits::Reranker;
use ragkit_core::types::RankedDoc;

/// Which parse attempt produced a usable ordering.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RerankShape {
    /// `results` array with `index`/`score` fields.
    Strict,
    /// `ranking` array and/or `relevance_score` fields.
    Lenient,
}

#[derive(Debug)]
pub struct HttpReranker {
    endpoint: String,
    api_key: String,
    model: String,
    client: reqwest::Client,
}

impl HttpReranker {
    pub fn new(config: &RerankConfig) -> Result<Self> {
        if config.endpoint.is_empty() {
            return Err(RagKitError::Config(
                "rerank enabled but [rerank].endpoint is not set".into(),
            ));
        }
        Ok(Self {
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(config.request_timeout_secs))
                .build()
                .map_err(|e| RagKitError::Http(format!("client build failed: {e}")))?,
        })
    }
}

#[async_trait]
impl Reranker for HttpReranker {
    fn name(&self) -> &str {
        "http-rerank"
    }

    async fn rerank(
        &self,
        query: &str,
        documents: &[String],
        top_k: usize,
    ) -> Result<Vec<RankedDoc>> {
        if documents.is_empty() {
            return Ok(Vec::new());
        }

        let body = json!({
            "query": query,
            "documents": documents,
            "top_k": top_k,
            "model": self.model,
        });

        let mut req = self
            .client
            .post(&self.endpoint)
            .header("Content-Type", "application/json")
            .json(&body);
        if !self.api_key.is_empty() {
            req = req.header("Authorization", format!("Bearer {}", self.api_key));
        }

        let resp = req.send().await.map_err(|e| {
            RagKitError::Http(format!("rerank connection failed ({}): {e}", self.endpoint))
        })?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(RagKitError::Provider(format!(
                "rerank API error {status}: {text}"
            )));
        }

        let json: Value = resp
            .json()
            .await
            .map_err(|e| RagKitError::Http(e.to_string()))?;

        match parse_ranking(&json, documents.len(), top_k) {
            Some((ranking, shape)) => {
                tracing::debug!("rerank returned {} entries ({shape:?} shape)", ranking.len());
                Ok(ranking)
            }
            None => Err(RagKitError::Provider(format!(
                "unrecognized rerank response shape: {json}"
            ))),
        }
    }
}

/// Parse a rerank response: strict shape first, then one lenient fallback.
///
/// Entries with out-of-range indices or non-finite scores are dropped.
/// Returns `None` only when no recognizable ranking array exists at all.
pub(crate) fn parse_ranking(
    json: &Value,
    n_docs: usize,
    top_k: usize,
) -> Option<(Vec<RankedDoc>, RerankShape)> {
    let (entries, shape) = match json.get("results").and_then(Value::as_array) {
        Some(arr) => (arr, RerankShape::Strict),
        None => (
            json.get("ranking").and_then(Value::as_array)?,
            RerankShape::Lenient,
        ),
    };

    let mut out: Vec<RankedDoc> = entries
        .iter()
        .filter_map(|entry| {
            let index = entry["index"].as_u64()? as usize;
            let score = entry["score"]
                .as_f64()
                .or_else(|| entry["relevance_score"].as_f64())?
                as f32;
            if index >= n_docs || !score.is_finite() {
                tracing::warn!("dropping malformed rerank entry: {entry}");
                return None;
            }
            Some(RankedDoc { index, score })
        })
        .collect();

    out.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    out.truncate(top_k);
    Some((out, shape))
}
