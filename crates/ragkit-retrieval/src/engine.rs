//! The retrieval orchestrator: plan → recall → merge → prefilter → rerank → truncate.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinSet;
use tokio::time::Instant;

use ragkit_core::config::RetrievalConfig;
use ragkit_core::error::{RagKitError, Result};
use ragkit_core::outcome::{Degradation, Retrieved};
use ragkit_core::traits::{Embedder, Reranker};
use ragkit_core::types::{QueryPlan, ScoredPassage};
use ragkit_store::VectorStore;

use crate::transform::QueryTransformer;

/// End-to-end retrieve-and-rank over one vector store.
///
/// Holds no per-call state; a fixed input, fixed store contents, and fixed
/// provider responses always produce the same ranking regardless of which
/// variant's network call returns first.
pub struct RetrievalEngine {
    store: Arc<VectorStore>,
    embedder: Arc<dyn Embedder>,
    transformer: Option<QueryTransformer>,
    reranker: Option<Arc<dyn Reranker>>,
    config: RetrievalConfig,
}

impl RetrievalEngine {
    pub fn new(store: Arc<VectorStore>, embedder: Arc<dyn Embedder>, config: RetrievalConfig) -> Self {
        Self {
            store,
            embedder,
            transformer: None,
            reranker: None,
            config,
        }
    }

    /// Enable query transformation (rewrite/expansion/mirror/HyDE).
    /// Without one, the plan is just the original query.
    pub fn with_transformer(mut self, transformer: QueryTransformer) -> Self {
        self.transformer = Some(transformer);
        self
    }

    /// Wire a reranker; it only runs when `enable_rerank` is set.
    pub fn with_reranker(mut self, reranker: Arc<dyn Reranker>) -> Self {
        self.reranker = Some(reranker);
        self
    }

    /// Retrieve the ranked passages supporting `query`.
    ///
    /// Returns a (possibly empty) ranked list tagged `Complete`/`Degraded`,
    /// or an error when the call as a whole cannot answer: a fatal
    /// configuration problem, every recall variant failing, or the deadline
    /// expiring with nothing completed.
    ///
    /// `deadline_ms` bounds the whole call, planning and reranking
    /// included, not just the recall fan-out. A stage that expires degrades
    /// (passthrough plan, similarity-order results); only a recall phase
    /// with zero completed variants turns the expiry into an error.
    pub async fn retrieve(
        &self,
        query: &str,
        history_note: &str,
    ) -> Result<Retrieved<Vec<ScoredPassage>>> {
        if self.config.enable_rerank && self.reranker.is_none() {
            return Err(RagKitError::Config(
                "enable_rerank is set but no reranker is configured".into(),
            ));
        }

        let deadline = Instant::now() + Duration::from_millis(self.config.deadline_ms);
        let mut reasons = Vec::new();

        // 1. Plan.
        let plan = match &self.transformer {
            Some(t) => match tokio::time::timeout_at(deadline, t.plan(query, history_note)).await {
                Ok((plan, plan_reasons)) => {
                    reasons.extend(plan_reasons);
                    plan
                }
                Err(_) => {
                    tracing::warn!("query planning exceeded the deadline, searching original query only");
                    reasons.push(Degradation::PlanTimedOut);
                    QueryPlan::passthrough(query)
                }
            },
            None => QueryPlan::passthrough(query),
        };

        // 2. Recall: concurrent embed+search per variant, merged in plan
        // order afterwards so completion order never affects ranking.
        let per_variant = self.recall(&plan, deadline, &mut reasons).await?;

        // 3. Merge & dedup.
        let merged = merge_candidates(per_variant);

        // 4. Prefilter, falling back to the unfiltered set rather than
        // starving the reranker.
        let floor = self.config.prefilter_floor();
        let prefiltered: Vec<ScoredPassage> = merged
            .iter()
            .filter(|p| p.score >= floor)
            .cloned()
            .collect();
        let mut candidates = if prefiltered.is_empty() { merged } else { prefiltered };

        // 5. Rerank, relevance-referenced to the original query only.
        if self.config.enable_rerank && !candidates.is_empty() {
            candidates = self.rerank(query, candidates, deadline, &mut reasons).await?;
        }

        // 6. Truncate.
        candidates.truncate(self.config.top_k);
        tracing::debug!(
            "retrieved {} passages ({} degradations)",
            candidates.len(),
            reasons.len()
        );
        Ok(Retrieved::from_parts(candidates, reasons))
    }

    /// Fan out one embed+search task per plan variant (plus HyDE), bounded
    /// by the overall deadline. Returns per-variant hits in plan order.
    async fn recall(
        &self,
        plan: &QueryPlan,
        deadline: Instant,
        reasons: &mut Vec<Degradation>,
    ) -> Result<Vec<Vec<ScoredPassage>>> {
        let mut inputs = plan.variants();
        if let Some(hyde) = &plan.hypothetical {
            inputs.push(hyde.clone());
        }
        let total = inputs.len();
        let fetch = self.config.recall_fetch();

        let mut set = JoinSet::new();
        for (idx, text) in inputs.into_iter().enumerate() {
            let embedder = Arc::clone(&self.embedder);
            let store = Arc::clone(&self.store);
            set.spawn(async move {
                let result = async {
                    let mut vectors = embedder.encode(std::slice::from_ref(&text)).await?;
                    if vectors.is_empty() {
                        return Err(RagKitError::Provider("empty embedding batch".into()));
                    }
                    store.search(&vectors.remove(0), fetch)
                }
                .await;
                (idx, text, result)
            });
        }

        let mut per_variant: Vec<Vec<ScoredPassage>> = vec![Vec::new(); total];
        let mut completed = 0usize;
        let mut last_failure = String::new();

        loop {
            match tokio::time::timeout_at(deadline, set.join_next()).await {
                Ok(Some(Ok((idx, _, Ok(hits))))) => {
                    per_variant[idx] = hits;
                    completed += 1;
                }
                Ok(Some(Ok((_, text, Err(e))))) => {
                    if e.is_fatal() {
                        // Misconfiguration (e.g. dimension mismatch) is not
                        // a per-variant hiccup; abort the whole call.
                        set.abort_all();
                        return Err(e);
                    }
                    tracing::warn!("recall variant '{text}' failed: {e}");
                    last_failure = e.to_string();
                    reasons.push(Degradation::VariantFailed {
                        query: text,
                        reason: last_failure.clone(),
                    });
                }
                Ok(Some(Err(join_err))) => {
                    tracing::warn!("recall task aborted: {join_err}");
                    last_failure = join_err.to_string();
                    reasons.push(Degradation::VariantFailed {
                        query: "<task>".into(),
                        reason: last_failure.clone(),
                    });
                }
                Ok(None) => break,
                Err(_) => {
                    set.abort_all();
                    tracing::warn!("recall deadline hit with {completed}/{total} variants done");
                    if completed == 0 {
                        return Err(RagKitError::Timeout(format!(
                            "no recall variant completed within {}ms",
                            self.config.deadline_ms
                        )));
                    }
                    reasons.push(Degradation::DeadlineExceeded { completed, total });
                    break;
                }
            }
        }

        if completed == 0 {
            return Err(RagKitError::RecallFailed(last_failure));
        }
        Ok(per_variant)
    }

    /// Re-order candidates by the reranker's relevance output. A transient
    /// failure, an empty ordering, or the deadline expiring mid-call all
    /// keep the similarity order.
    async fn rerank(
        &self,
        query: &str,
        candidates: Vec<ScoredPassage>,
        deadline: Instant,
        reasons: &mut Vec<Degradation>,
    ) -> Result<Vec<ScoredPassage>> {
        // Presence checked in retrieve().
        let Some(reranker) = &self.reranker else {
            return Ok(candidates);
        };

        let documents: Vec<String> = candidates.iter().map(|c| c.text.clone()).collect();
        let call = reranker.rerank(query, &documents, self.config.top_k);
        let result = match tokio::time::timeout_at(deadline, call).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!("rerank exceeded the deadline, keeping similarity order");
                reasons.push(Degradation::RerankSkipped("deadline exceeded".into()));
                return Ok(candidates);
            }
        };
        match result {
            Ok(ranking) if !ranking.is_empty() => {
                let mut ordered = Vec::with_capacity(ranking.len());
                for entry in ranking {
                    // Providers validate indices; guard anyway.
                    if let Some(candidate) = candidates.get(entry.index) {
                        let mut candidate = candidate.clone();
                        candidate.rerank_score = Some(entry.score);
                        ordered.push(candidate);
                    }
                }
                Ok(ordered)
            }
            Ok(_) => {
                tracing::warn!("reranker returned no entries, keeping similarity order");
                reasons.push(Degradation::RerankSkipped("empty ranking".into()));
                Ok(candidates)
            }
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                tracing::warn!("rerank failed, keeping similarity order: {e}");
                reasons.push(Degradation::RerankSkipped(e.to_string()));
                Ok(candidates)
            }
        }
    }
}

/// Union candidates across variants, dedup by identity key keeping the
/// highest score, then sort by score descending. Ties keep first-seen
/// order (variant order, then rank within a variant), which the stable
/// sort preserves.
fn merge_candidates(per_variant: Vec<Vec<ScoredPassage>>) -> Vec<ScoredPassage> {
    let mut position: HashMap<String, usize> = HashMap::new();
    let mut merged: Vec<ScoredPassage> = Vec::new();

    for hits in per_variant {
        for hit in hits {
            match position.get(&hit.identity_key()) {
                Some(&i) => {
                    if hit.score > merged[i].score {
                        merged[i].score = hit.score;
                    }
                }
                None => {
                    position.insert(hit.identity_key(), merged.len());
                    merged.push(hit);
                }
            }
        }
    }

    merged.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    merged
}
