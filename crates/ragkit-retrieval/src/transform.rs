//! Query transformation: widen recall without changing retrieval semantics.
//!
//! Four sub-operations, each independently fail-soft — one failing never
//! aborts the others, and the worst case is a plan that is just the
//! original query:
//! - **rewrite** — standalone, language-preserving restatement, history-aware
//! - **expand** — up to `expand_k` alternative phrasings
//! - **mirror** — local cross-lingual companion hint (no network call)
//! - **hypothesize** — short hypothetical answer passage (HyDE)

use std::sync::Arc;

use serde::Deserialize;

use ragkit_core::config::RetrievalConfig;
use ragkit_core::outcome::Degradation;
use ragkit_core::traits::ChatModel;
use ragkit_core::types::QueryPlan;

const REWRITE_SYS: &str = "You rewrite the user's message into a single standalone search query \
for retrieving knowledge base passages.\n\
- Keep it concise and specific.\n\
- Include key entities, dates, amounts, currencies, domain terms.\n\
- Preserve the language of the user's message.\n\
- Do not add explanations; return ONLY the rewritten query text.";

const EXPAND_SYS: &str = "Generate up to {k} alternative phrasings or keyword-style variants for \
the following query.\n\
- Cover synonyms, domain terms, and likely knowledge-base wording.\n\
- Prefer short, retrieval-friendly strings (no extra punctuation).\n\
Return a JSON object: {\"queries\": [\"q1\", \"q2\", ...]}";

const HYDE_SYS: &str = "Write a short hypothetical answer passage (5-7 lines) likely to appear in \
the knowledge base for the query below. Neutral, factual tone. No invented brand claims. Return \
plain text only (no JSON).";

/// Produces a [`QueryPlan`] from the user query and recent conversation.
pub struct QueryTransformer {
    chat: Arc<dyn ChatModel>,
    config: RetrievalConfig,
}

impl QueryTransformer {
    pub fn new(chat: Arc<dyn ChatModel>, config: RetrievalConfig) -> Self {
        Self { chat, config }
    }

    /// Build the plan. Always succeeds; fallbacks taken along the way are
    /// returned as degradations so the caller can surface them.
    pub async fn plan(&self, query: &str, history_note: &str) -> (QueryPlan, Vec<Degradation>) {
        let mut reasons = Vec::new();

        let primary = match self.rewrite(query, history_note).await {
            Ok(rewritten) if !rewritten.is_empty() => rewritten,
            Ok(_) => {
                reasons.push(Degradation::RewriteFailed("empty completion".into()));
                query.to_string()
            }
            Err(e) => {
                tracing::warn!("query rewrite failed: {e}");
                reasons.push(Degradation::RewriteFailed(e.to_string()));
                query.to_string()
            }
        };

        let mut alternatives = Vec::new();
        if self.config.enable_multi_query && self.config.expand_k > 0 {
            match self.expand(&primary, self.config.expand_k).await {
                Ok(alts) => alternatives = alts,
                Err(reason) => {
                    tracing::warn!("query expansion failed: {reason}");
                    reasons.push(Degradation::ExpansionFailed(reason));
                }
            }
        }

        let mirror = if self.config.lang_mirror {
            lang_mirror(&primary)
        } else {
            None
        };

        let mut hypothetical = None;
        if self.config.enable_hyde {
            match self.chat.complete(HYDE_SYS, &primary, 0.2).await {
                Ok(text) if !text.trim().is_empty() => hypothetical = Some(text),
                Ok(_) => reasons.push(Degradation::HydeFailed("empty completion".into())),
                Err(e) => {
                    tracing::warn!("hyde generation failed: {e}");
                    reasons.push(Degradation::HydeFailed(e.to_string()));
                }
            }
        }

        let plan = QueryPlan {
            primary,
            alternatives,
            mirror,
            hypothetical,
        };
        tracing::debug!(
            "query plan: {} variants{}",
            plan.variants().len(),
            if plan.hypothetical.is_some() { " + hyde" } else { "" }
        );
        (plan, reasons)
    }

    /// Standalone restatement at temperature 0. The caller treats an empty
    /// result as a failure and keeps the original query.
    async fn rewrite(&self, query: &str, history_note: &str) -> ragkit_core::Result<String> {
        let system = if history_note.is_empty() {
            REWRITE_SYS.to_string()
        } else {
            format!("{REWRITE_SYS}\n\nConversation context:\n{history_note}")
        };
        Ok(self.chat.complete(&system, query, 0.0).await?.trim().to_string())
    }

    /// Up to `k` alternative phrasings; the error string describes why
    /// nothing usable came back.
    async fn expand(&self, primary: &str, k: usize) -> Result<Vec<String>, String> {
        let system = EXPAND_SYS.replace("{k}", &k.to_string());
        let raw = self
            .chat
            .complete(&system, primary, 0.2)
            .await
            .map_err(|e| e.to_string())?;

        let (mut queries, format) =
            parse_query_list(&raw, k).ok_or_else(|| format!("unparseable expansion output: {raw:?}"))?;
        tracing::debug!("parsed {} expansion variants ({format:?} format)", queries.len());

        // Re-searching the primary query buys nothing.
        queries.retain(|q| q != primary);
        Ok(queries)
    }
}

/// Which parse attempt recovered the expansion list.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum ListFormat {
    /// Strict `{"queries": [...]}` JSON object.
    Json,
    /// Newline/bullet list (also covers a bare single-line answer).
    Lines,
    /// Comma-separated single line.
    Commas,
}

#[derive(Deserialize)]
struct QueryList {
    queries: Vec<String>,
}

/// Tolerant expansion parser: strict JSON, then newline list, then comma
/// list. `None` means nothing usable in any format.
pub(crate) fn parse_query_list(raw: &str, k: usize) -> Option<(Vec<String>, ListFormat)> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(parsed) = serde_json::from_str::<QueryList>(raw) {
        let queries: Vec<String> = parsed
            .queries
            .into_iter()
            .map(|q| q.trim().to_string())
            .filter(|q| !q.is_empty())
            .take(k)
            .collect();
        if !queries.is_empty() {
            return Some((queries, ListFormat::Json));
        }
    }

    let lines: Vec<String> = raw
        .lines()
        .map(|line| line.trim().trim_start_matches(['-', '•', '*', ' ']).trim().to_string())
        .filter(|line| line.len() > 1)
        .collect();
    if lines.len() >= 2 {
        return Some((lines.into_iter().take(k).collect(), ListFormat::Lines));
    }

    let parts: Vec<String> = raw
        .split(',')
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .collect();
    if parts.len() >= 2 {
        return Some((parts.into_iter().take(k).collect(), ListFormat::Commas));
    }

    // A single bare line is still one usable variant.
    lines
        .into_iter()
        .next()
        .map(|line| (vec![line], ListFormat::Lines))
}

/// Cheap cross-lingual companion query (RU ↔ EN), by character script.
/// No network call; `None` when the script is inconclusive.
pub(crate) fn lang_mirror(query: &str) -> Option<String> {
    let has_cyrillic = query
        .chars()
        .any(|c| ('\u{0400}'..='\u{04FF}').contains(&c));
    if has_cyrillic {
        return Some(format!("English equivalent of: {query}"));
    }
    if query.chars().any(|c| c.is_ascii_alphabetic()) {
        return Some(format!("Русский эквивалент запроса: {query}"));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use ragkit_core::error::{RagKitError, Result};

    /// Scripted chat backend: responds by matching the system prompt.
    struct MockChat {
        rewrite: Result<String>,
        expand: Result<String>,
        hyde: Result<String>,
    }

    impl MockChat {
        fn ok(rewrite: &str, expand: &str, hyde: &str) -> Self {
            Self {
                rewrite: Ok(rewrite.into()),
                expand: Ok(expand.into()),
                hyde: Ok(hyde.into()),
            }
        }
    }

    fn clone_result(r: &Result<String>) -> Result<String> {
        match r {
            Ok(s) => Ok(s.clone()),
            Err(e) => Err(RagKitError::Provider(e.to_string())),
        }
    }

    #[async_trait]
    impl ChatModel for MockChat {
        fn name(&self) -> &str {
            "mock-chat"
        }

        async fn complete(&self, system: &str, _user: &str, _temperature: f32) -> Result<String> {
            if system.contains("rewrite") {
                clone_result(&self.rewrite)
            } else if system.contains("alternative phrasings") {
                clone_result(&self.expand)
            } else {
                clone_result(&self.hyde)
            }
        }
    }

    fn config(multi: bool, hyde: bool, mirror: bool) -> RetrievalConfig {
        RetrievalConfig {
            enable_multi_query: multi,
            enable_hyde: hyde,
            lang_mirror: mirror,
            ..RetrievalConfig::default()
        }
    }

    #[test]
    fn test_parse_strict_json() {
        let raw = r#"{"queries": ["vacation budgeting", " trip savings ", ""]}"#;
        let (queries, format) = parse_query_list(raw, 5).unwrap();
        assert_eq!(format, ListFormat::Json);
        assert_eq!(queries, vec!["vacation budgeting", "trip savings"]);
    }

    #[test]
    fn test_parse_bullet_lines() {
        let raw = "- vacation budgeting\n• trip savings plan\n* путешествие бюджет";
        let (queries, format) = parse_query_list(raw, 5).unwrap();
        assert_eq!(format, ListFormat::Lines);
        assert_eq!(queries.len(), 3);
        assert_eq!(queries[0], "vacation budgeting");
    }

    #[test]
    fn test_parse_comma_list() {
        let (queries, format) = parse_query_list("vacation budgeting, trip savings", 5).unwrap();
        assert_eq!(format, ListFormat::Commas);
        assert_eq!(queries, vec!["vacation budgeting", "trip savings"]);
    }

    #[test]
    fn test_parse_single_line() {
        let (queries, format) = parse_query_list("vacation budgeting tips", 5).unwrap();
        assert_eq!(format, ListFormat::Lines);
        assert_eq!(queries, vec!["vacation budgeting tips"]);
    }

    #[test]
    fn test_parse_respects_k() {
        let raw = r#"{"queries": ["a1", "b2", "c3", "d4"]}"#;
        let (queries, _) = parse_query_list(raw, 2).unwrap();
        assert_eq!(queries.len(), 2);
    }

    #[test]
    fn test_parse_nothing_usable() {
        assert!(parse_query_list("", 5).is_none());
        assert!(parse_query_list("   \n  ", 5).is_none());
    }

    #[test]
    fn test_mirror_heuristic() {
        assert_eq!(
            lang_mirror("сколько копить на отпуск").unwrap(),
            "English equivalent of: сколько копить на отпуск"
        );
        assert_eq!(
            lang_mirror("vacation budget").unwrap(),
            "Русский эквивалент запроса: vacation budget"
        );
        // No alphabetic script at all: inconclusive.
        assert!(lang_mirror("12 500 ₸ → ?").is_none());
    }

    #[tokio::test]
    async fn test_full_plan() {
        let chat = Arc::new(MockChat::ok(
            "how much to save monthly for a vacation",
            r#"{"queries": ["vacation budgeting", "trip savings plan"]}"#,
            "A common guideline is to set aside 10-15% of monthly income.",
        ));
        let t = QueryTransformer::new(chat, config(true, true, true));
        let (plan, reasons) = t.plan("save for trip?", "user mentioned a trip to Almaty").await;

        assert!(reasons.is_empty());
        assert_eq!(plan.primary, "how much to save monthly for a vacation");
        assert_eq!(plan.alternatives.len(), 2);
        assert!(plan.mirror.unwrap().starts_with("Русский эквивалент"));
        assert!(plan.hypothetical.unwrap().contains("10-15%"));
    }

    #[tokio::test]
    async fn test_rewrite_fails_closed_to_original() {
        let chat = Arc::new(MockChat {
            rewrite: Err(RagKitError::Http("timeout".into())),
            expand: Ok(r#"{"queries": ["alt one"]}"#.into()),
            hyde: Ok("irrelevant".into()),
        });
        let t = QueryTransformer::new(chat, config(true, false, false));
        let (plan, reasons) = t.plan("original query", "").await;

        assert_eq!(plan.primary, "original query");
        assert!(matches!(reasons[0], Degradation::RewriteFailed(_)));
        // Expansion still ran despite the rewrite failure.
        assert_eq!(plan.alternatives, vec!["alt one"]);
    }

    #[tokio::test]
    async fn test_expansion_failure_does_not_abort_plan() {
        let chat = Arc::new(MockChat {
            rewrite: Ok("rewritten".into()),
            expand: Err(RagKitError::Provider("500".into())),
            hyde: Ok("hypothetical passage".into()),
        });
        let t = QueryTransformer::new(chat, config(true, true, false));
        let (plan, reasons) = t.plan("q", "").await;

        assert_eq!(plan.primary, "rewritten");
        assert!(plan.alternatives.is_empty());
        assert!(matches!(reasons[0], Degradation::ExpansionFailed(_)));
        assert_eq!(plan.hypothetical.unwrap(), "hypothetical passage");
    }

    #[tokio::test]
    async fn test_expansion_drops_primary_duplicate() {
        let chat = Arc::new(MockChat::ok(
            "rewritten",
            r#"{"queries": ["rewritten", "different"]}"#,
            "",
        ));
        let t = QueryTransformer::new(chat, config(true, false, false));
        let (plan, _) = t.plan("q", "").await;
        assert_eq!(plan.alternatives, vec!["different"]);
    }

    #[tokio::test]
    async fn test_disabled_features_skip_chat() {
        let chat = Arc::new(MockChat {
            rewrite: Ok("rewritten".into()),
            expand: Err(RagKitError::Provider("must not be called".into())),
            hyde: Err(RagKitError::Provider("must not be called".into())),
        });
        let t = QueryTransformer::new(chat, config(false, false, false));
        let (plan, reasons) = t.plan("q", "").await;
        assert!(reasons.is_empty());
        assert!(plan.alternatives.is_empty());
        assert!(plan.hypothetical.is_none());
    }
}
