//! RagKit configuration system.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::Result;

/// Root configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RagKitConfig {
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub rerank: RerankConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
}

impl RagKitConfig {
    /// Load config from the default path (~/.ragkit/config.toml).
    pub fn load() -> Result<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load config from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| crate::error::RagKitError::Config(format!("Failed to read config: {e}")))?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| crate::error::RagKitError::Config(format!("Failed to parse config: {e}")))?;
        Ok(config)
    }

    /// Save config to the default path.
    pub fn save(&self) -> Result<()> {
        let path = Self::default_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::RagKitError::Config(format!("Failed to serialize config: {e}")))?;
        std::fs::write(&path, content)?;
        Ok(())
    }

    /// Get the default config path.
    pub fn default_path() -> PathBuf {
        Self::home_dir().join("config.toml")
    }

    /// Get the RagKit home directory.
    pub fn home_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".ragkit")
    }
}

/// Chat-completion provider configuration (query transform, HyDE).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_llm_model")]
    pub model: String,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_endpoint() -> String { "https://api.openai.com/v1".into() }
fn default_llm_model() -> String { "gpt-4o-mini".into() }
fn default_request_timeout() -> u64 { 30 }

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            api_key: String::new(),
            model: default_llm_model(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

/// Embedding provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_embedding_model")]
    pub model: String,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_embedding_model() -> String { "text-embedding-3-small".into() }

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            api_key: String::new(),
            model: default_embedding_model(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

/// Remote rerank service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RerankConfig {
    #[serde(default)]
    pub endpoint: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_rerank_model")]
    pub model: String,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_rerank_model() -> String { "rerank-v3.5".into() }

impl Default for RerankConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            api_key: String::new(),
            model: default_rerank_model(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

/// Vector store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_store_dir")]
    pub dir: String,
}

fn default_store_dir() -> String { "data/embeddings".into() }

impl Default for StoreConfig {
    fn default() -> Self {
        Self { dir: default_store_dir() }
    }
}

/// Retrieval pipeline configuration.
///
/// Process-wide defaults; the engine takes one of these at construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Results returned to the caller.
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    /// Final relevance floor, in [0, 1].
    #[serde(default = "default_min_score")]
    pub min_score: f32,
    /// Over-fetch factor for the recall phase: each variant requests
    /// max(top_k, recall_multiplier) candidates before filtering.
    #[serde(default = "default_recall_multiplier")]
    pub recall_multiplier: usize,
    #[serde(default)]
    pub enable_rerank: bool,
    #[serde(default = "bool_true")]
    pub enable_multi_query: bool,
    #[serde(default)]
    pub enable_hyde: bool,
    /// Max alternative phrasings requested from expansion.
    #[serde(default = "default_expand_k")]
    pub expand_k: usize,
    /// Emit a cross-lingual mirror variant when script detection works.
    #[serde(default = "bool_true")]
    pub lang_mirror: bool,
    /// Character budget for `format_context`.
    #[serde(default = "default_max_context_chars")]
    pub max_context_chars: usize,
    /// Overall retrieval deadline in milliseconds.
    #[serde(default = "default_deadline_ms")]
    pub deadline_ms: u64,
}

fn bool_true() -> bool { true }
fn default_top_k() -> usize { 4 }
fn default_min_score() -> f32 { 0.2 }
fn default_recall_multiplier() -> usize { 8 }
fn default_expand_k() -> usize { 3 }
fn default_max_context_chars() -> usize { 3000 }
fn default_deadline_ms() -> u64 { 20_000 }

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            min_score: default_min_score(),
            recall_multiplier: default_recall_multiplier(),
            enable_rerank: false,
            enable_multi_query: true,
            enable_hyde: false,
            expand_k: default_expand_k(),
            lang_mirror: true,
            max_context_chars: default_max_context_chars(),
            deadline_ms: default_deadline_ms(),
        }
    }
}

impl RetrievalConfig {
    /// Candidate count each recall variant requests from the store.
    pub fn recall_fetch(&self) -> usize {
        self.top_k.max(self.recall_multiplier)
    }

    /// Prefilter floor applied before reranking: deliberately looser than
    /// `min_score` so borderline passages still reach the reranker.
    pub fn prefilter_floor(&self) -> f32 {
        (self.min_score * 0.75).max(0.05)
    }
}
