//! # RagKit Providers
//!
//! Network-backed implementations of the core capability traits.
//!
//! Chat completions and embeddings speak the OpenAI-compatible API, so any
//! endpoint exposing `/chat/completions` and `/embeddings` works (OpenAI,
//! proxies, Ollama, llama.cpp servers). Reranking speaks the generic rerank
//! service contract: `{query, documents, top_k, model}` in,
//! `{results: [{index, score}]}` out.

pub mod openai_compatible;
pub mod rerank;

use std::sync::Arc;

use ragkit_core::config::RagKitConfig;
use ragkit_core::error::Result;
use ragkit_core::traits::{ChatModel, Embedder, Reranker};

/// Create the chat model used for query transformation.
pub fn create_chat_model(config: &RagKitConfig) -> Result<Arc<dyn ChatModel>> {
    Ok(Arc::new(openai_compatible::OpenAiChat::new(&config.llm)?))
}

/// Create the embedding provider.
pub fn create_embedder(config: &RagKitConfig) -> Result<Arc<dyn Embedder>> {
    Ok(Arc::new(openai_compatible::OpenAiEmbedder::new(
        &config.embedding,
    )?))
}

/// Create the remote reranker. Errors when no endpoint is configured;
/// callers that leave reranking disabled never hit this.
pub fn create_reranker(config: &RagKitConfig) -> Result<Arc<dyn Reranker>> {
    Ok(Arc::new(rerank::HttpReranker::new(&config.rerank)?))
}
