//! Embedding capability.

use async_trait::async_trait;

use crate::error::Result;

/// Maps text to dense vectors.
///
/// Contract: one vector per input text, same order, and a fixed
/// dimensionality across calls within a store's lifetime.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Provider name for logging.
    fn name(&self) -> &str;

    /// Embed a batch of texts.
    async fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}
