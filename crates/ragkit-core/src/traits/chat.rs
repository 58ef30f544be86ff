//! Text-generation capability used by the query transformer.

use async_trait::async_trait;

use crate::error::Result;

/// A chat-completion backend (rewrite, expansion, HyDE).
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Provider name for logging.
    fn name(&self) -> &str;

    /// Run one system+user exchange and return the assistant text.
    ///
    /// `temperature` is passed through; transform callers keep it at or
    /// near 0.0 for deterministic effort.
    async fn complete(&self, system: &str, user: &str, temperature: f32) -> Result<String>;
}
