//! OpenAI-compatible chat and embedding clients.
//!
//! Different providers are distinguished only by endpoint URL, API key, and
//! model name. Local endpoints (localhost) are allowed to run keyless;
//! anything else without a key is a configuration error surfaced at call
//! time, before any request goes out.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};

use ragkit_core::config::{EmbeddingConfig, LlmConfig};
use ragkit_core::error::{RagKitError, Result};
use ragkit_core::traits::{ChatModel, Embedder};

/// Chat-completion client for query transformation.
pub struct OpenAiChat {
    base_url: String,
    api_key: String,
    model: String,
    client: reqwest::Client,
}

impl OpenAiChat {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        Ok(Self {
            base_url: config.endpoint.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            client: build_client(config.request_timeout_secs)?,
        })
    }
}

#[async_trait]
impl ChatModel for OpenAiChat {
    fn name(&self) -> &str {
        "openai-chat"
    }

    async fn complete(&self, system: &str, user: &str, temperature: f32) -> Result<String> {
        check_key(&self.base_url, &self.api_key, self.name())?;

        let body = json!({
            "model": self.model,
            "temperature": temperature,
            "messages": [
                {"role": "system", "content": system},
                {"role": "user", "content": user},
            ],
        });

        let url = format!("{}/chat/completions", self.base_url);
        let json = post_json(&self.client, &url, &self.api_key, &body, self.name()).await?;

        let content = json["choices"]
            .get(0)
            .and_then(|c| c["message"]["content"].as_str())
            .ok_or_else(|| RagKitError::Provider("No choices in chat response".into()))?;
        Ok(content.trim().to_string())
    }
}

/// Batch embedding client.
pub struct OpenAiEmbedder {
    base_url: String,
    api_key: String,
    model: String,
    client: reqwest::Client,
}

impl OpenAiEmbedder {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        Ok(Self {
            base_url: config.endpoint.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            client: build_client(config.request_timeout_secs)?,
        })
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    fn name(&self) -> &str {
        "openai-embeddings"
    }

    async fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        check_key(&self.base_url, &self.api_key, self.name())?;
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let body = json!({
            "model": self.model,
            "input": texts,
        });

        let url = format!("{}/embeddings", self.base_url);
        let json = post_json(&self.client, &url, &self.api_key, &body, self.name()).await?;

        parse_embeddings(&json, texts.len())
    }
}

/// Extract `data[*].embedding`, restoring input order by the `index` field.
pub(crate) fn parse_embeddings(json: &Value, expected: usize) -> Result<Vec<Vec<f32>>> {
    let data = json["data"]
        .as_array()
        .ok_or_else(|| RagKitError::Provider("No data in embeddings response".into()))?;

    let mut out: Vec<(usize, Vec<f32>)> = Vec::with_capacity(data.len());
    for (pos, entry) in data.iter().enumerate() {
        let index = entry["index"].as_u64().map(|i| i as usize).unwrap_or(pos);
        let vector: Vec<f32> = entry["embedding"]
            .as_array()
            .ok_or_else(|| RagKitError::Provider("Embedding entry missing vector".into()))?
            .iter()
            .map(|v| v.as_f64().unwrap_or(0.0) as f32)
            .collect();
        out.push((index, vector));
    }
    out.sort_by_key(|(i, _)| *i);

    if out.len() != expected {
        return Err(RagKitError::Provider(format!(
            "Embeddings response has {} vectors for {} inputs",
            out.len(),
            expected
        )));
    }
    Ok(out.into_iter().map(|(_, v)| v).collect())
}

fn build_client(timeout_secs: u64) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| RagKitError::Http(format!("client build failed: {e}")))
}

/// Local endpoints may run keyless; cloud endpoints may not.
fn check_key(base_url: &str, api_key: &str, provider: &str) -> Result<()> {
    let local = base_url.contains("localhost") || base_url.contains("127.0.0.1");
    if api_key.is_empty() && !local {
        return Err(RagKitError::ApiKeyMissing(provider.to_string()));
    }
    Ok(())
}

async fn post_json(
    client: &reqwest::Client,
    url: &str,
    api_key: &str,
    body: &Value,
    provider: &str,
) -> Result<Value> {
    let mut req = client
        .post(url)
        .header("Content-Type", "application/json")
        .json(body);
    if !api_key.is_empty() {
        req = req.header("Authorization", format!("Bearer {api_key}"));
    }

    let resp = req
        .send()
        .await
        .map_err(|e| RagKitError::Http(format!("{provider} connection failed ({url}): {e}")))?;

    if !resp.status().is_success() {
        let status = resp.status();
        let text = resp.text().await.unwrap_or_default();
        return Err(RagKitError::Provider(format!(
            "{provider} API error {status}: {text}"
        )));
    }

    resp.json()
        .await
        .map_err(|e| RagKitError::Http(e.to_string()))
}
