//! HTTP-based embedder using an external embedding service

use super::Embedder;
use crate::config::EmbeddingServiceConfig;
use crate::error::{RepoLensError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Embedder for OpenAI-compatible `/v1/embeddings` endpoints (vLLM, OpenAI, etc.)
pub struct HttpEmbedder {
    http_client: reqwest::Client,
    config: EmbeddingServiceConfig,
    /// 0 until configured or seen in a response
    dimensions: AtomicUsize,
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbedResponse {
    data: Vec<EmbedData>,
}

#[derive(Deserialize)]
struct EmbedData {
    #[serde(default)]
    index: Option<usize>,
    embedding: Vec<f32>,
}

impl HttpEmbedder {
    /// Create from configuration
    pub fn from_config(config: EmbeddingServiceConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http_client,
            dimensions: AtomicUsize::new(config.dimensions.unwrap_or(0)),
            config,
        })
    }

    fn endpoint(&self) -> String {
        let base = self.config.url.trim_end_matches('/');
        if base.ends_with("/v1") {
            format!("{}/embeddings", base)
        } else {
            format!("{}/v1/embeddings", base)
        }
    }
}

/// Vectors from a response body, in input order
fn parse_embeddings(body: &str, expected: usize) -> Result<Vec<Vec<f32>>> {
    let mut response: EmbedResponse = serde_json::from_str(body)
        .map_err(|e| RepoLensError::EmbeddingFailed(format!("Unexpected response format: {}", e)))?;

    if response.data.len() != expected {
        return Err(RepoLensError::EmbeddingFailed(format!(
            "Requested {} embeddings, service returned {}",
            expected,
            response.data.len()
        )));
    }
    if response.data.iter().all(|d| d.index.is_some()) {
        response.data.sort_by_key(|d| d.index);
    }
    Ok(response.data.into_iter().map(|d| d.embedding).collect())
}

#[async_trait]
impl Embedder for HttpEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_batch(&[text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| RepoLensError::EmbeddingFailed("No embedding returned".to_string()))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let request = EmbedRequest {
            model: &self.config.model,
            input: texts,
        };
        let mut req = self.http_client.post(self.endpoint()).json(&request);
        if let Some(ref api_key) = self.config.api_key {
            req = req.header("Authorization", format!("Bearer {}", api_key));
        }

        let response = req
            .send()
            .await
            .map_err(|e| RepoLensError::EmbeddingFailed(format!("Request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| RepoLensError::EmbeddingFailed(format!("Reading response: {}", e)))?;
        if !status.is_success() {
            return Err(RepoLensError::EmbeddingFailed(format!(
                "Embedding service error (HTTP {}): {}",
                status, body
            )));
        }

        let embeddings = parse_embeddings(&body, texts.len())?;
        if let Some(first) = embeddings.first() {
            let _ = self.dimensions.compare_exchange(
                0,
                first.len(),
                Ordering::Relaxed,
                Ordering::Relaxed,
            );
        }
        tracing::debug!("Embedded batch of {} texts", texts.len());
        Ok(embeddings)
    }

    fn dimensions(&self) -> usize {
        self.dimensions.load(Ordering::Relaxed)
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}
