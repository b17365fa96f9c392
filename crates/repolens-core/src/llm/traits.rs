//! Embedding trait definition

use crate::error::Result;
use async_trait::async_trait;

/// Embedding generation trait.
///
/// Index build and query must use the same implementation and model, or
/// distances between their vectors are meaningless.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Generate embedding for single text
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embeddings for batch of texts, in input order
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Get embedding dimensions (0 when not yet known)
    fn dimensions(&self) -> usize;

    /// Get model name
    fn model_name(&self) -> &str;
}
