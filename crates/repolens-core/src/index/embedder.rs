//! Batch embedding of chunks

use super::chunker::Chunk;
use crate::error::{RepoLensError, Result};
use crate::llm::Embedder;

/// Default number of chunk texts sent per embedding request
pub const BATCH_SIZE: usize = 32;

/// Embedding progress
#[derive(Debug, Clone)]
pub struct EmbedProgress {
    pub total_chunks: usize,
    pub processed_chunks: usize,
}

/// Text sent to the embedder for a chunk: path header, blank line, then the lines
pub fn embedding_input(chunk: &Chunk) -> String {
    format!("File: {}\n\n{}", chunk.file, chunk.text())
}

/// Progress callback invoked after each embedding batch
pub type ProgressFn = Box<dyn Fn(EmbedProgress) + Send + Sync>;

/// Reject vectors with NaN or infinite components
pub fn ensure_finite(vector: &[f32]) -> Result<()> {
    match vector.iter().position(|x| !x.is_finite()) {
        Some(i) => Err(RepoLensError::EmbeddingFailed(format!(
            "Embedding component {} is not finite ({})",
            i, vector[i]
        ))),
        None => Ok(()),
    }
}

/// Embed chunks in order, one vector per chunk
pub async fn embed_chunks(
    embedder: &dyn Embedder,
    chunks: &[Chunk],
    batch_size: usize,
    progress: Option<&(dyn Fn(EmbedProgress) + Send + Sync)>,
) -> Result<Vec<Vec<f32>>> {
    let batch_size = batch_size.max(1);
    let mut vectors = Vec::with_capacity(chunks.len());

    for batch in chunks.chunks(batch_size) {
        let texts: Vec<String> = batch.iter().map(embedding_input).collect();
        let embeddings = embedder.embed_batch(&texts).await.map_err(|e| match e {
            RepoLensError::EmbeddingFailed(_) => e,
            other => RepoLensError::EmbeddingFailed(other.to_string()),
        })?;

        if embeddings.len() != batch.len() {
            return Err(RepoLensError::EmbeddingFailed(format!(
                "Expected {} embeddings, got {}",
                batch.len(),
                embeddings.len()
            )));
        }
        for (chunk, embedding) in batch.iter().zip(&embeddings) {
            ensure_finite(embedding).map_err(|e| {
                RepoLensError::EmbeddingFailed(format!("{} (chunk {}): {}", chunk.file, chunk.name, e))
            })?;
        }
        vectors.extend(embeddings);

        if let Some(cb) = progress {
            cb(EmbedProgress {
                total_chunks: chunks.len(),
                processed_chunks: vectors.len(),
            });
        }
    }

    if let Some(first) = vectors.first() {
        let dimension = first.len();
        if dimension == 0 || vectors.iter().any(|v| v.len() != dimension) {
            return Err(RepoLensError::EmbeddingFailed(
                "Embedder returned vectors of inconsistent dimension".to_string(),
            ));
        }
    }

    tracing::debug!(
        "Embedded {} chunks with {}",
        vectors.len(),
        embedder.model_name()
    );
    Ok(vectors)
}
