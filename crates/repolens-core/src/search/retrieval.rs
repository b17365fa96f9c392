//! Ranked retrieval of chunk locations for a query

use super::vector_index::VectorIndex;
use crate::config::RetrievalConfig;
use crate::error::{RepoLensError, Result};
use crate::index::{ensure_finite, Chunk};
use crate::llm::Embedder;
use serde::{Deserialize, Serialize};

/// Location of a matching chunk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalResult {
    pub file_path: String,
    pub start_line: usize,
    pub end_line: usize,
    /// Similarity in (0, 1], after any documentation penalty
    pub score: f32,
}

/// Map a distance to a similarity score; `s(0) = 1`, strictly decreasing.
/// Non-finite distances score 0.
pub fn similarity(distance: f32) -> f32 {
    if !distance.is_finite() {
        return 0.0;
    }
    1.0 / (1.0 + distance.max(0.0))
}

/// Whether `path` ends with one of the documentation extensions
pub fn is_documentation(path: &str, extensions: &[String]) -> bool {
    let lower = path.to_lowercase();
    extensions
        .iter()
        .any(|ext| lower.ends_with(&ext.to_lowercase()))
}

/// Query-time view over an index and its chunk list
pub struct Retriever<'a> {
    index: &'a VectorIndex,
    chunks: &'a [Chunk],
    config: &'a RetrievalConfig,
}

impl<'a> Retriever<'a> {
    pub fn new(index: &'a VectorIndex, chunks: &'a [Chunk], config: &'a RetrievalConfig) -> Self {
        Self {
            index,
            chunks,
            config,
        }
    }

    /// Embed `query` and rank chunk locations
    pub async fn retrieve(
        &self,
        embedder: &dyn Embedder,
        query: &str,
        top_k: usize,
        similarity_threshold: f32,
    ) -> Result<Vec<RetrievalResult>> {
        if self.index.is_empty() {
            return Err(RepoLensError::IndexNotReady);
        }
        if top_k == 0 {
            return Ok(Vec::new());
        }

        let query_vector = embedder.embed(query).await.map_err(|e| match e {
            RepoLensError::EmbeddingFailed(_) => e,
            other => RepoLensError::EmbeddingFailed(other.to_string()),
        })?;
        self.rank(&query_vector, top_k, similarity_threshold)
    }

    /// Rank against an already embedded query
    pub fn rank(
        &self,
        query_vector: &[f32],
        top_k: usize,
        similarity_threshold: f32,
    ) -> Result<Vec<RetrievalResult>> {
        ensure_finite(query_vector)?;
        let neighbors = self.index.search(query_vector, top_k.saturating_mul(2))?;

        let mut results = Vec::with_capacity(neighbors.len());
        for neighbor in neighbors {
            let chunk = self.chunks.get(neighbor.position).ok_or_else(|| {
                RepoLensError::CorruptIndex(format!(
                    "Search returned position {} but only {} chunks are loaded",
                    neighbor.position,
                    self.chunks.len()
                ))
            })?;
            if !neighbor.distance.is_finite() {
                tracing::warn!("Dropping {} with non-finite distance", chunk.file);
                continue;
            }

            let mut score = similarity(neighbor.distance);
            if is_documentation(&chunk.file, &self.config.doc_extensions) {
                score *= self.config.doc_penalty;
            }
            if score < similarity_threshold {
                continue;
            }

            results.push(RetrievalResult {
                file_path: chunk.file.clone(),
                start_line: chunk.start_line,
                end_line: chunk.end_line,
                score,
            });
        }

        results.sort_by(|a, b| b.score.total_cmp(&a.score));
        results.truncate(top_k);

        tracing::debug!(
            "Retrieved {} results (top_k={}, threshold={})",
            results.len(),
            top_k,
            similarity_threshold
        );
        Ok(results)
    }
}
