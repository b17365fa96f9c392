//! Configuration management

use crate::error::{RepoLensError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub traversal: TraversalConfig,

    #[serde(default)]
    pub chunking: ChunkConfig,

    #[serde(default)]
    pub index: IndexConfig,

    #[serde(default)]
    pub retrieval: RetrievalConfig,

    /// Embedding service configuration
    #[serde(default)]
    pub embedding: EmbeddingServiceConfig,

    /// GitHub token (falls back to GITHUB_TOKEN)
    #[serde(default)]
    pub github_token: Option<String>,
}

/// Remote traversal tuning: cache, rate budget and fan-out
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraversalConfig {
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,

    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,

    /// Permits granted per rolling window
    #[serde(default = "default_requests_per_window")]
    pub requests_per_window: usize,

    #[serde(default = "default_window_secs")]
    pub window_secs: u64,

    /// Fetches allowed in flight at once, independent of the rate budget
    #[serde(default = "default_max_concurrent_fetches")]
    pub max_concurrent_fetches: usize,

    /// Patterns appended to the built-in ignore defaults
    #[serde(default)]
    pub extra_ignore_patterns: Vec<String>,
}

impl TraversalConfig {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }
}

impl Default for TraversalConfig {
    fn default() -> Self {
        Self {
            cache_ttl_secs: default_cache_ttl_secs(),
            cache_capacity: default_cache_capacity(),
            requests_per_window: default_requests_per_window(),
            window_secs: default_window_secs(),
            max_concurrent_fetches: default_max_concurrent_fetches(),
            extra_ignore_patterns: Vec::new(),
        }
    }
}

fn default_cache_ttl_secs() -> u64 {
    3600
}

fn default_cache_capacity() -> usize {
    1000
}

// GitHub's authenticated REST quota
fn default_requests_per_window() -> usize {
    5000
}

fn default_window_secs() -> u64 {
    3600
}

fn default_max_concurrent_fetches() -> usize {
    16
}

/// Chunk sizing, in characters
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ChunkConfig {
    #[serde(default = "default_chunk_size")]
    pub max_chunk_size: usize,

    #[serde(default = "default_chunk_size")]
    pub whole_file_threshold: usize,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            max_chunk_size: default_chunk_size(),
            whole_file_threshold: default_chunk_size(),
        }
    }
}

fn default_chunk_size() -> usize {
    4000
}

/// Vector index construction and location
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Base path shared by the structure and chunk-list artifacts
    #[serde(default = "default_index_path")]
    pub path: PathBuf,

    #[serde(default = "default_embed_batch_size")]
    pub embed_batch_size: usize,

    #[serde(default = "default_max_clusters")]
    pub max_clusters: usize,

    #[serde(default = "default_min_points_per_cluster")]
    pub min_points_per_cluster: usize,

    /// Clusters probed per query
    #[serde(default = "default_nprobe")]
    pub nprobe: usize,

    #[serde(default = "default_kmeans_iterations")]
    pub kmeans_iterations: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            path: default_index_path(),
            embed_batch_size: default_embed_batch_size(),
            max_clusters: default_max_clusters(),
            min_points_per_cluster: default_min_points_per_cluster(),
            nprobe: default_nprobe(),
            kmeans_iterations: default_kmeans_iterations(),
        }
    }
}

fn default_index_path() -> PathBuf {
    if let Ok(path) = std::env::var("REPOLENS_INDEX") {
        return PathBuf::from(path);
    }
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(crate::DATA_DIR_NAME)
        .join("index")
}

fn default_embed_batch_size() -> usize {
    32
}

fn default_max_clusters() -> usize {
    100
}

fn default_min_points_per_cluster() -> usize {
    2
}

fn default_nprobe() -> usize {
    10
}

fn default_kmeans_iterations() -> usize {
    20
}

/// Query-time ranking parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f32,

    /// Score multiplier for documentation files; 1.0 disables the penalty
    #[serde(default = "default_doc_penalty")]
    pub doc_penalty: f32,

    #[serde(default = "default_doc_extensions")]
    pub doc_extensions: Vec<String>,

    #[serde(default)]
    pub preprocess_query: bool,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            similarity_threshold: default_similarity_threshold(),
            doc_penalty: default_doc_penalty(),
            doc_extensions: default_doc_extensions(),
            preprocess_query: false,
        }
    }
}

fn default_top_k() -> usize {
    5
}

fn default_similarity_threshold() -> f32 {
    0.1
}

fn default_doc_penalty() -> f32 {
    0.5
}

fn default_doc_extensions() -> Vec<String> {
    [".md", ".rst", ".txt"].iter().map(|s| s.to_string()).collect()
}

/// Embedding service configuration (OpenAI-compatible `/v1/embeddings`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingServiceConfig {
    pub url: String,

    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// API key (optional, for authenticated services)
    #[serde(default)]
    pub api_key: Option<String>,

    /// Embedding dimensions (detected from the first response if not specified)
    #[serde(default)]
    pub dimensions: Option<usize>,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingServiceConfig {
    fn default() -> Self {
        Self {
            url: std::env::var("REPOLENS_EMBEDDING_URL")
                .unwrap_or_else(|_| "http://localhost:8000".to_string()),
            model: default_embedding_model(),
            api_key: std::env::var("REPOLENS_EMBEDDING_API_KEY").ok(),
            dimensions: std::env::var("REPOLENS_EMBEDDING_DIMS")
                .ok()
                .and_then(|s| s.parse().ok()),
            timeout_secs: default_timeout(),
        }
    }
}

fn default_embedding_model() -> String {
    std::env::var("REPOLENS_EMBEDDING_MODEL")
        .unwrap_or_else(|_| "sentence-transformers/all-MiniLM-L6-v2".to_string())
}

fn default_timeout() -> u64 {
    30
}

impl Config {
    /// Load config from default path
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::default_path())
    }

    /// Load config from a specific file, using defaults when it does not exist
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Config = serde_yaml::from_str(&content)?;
            config.validate()?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    /// Save config to default path
    pub fn save(&self) -> Result<()> {
        let path = Self::default_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get default config path
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(crate::CONFIG_DIR_NAME)
            .join("config.yml")
    }

    /// Token for the GitHub source, config first then environment
    pub fn github_token(&self) -> Option<String> {
        self.github_token
            .clone()
            .or_else(|| std::env::var("GITHUB_TOKEN").ok())
    }

    /// Reject values that would stall traversal or break chunking
    pub fn validate(&self) -> Result<()> {
        if self.chunking.max_chunk_size == 0 {
            return Err(RepoLensError::Config(
                "chunking.max_chunk_size must be at least 1".to_string(),
            ));
        }
        if self.traversal.requests_per_window == 0 || self.traversal.window_secs == 0 {
            return Err(RepoLensError::Config(
                "traversal.requests_per_window and traversal.window_secs must be positive"
                    .to_string(),
            ));
        }
        if self.traversal.max_concurrent_fetches == 0 {
            return Err(RepoLensError::Config(
                "traversal.max_concurrent_fetches must be at least 1".to_string(),
            ));
        }
        if self.index.embed_batch_size == 0 || self.index.min_points_per_cluster == 0 {
            return Err(RepoLensError::Config(
                "index.embed_batch_size and index.min_points_per_cluster must be positive"
                    .to_string(),
            ));
        }
        let penalty = self.retrieval.doc_penalty;
        if !(penalty > 0.0 && penalty <= 1.0) {
            return Err(RepoLensError::Config(
                "retrieval.doc_penalty must be within (0, 1]".to_string(),
            ));
        }
        Ok(())
    }
}
