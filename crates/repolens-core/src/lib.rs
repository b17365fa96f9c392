//! RepoLens Core Library
//!
//! Semantic code retrieval over local directories and hosted repositories.
//!
//! # Features
//! - Tree walking with scoped `.gitignore` rules, local or over the GitHub contents API
//! - TTL-cached, rate-limited remote fetching with bounded concurrency
//! - Deterministic line-addressable chunking
//! - Flat or IVF vector index chosen by corpus size, persisted as two checked artifacts
//! - Ranked retrieval of `(file, line range, score)` locations

pub mod config;
pub mod error;
pub mod index;
pub mod llm;
pub mod providers;
pub mod search;
pub mod session;

pub use config::{ChunkConfig, Config, EmbeddingServiceConfig, IndexConfig, RetrievalConfig, TraversalConfig};
pub use error::{RepoLensError, Error, Result};
pub use index::{chunk_file, Chunk, ChunkType, Chunker, EmbedProgress, IgnoreRuleSet, TreeNode};
pub use llm::{Embedder, HttpEmbedder};
pub use providers::{CachedFetcher, GitHubRepo, GitHubSource, RateBudget, RemoteSource, TtlCache};
pub use search::{IndexManifest, IndexStore, RetrievalResult, Retriever, Topology, VectorIndex};
pub use session::{CodeIndexer, IndexStats};

/// Default data directory name (index artifacts)
pub const DATA_DIR_NAME: &str = "repolens";

/// Default config directory name
pub const CONFIG_DIR_NAME: &str = "repolens";
