//! Indexing and query session
//!
//! A [`CodeIndexer`] owns the configuration, the embedder and the index
//! location. Each `index` call builds its own fetcher, so cache and rate
//! budget are never shared between sessions.

use crate::config::Config;
use crate::error::{RepoLensError, Result};
use crate::index::{
    embed_chunks, walk_local, Chunker, EmbedProgress, IgnoreRuleSet, ProgressFn, RemoteWalker,
    WalkOutput,
};
use crate::llm::{Embedder, HttpEmbedder};
use crate::providers::{CachedFetcher, GitHubRepo, GitHubSource, RemoteSource};
use crate::search::{
    preprocess_query, IndexManifest, IndexStore, LoadedIndex, RetrievalResult, Retriever,
    Topology, VectorIndex,
};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Outcome of an indexing run
#[derive(Debug, Clone, Serialize)]
pub struct IndexStats {
    pub source: String,
    pub files: usize,
    /// Entries kept out of the index because they could not be read
    pub skipped: usize,
    pub chunks: usize,
    pub bytes: usize,
    pub topology: Topology,
    /// Remote requests issued, for hosted sources
    pub requests: Option<usize>,
}

pub struct CodeIndexer {
    config: Config,
    embedder: Arc<dyn Embedder>,
    store: IndexStore,
    state: RwLock<Option<LoadedIndex>>,
    progress: Option<ProgressFn>,
}

impl CodeIndexer {
    pub fn new(config: Config, embedder: Arc<dyn Embedder>) -> Self {
        let store = IndexStore::new(config.index.path.clone());
        Self {
            config,
            embedder,
            store,
            state: RwLock::new(None),
            progress: None,
        }
    }

    /// Build with the HTTP embedder described by `config.embedding`
    pub fn from_config(config: Config) -> Result<Self> {
        config.validate()?;
        let embedder = HttpEmbedder::from_config(config.embedding.clone())?;
        Ok(Self::new(config, Arc::new(embedder)))
    }

    /// Override the index base path
    pub fn with_index_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.store = IndexStore::new(path);
        self
    }

    /// Report embedding progress after every batch
    pub fn with_progress(
        mut self,
        progress: impl Fn(EmbedProgress) + Send + Sync + 'static,
    ) -> Self {
        self.progress = Some(Box::new(progress));
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &IndexStore {
        &self.store
    }

    fn base_rules(&self) -> IgnoreRuleSet {
        IgnoreRuleSet::with_defaults().extended("", &self.config.traversal.extra_ignore_patterns)
    }

    /// Index a local directory or a GitHub repository URL
    pub async fn index(&self, root: &str) -> Result<IndexStats> {
        if GitHubRepo::is_github_url(root) {
            let repo = GitHubRepo::parse(root)?;
            let source = GitHubSource::new(repo, self.config.github_token())?;
            self.index_remote(Arc::new(source), root).await
        } else {
            self.index_local(Path::new(root)).await
        }
    }

    /// Index a local directory
    pub async fn index_local(&self, root: &Path) -> Result<IndexStats> {
        let rules = self.base_rules();
        let path = root.to_path_buf();
        let walk = tokio::task::spawn_blocking(move || walk_local(&path, &rules))
            .await
            .map_err(|e| RepoLensError::Other(anyhow::anyhow!("Walk task failed: {}", e)))??;

        self.build_from_walk(walk, &root.display().to_string(), None)
            .await
    }

    /// Index a hosted tree through a fresh cached, rate-limited fetcher
    pub async fn index_remote(&self, source: Arc<dyn RemoteSource>, label: &str) -> Result<IndexStats> {
        let fetcher = Arc::new(CachedFetcher::from_config(source, &self.config.traversal));
        let walker = RemoteWalker::new(
            Arc::clone(&fetcher),
            self.base_rules(),
            self.config.traversal.max_concurrent_fetches,
        );
        let tree = walker.walk().await?;
        let walk = WalkOutput::from_tree(&tree);

        self.build_from_walk(walk, label, Some(fetcher.request_count()))
            .await
    }

    async fn build_from_walk(
        &self,
        walk: WalkOutput,
        source: &str,
        requests: Option<usize>,
    ) -> Result<IndexStats> {
        for (path, reason) in &walk.unreadable {
            tracing::warn!("Skipping {}: {}", path, reason);
        }

        let chunker = Chunker::from_config(&self.config.chunking);
        let chunks = chunker.chunk_all(&walk.files);
        if chunks.is_empty() {
            return Err(RepoLensError::InvalidInput(format!(
                "No indexable content found in {}",
                source
            )));
        }
        tracing::info!(
            "Chunked {} files from {} into {} chunks",
            walk.files.len(),
            source,
            chunks.len()
        );

        let vectors = embed_chunks(
            self.embedder.as_ref(),
            &chunks,
            self.config.index.embed_batch_size,
            self.progress.as_deref(),
        )
        .await?;
        let index = VectorIndex::build(vectors, &self.config.index)?;
        let manifest = self
            .store
            .save(&index, &chunks, self.embedder.model_name(), source)?;

        let stats = IndexStats {
            source: source.to_string(),
            files: walk.files.len(),
            skipped: walk.unreadable.len(),
            chunks: chunks.len(),
            bytes: walk.total_bytes(),
            topology: index.topology(),
            requests,
        };

        *self.state.write().await = Some(LoadedIndex {
            manifest,
            index,
            chunks,
        });
        Ok(stats)
    }

    /// Restore the persisted index into this session
    pub async fn load(&self) -> Result<IndexManifest> {
        let loaded = self.store.load()?;
        if loaded.manifest.model != self.embedder.model_name() {
            tracing::warn!(
                "Index was built with '{}' but queries will use '{}'; scores may be meaningless",
                loaded.manifest.model,
                self.embedder.model_name()
            );
        }
        let manifest = loaded.manifest.clone();
        *self.state.write().await = Some(loaded);
        Ok(manifest)
    }

    /// Manifest of the persisted index
    pub fn status(&self) -> Result<IndexManifest> {
        self.store.manifest()
    }

    /// Retrieve with the configured threshold
    pub async fn query(&self, text: &str, top_k: Option<usize>) -> Result<Vec<RetrievalResult>> {
        self.query_with_threshold(text, top_k, None).await
    }

    /// Retrieve, loading the persisted index on first use
    pub async fn query_with_threshold(
        &self,
        text: &str,
        top_k: Option<usize>,
        similarity_threshold: Option<f32>,
    ) -> Result<Vec<RetrievalResult>> {
        if self.state.read().await.is_none() {
            self.load().await?;
        }

        let retrieval = &self.config.retrieval;
        let query = if retrieval.preprocess_query {
            preprocess_query(text)
        } else {
            text.to_string()
        };

        let guard = self.state.read().await;
        let loaded = guard.as_ref().ok_or(RepoLensError::IndexNotReady)?;
        Retriever::new(&loaded.index, &loaded.chunks, retrieval)
            .retrieve(
                self.embedder.as_ref(),
                &query,
                top_k.unwrap_or(retrieval.top_k),
                similarity_threshold.unwrap_or(retrieval.similarity_threshold),
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::mock::MockSource;
    use crate::providers::{EntryKind, RemoteEntry};
    use async_trait::async_trait;
    use std::fs;
    use tempfile::TempDir;

    /// Letter-frequency embedder: texts sharing letters land close together
    struct LetterEmbedder;

    #[async_trait]
    impl Embedder for LetterEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            let mut v = vec![0.0f32; 26];
            for c in text.to_lowercase().chars().filter(|c| c.is_ascii_lowercase()) {
                v[(c as u8 - b'a') as usize] += 1.0;
            }
            let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt().max(1e-6);
            Ok(v.into_iter().map(|x| x / norm).collect())
        }

        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            let mut out = Vec::new();
            for text in texts {
                out.push(self.embed(text).await?);
            }
            Ok(out)
        }

        fn dimensions(&self) -> usize {
            26
        }

        fn model_name(&self) -> &str {
            "letters"
        }
    }

    fn indexer(temp: &TempDir) -> CodeIndexer {
        CodeIndexer::new(Config::default(), Arc::new(LetterEmbedder))
            .with_index_path(temp.path().join("store").join("index"))
    }

    fn sample_tree(temp: &TempDir) -> PathBuf {
        let root = temp.path().join("repo");
        fs::create_dir_all(root.join("src")).unwrap();
        fs::write(root.join("src/zebra.rs"), "zzz zebra zone").unwrap();
        fs::write(root.join("src/apple.rs"), "apple pie and apples").unwrap();
        fs::write(root.join("Cargo.lock"), "locked").unwrap();
        root
    }

    #[tokio::test]
    async fn test_query_before_index_not_ready() {
        let temp = TempDir::new().unwrap();
        let err = indexer(&temp).query("anything", None).await.unwrap_err();
        assert!(matches!(err, RepoLensError::IndexNotReady));
    }

    #[tokio::test]
    async fn test_index_local_and_query() {
        let temp = TempDir::new().unwrap();
        let root = sample_tree(&temp);
        let indexer = indexer(&temp);

        let stats = indexer.index(root.to_str().unwrap()).await.unwrap();
        assert_eq!(stats.files, 2);
        assert_eq!(stats.chunks, 2);
        assert_eq!(stats.topology, Topology::Flat);
        assert!(stats.requests.is_none());

        let results = indexer.query("zebra zone", Some(1)).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].file_path, "src/zebra.rs");
    }

    #[tokio::test]
    async fn test_progress_reaches_all_chunks() {
        let temp = TempDir::new().unwrap();
        let root = sample_tree(&temp);
        let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let indexer = indexer(&temp).with_progress(move |p| {
            sink.lock().unwrap().push((p.processed_chunks, p.total_chunks));
        });

        indexer.index(root.to_str().unwrap()).await.unwrap();
        assert_eq!(seen.lock().unwrap().last(), Some(&(2, 2)));
    }

    #[tokio::test]
    async fn test_fresh_session_loads_from_disk() {
        let temp = TempDir::new().unwrap();
        let root = sample_tree(&temp);
        indexer(&temp).index(root.to_str().unwrap()).await.unwrap();

        let fresh = indexer(&temp);
        assert_eq!(fresh.status().unwrap().chunk_count, 2);
        let results = fresh.query("apple pie", Some(5)).await.unwrap();
        assert_eq!(results[0].file_path, "src/apple.rs");
    }

    #[tokio::test]
    async fn test_empty_tree_is_rejected() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("empty");
        fs::create_dir_all(&root).unwrap();
        let err = indexer(&temp).index(root.to_str().unwrap()).await.unwrap_err();
        assert!(matches!(err, RepoLensError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_index_remote_skips_unreadable() {
        let temp = TempDir::new().unwrap();
        let source = MockSource::new()
            .with_dir(
                "",
                vec![
                    RemoteEntry::new("main.rs", "main.rs", EntryKind::File),
                    RemoteEntry::new("gone.rs", "gone.rs", EntryKind::File),
                ],
            )
            .with_file("main.rs", "fn main() { run(); }")
            .with_status("gone.rs", 500);

        let stats = indexer(&temp)
            .index_remote(Arc::new(source), "mock://repo")
            .await
            .unwrap();
        assert_eq!(stats.files, 1);
        assert_eq!(stats.skipped, 1);
        assert_eq!(stats.chunks, 1);
        assert_eq!(stats.requests, Some(3));
    }
}
