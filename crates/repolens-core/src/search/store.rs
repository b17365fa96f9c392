//! On-disk persistence of an index and its chunk list
//!
//! An index is stored as two companion files sharing a base path:
//! `<base>.index.json` holds the manifest and searchable structure,
//! `<base>.chunks.json` holds the ordered chunk list. The manifest records
//! the chunk count and a blake3 fingerprint of the chunk file, so a pair
//! left inconsistent by an interrupted save is rejected on load.

use super::vector_index::{Topology, VectorIndex};
use crate::error::{RepoLensError, Result};
use crate::index::Chunk;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::path::{Path, PathBuf};

const FORMAT_VERSION: u32 = 1;
const INDEX_SUFFIX: &str = ".index.json";
const CHUNKS_SUFFIX: &str = ".chunks.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexManifest {
    pub version: u32,
    pub created_at: DateTime<Utc>,
    /// Embedding model the vectors were produced with
    pub model: String,
    /// Indexed root, as given to the indexer
    pub source: String,
    pub chunk_count: usize,
    pub chunks_fingerprint: String,
    pub topology: Topology,
}

#[derive(Serialize, Deserialize)]
struct IndexFile {
    manifest: IndexManifest,
    index: VectorIndex,
}

/// Restored index with its parallel chunk list
#[derive(Debug, Clone)]
pub struct LoadedIndex {
    pub manifest: IndexManifest,
    pub index: VectorIndex,
    pub chunks: Vec<Chunk>,
}

/// Location of an index artifact pair
#[derive(Debug, Clone)]
pub struct IndexStore {
    base: PathBuf,
}

impl IndexStore {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    pub fn index_path(&self) -> PathBuf {
        with_suffix(&self.base, INDEX_SUFFIX)
    }

    pub fn chunks_path(&self) -> PathBuf {
        with_suffix(&self.base, CHUNKS_SUFFIX)
    }

    /// Whether either artifact is present
    pub fn exists(&self) -> bool {
        self.index_path().exists() || self.chunks_path().exists()
    }

    /// Write both artifacts, chunk list first
    pub fn save(
        &self,
        index: &VectorIndex,
        chunks: &[Chunk],
        model: &str,
        source: &str,
    ) -> Result<IndexManifest> {
        index.validate(chunks.len())?;
        if let Some(parent) = self.base.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let chunk_bytes = serde_json::to_vec(chunks)?;
        let manifest = IndexManifest {
            version: FORMAT_VERSION,
            created_at: Utc::now(),
            model: model.to_string(),
            source: source.to_string(),
            chunk_count: chunks.len(),
            chunks_fingerprint: fingerprint(&chunk_bytes),
            topology: index.topology(),
        };

        write_atomic(&self.chunks_path(), &chunk_bytes)?;
        let file = IndexFile {
            manifest,
            index: index.clone(),
        };
        write_atomic(&self.index_path(), &serde_json::to_vec(&file)?)?;

        tracing::info!(
            "Saved index ({} chunks, {}) to {}",
            chunks.len(),
            file.manifest.topology,
            self.base.display()
        );
        Ok(file.manifest)
    }

    /// Read the manifest only
    pub fn manifest(&self) -> Result<IndexManifest> {
        Ok(self.read_index_file()?.manifest)
    }

    /// Restore both artifacts and check they still belong together
    pub fn load(&self) -> Result<LoadedIndex> {
        let file = self.read_index_file()?;
        let chunk_bytes = match std::fs::read(self.chunks_path()) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(RepoLensError::CorruptIndex(format!(
                    "Chunk list {} is missing",
                    self.chunks_path().display()
                )))
            }
            Err(e) => return Err(e.into()),
        };

        if fingerprint(&chunk_bytes) != file.manifest.chunks_fingerprint {
            return Err(RepoLensError::CorruptIndex(
                "Chunk list does not match the index it was saved with".to_string(),
            ));
        }
        let chunks: Vec<Chunk> = serde_json::from_slice(&chunk_bytes)
            .map_err(|e| RepoLensError::CorruptIndex(format!("Unreadable chunk list: {}", e)))?;
        if chunks.len() != file.manifest.chunk_count {
            return Err(RepoLensError::CorruptIndex(format!(
                "Manifest records {} chunks, chunk list has {}",
                file.manifest.chunk_count,
                chunks.len()
            )));
        }
        file.index.validate(chunks.len())?;

        tracing::debug!(
            "Loaded index from {} ({} chunks)",
            self.base.display(),
            chunks.len()
        );
        Ok(LoadedIndex {
            manifest: file.manifest,
            index: file.index,
            chunks,
        })
    }

    fn read_index_file(&self) -> Result<IndexFile> {
        let bytes = match std::fs::read(self.index_path()) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(if self.chunks_path().exists() {
                    RepoLensError::CorruptIndex(format!(
                        "Index structure {} is missing",
                        self.index_path().display()
                    ))
                } else {
                    RepoLensError::IndexNotReady
                });
            }
            Err(e) => return Err(e.into()),
        };

        let file: IndexFile = serde_json::from_slice(&bytes)
            .map_err(|e| RepoLensError::CorruptIndex(format!("Unreadable index: {}", e)))?;
        if file.manifest.version != FORMAT_VERSION {
            return Err(RepoLensError::CorruptIndex(format!(
                "Unsupported index format version {}",
                file.manifest.version
            )));
        }
        Ok(file)
    }
}

fn fingerprint(bytes: &[u8]) -> String {
    blake3::hash(bytes).to_hex().to_string()
}

fn with_suffix(base: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(base.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let tmp = with_suffix(path, ".tmp");
    std::fs::write(&tmp, bytes)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IndexConfig;
    use crate::index::chunk_file;
    use tempfile::TempDir;

    fn fixture() -> (VectorIndex, Vec<Chunk>) {
        let chunks = chunk_file("src/lib.rs", "one\ntwo\nthree\nfour", 3, 0);
        let vectors = (0..chunks.len()).map(|i| vec![i as f32, 1.0]).collect();
        let index = VectorIndex::build(vectors, &IndexConfig::default()).unwrap();
        (index, chunks)
    }

    #[test]
    fn test_artifact_paths() {
        let store = IndexStore::new("/data/repolens/index");
        assert_eq!(store.index_path(), PathBuf::from("/data/repolens/index.index.json"));
        assert_eq!(store.chunks_path(), PathBuf::from("/data/repolens/index.chunks.json"));
    }

    #[test]
    fn test_save_and_load() {
        let temp = TempDir::new().unwrap();
        let store = IndexStore::new(temp.path().join("nested").join("index"));
        let (index, chunks) = fixture();

        let manifest = store.save(&index, &chunks, "test-model", "/repo").unwrap();
        assert_eq!(manifest.chunk_count, 4);

        let loaded = store.load().unwrap();
        assert_eq!(loaded.chunks, chunks);
        assert_eq!(loaded.manifest.model, "test-model");
        let hits = loaded.index.search(&[2.0, 1.0], 1).unwrap();
        assert_eq!(loaded.chunks[hits[0].position].start_line, 3);
    }

    #[test]
    fn test_missing_pair_not_ready() {
        let temp = TempDir::new().unwrap();
        let store = IndexStore::new(temp.path().join("index"));
        assert!(!store.exists());
        assert!(matches!(store.load(), Err(RepoLensError::IndexNotReady)));
    }

    #[test]
    fn test_missing_companion_is_corrupt() {
        let temp = TempDir::new().unwrap();
        let store = IndexStore::new(temp.path().join("index"));
        let (index, chunks) = fixture();

        store.save(&index, &chunks, "m", "/repo").unwrap();
        std::fs::remove_file(store.chunks_path()).unwrap();
        assert!(matches!(store.load(), Err(RepoLensError::CorruptIndex(_))));

        store.save(&index, &chunks, "m", "/repo").unwrap();
        std::fs::remove_file(store.index_path()).unwrap();
        assert!(matches!(store.load(), Err(RepoLensError::CorruptIndex(_))));
    }

    #[test]
    fn test_mismatched_chunk_list_is_corrupt() {
        let temp = TempDir::new().unwrap();
        let store = IndexStore::new(temp.path().join("index"));
        let (index, chunks) = fixture();
        store.save(&index, &chunks, "m", "/repo").unwrap();

        let fewer = serde_json::to_vec(&chunks[..2]).unwrap();
        std::fs::write(store.chunks_path(), fewer).unwrap();
        assert!(matches!(store.load(), Err(RepoLensError::CorruptIndex(_))));
    }

    #[test]
    fn test_save_rejects_length_mismatch() {
        let temp = TempDir::new().unwrap();
        let store = IndexStore::new(temp.path().join("index"));
        let (index, chunks) = fixture();
        let err = store.save(&index, &chunks[..1], "m", "/repo").unwrap_err();
        assert!(matches!(err, RepoLensError::CorruptIndex(_)));
        assert!(!store.exists());
    }
}
