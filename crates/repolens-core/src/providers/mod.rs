//! Remote tree sources
//!
//! A [`RemoteSource`] exposes a hosted repository as two operations: list a
//! directory and get a file body. [`CachedFetcher`] wraps a source with a TTL
//! cache and a shared rate budget; the tree walker only talks to the fetcher.

use crate::error::Result;

mod cache;
mod fetcher;
pub mod github;
#[cfg(test)]
pub(crate) mod mock;
mod rate_limit;

pub use cache::TtlCache;
pub use fetcher::{cache_key, decode_content, CachedFetcher, FetchKind, Payload};
pub use github::{GitHubRepo, GitHubSource};
pub use rate_limit::RateBudget;

/// Remote source trait - hosted trees must implement this
#[async_trait::async_trait]
pub trait RemoteSource: Send + Sync {
    /// Source type identifier (e.g., "github")
    fn source_type(&self) -> &'static str;

    /// List the entries of a directory ("" is the root)
    async fn list(&self, path: &str) -> Result<Vec<RemoteEntry>>;

    /// Fetch a file body as delivered by the source
    async fn get_content(&self, path: &str) -> Result<EncodedContent>;
}

/// Kind of a directory entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Dir,
    /// Anything else the source reports (symlink, submodule, ...)
    Other(String),
}

impl From<&str> for EntryKind {
    fn from(value: &str) -> Self {
        match value {
            "file" => Self::File,
            "dir" => Self::Dir,
            other => Self::Other(other.to_string()),
        }
    }
}

/// Directory entry from a remote listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteEntry {
    pub name: String,
    /// Path relative to the repository root
    pub path: String,
    pub kind: EntryKind,
}

impl RemoteEntry {
    pub fn new(name: impl Into<String>, path: impl Into<String>, kind: EntryKind) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            kind,
        }
    }
}

/// File body with its declared encoding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedContent {
    pub path: String,
    /// "base64", or "none"/"" for raw text
    pub encoding: String,
    pub content: String,
    /// Size of the decoded file in bytes, as declared by the source
    pub size: usize,
}

/// Text stored in place of a file whose bytes are not valid UTF-8
pub fn binary_placeholder(path: &str, size: usize) -> String {
    format!("[Binary content] - {} - Size: {} bytes", path, size)
}
