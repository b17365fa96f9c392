//! Cached, rate-limited access to a remote source

use super::{binary_placeholder, EncodedContent, RateBudget, RemoteEntry, RemoteSource, TtlCache};
use crate::config::TraversalConfig;
use crate::error::{RepoLensError, Result};
use base64::Engine;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// What is being fetched for a path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FetchKind {
    Listing,
    Content,
}

impl FetchKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Listing => "listing",
            Self::Content => "content",
        }
    }
}

/// Resolved fetch result, as stored in the cache
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    Listing(Vec<RemoteEntry>),
    Content(String),
}

/// Cache key for a fetch request
pub fn cache_key(kind: FetchKind, path: &str) -> String {
    format!("{}:{}", kind.as_str(), path)
}

/// Fetcher owned by one traversal session.
///
/// Cache hits never consume a permit. Concurrent misses on the same key may
/// both reach the network; the later insert wins.
pub struct CachedFetcher {
    source: Arc<dyn RemoteSource>,
    cache: TtlCache<Payload>,
    budget: Arc<RateBudget>,
    requests: AtomicUsize,
}

impl CachedFetcher {
    pub fn new(source: Arc<dyn RemoteSource>, cache: TtlCache<Payload>, budget: Arc<RateBudget>) -> Self {
        Self {
            source,
            cache,
            budget,
            requests: AtomicUsize::new(0),
        }
    }

    /// Build cache and budget from traversal settings
    pub fn from_config(source: Arc<dyn RemoteSource>, config: &TraversalConfig) -> Self {
        let cache = TtlCache::new(config.cache_capacity, config.cache_ttl());
        let budget = Arc::new(RateBudget::new(config.requests_per_window, config.window()));
        Self::new(source, cache, budget)
    }

    /// Fetch a listing or a decoded file body
    pub async fn fetch(&self, kind: FetchKind, path: &str) -> Result<Payload> {
        let key = cache_key(kind, path);
        if let Some(payload) = self.cache.get(&key) {
            tracing::trace!("Cache hit for {}", key);
            return Ok(payload);
        }

        self.budget.acquire().await;
        self.requests.fetch_add(1, Ordering::Relaxed);
        tracing::debug!("Fetching {}", key);

        let payload = match kind {
            FetchKind::Listing => Payload::Listing(self.source.list(path).await?),
            FetchKind::Content => {
                let encoded = self.source.get_content(path).await?;
                Payload::Content(decode_content(encoded)?)
            }
        };

        self.cache.insert(key, payload.clone());
        Ok(payload)
    }

    /// Fetch a directory listing
    pub async fn list(&self, path: &str) -> Result<Vec<RemoteEntry>> {
        match self.fetch(FetchKind::Listing, path).await? {
            Payload::Listing(entries) => Ok(entries),
            Payload::Content(_) => Err(RepoLensError::InvalidInput(format!(
                "Expected a directory listing for '{}'",
                path
            ))),
        }
    }

    /// Fetch a decoded file body
    pub async fn content(&self, path: &str) -> Result<String> {
        match self.fetch(FetchKind::Content, path).await? {
            Payload::Content(text) => Ok(text),
            Payload::Listing(_) => Err(RepoLensError::InvalidInput(format!(
                "Expected file content for '{}'",
                path
            ))),
        }
    }

    /// Network calls issued so far (cache hits excluded)
    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::Relaxed)
    }

    pub fn source_type(&self) -> &'static str {
        self.source.source_type()
    }
}

/// Decode a file body; bytes that are not UTF-8 become a placeholder string
pub fn decode_content(encoded: EncodedContent) -> Result<String> {
    let bytes = match encoded.encoding.as_str() {
        "base64" => {
            let compact: String = encoded
                .content
                .chars()
                .filter(|c| !c.is_ascii_whitespace())
                .collect();
            base64::engine::general_purpose::STANDARD
                .decode(compact)
                .map_err(|e| RepoLensError::DecodeFailed {
                    path: encoded.path.clone(),
                    reason: format!("Base64 decode error: {}", e),
                })?
        }
        "" | "none" | "utf-8" => {
            if encoded.content.is_empty() && encoded.size > 0 {
                return Err(RepoLensError::DecodeFailed {
                    path: encoded.path,
                    reason: format!("Body of {} bytes was not inlined", encoded.size),
                });
            }
            encoded.content.into_bytes()
        }
        other => {
            return Err(RepoLensError::DecodeFailed {
                path: encoded.path,
                reason: format!("Unsupported encoding '{}'", other),
            });
        }
    };

    let size = bytes.len();
    match String::from_utf8(bytes) {
        Ok(text) => Ok(text),
        Err(_) => {
            tracing::debug!("Binary content in {} ({} bytes)", encoded.path, size);
            Ok(binary_placeholder(&encoded.path, size))
        }
    }
}
