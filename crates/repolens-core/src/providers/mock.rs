//! In-memory remote source for tests

use super::{EncodedContent, RemoteEntry, RemoteSource};
use crate::error::{RepoLensError, Result};
use base64::Engine;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

#[derive(Default)]
pub(crate) struct MockSource {
    dirs: HashMap<String, Vec<RemoteEntry>>,
    files: HashMap<String, Vec<u8>>,
    statuses: HashMap<String, u16>,
    latency: Option<Duration>,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl MockSource {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_dir(mut self, path: &str, entries: Vec<RemoteEntry>) -> Self {
        self.dirs.insert(path.to_string(), entries);
        self
    }

    pub(crate) fn with_file(self, path: &str, content: &str) -> Self {
        self.with_bytes(path, content.as_bytes())
    }

    pub(crate) fn with_bytes(mut self, path: &str, bytes: &[u8]) -> Self {
        self.files.insert(path.to_string(), bytes.to_vec());
        self
    }

    /// Answer requests for `path` with a non-success status
    pub(crate) fn with_status(mut self, path: &str, status: u16) -> Self {
        self.statuses.insert(path.to_string(), status);
        self
    }

    /// Sleep this long inside every call
    pub(crate) fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Highest number of calls observed in progress at once
    pub(crate) fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    async fn enter(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(current, Ordering::SeqCst);
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }

    fn check_status(&self, path: &str) -> Result<()> {
        match self.statuses.get(path) {
            Some(status) => Err(RepoLensError::FetchFailed {
                path: path.to_string(),
                status: *status,
            }),
            None => Ok(()),
        }
    }
}

#[async_trait::async_trait]
impl RemoteSource for MockSource {
    fn source_type(&self) -> &'static str {
        "mock"
    }

    async fn list(&self, path: &str) -> Result<Vec<RemoteEntry>> {
        self.enter().await;
        self.check_status(path)?;
        self.dirs.get(path).cloned().ok_or(RepoLensError::FetchFailed {
            path: path.to_string(),
            status: 404,
        })
    }

    async fn get_content(&self, path: &str) -> Result<EncodedContent> {
        self.enter().await;
        self.check_status(path)?;
        let bytes = self.files.get(path).ok_or(RepoLensError::FetchFailed {
            path: path.to_string(),
            status: 404,
        })?;
        Ok(EncodedContent {
            path: path.to_string(),
            encoding: "base64".to_string(),
            content: base64::engine::general_purpose::STANDARD.encode(bytes),
            size: bytes.len(),
        })
    }
}
