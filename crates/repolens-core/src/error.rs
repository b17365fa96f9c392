//! Error types for repolens

use thiserror::Error;

/// Result type alias using RepoLensError
pub type Result<T> = std::result::Result<T, RepoLensError>;

/// Error type alias for convenience
pub type Error = RepoLensError;

/// Exit codes for CLI
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const GENERAL_ERROR: i32 = 1;
    pub const NOT_FOUND: i32 = 2;
    pub const INVALID_INPUT: i32 = 3;
}

/// Main error type for repolens
#[derive(Debug, Error)]
pub enum RepoLensError {
    /// Remote source answered with a non-success status
    #[error("Fetch failed for '{path}': HTTP {status}")]
    FetchFailed { path: String, status: u16 },

    /// Remote body could not be decoded into bytes
    #[error("Decode failed for '{path}': {reason}")]
    DecodeFailed { path: String, reason: String },

    #[error("Index not ready: build or load an index before querying")]
    IndexNotReady,

    #[error("Corrupt index: {0}")]
    CorruptIndex(String),

    #[error("Embedding failed: {0}")]
    EmbeddingFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl RepoLensError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::IndexNotReady => exit_codes::NOT_FOUND,
            Self::FetchFailed { status: 404, .. } => exit_codes::NOT_FOUND,
            Self::InvalidInput(_) | Self::Config(_) => exit_codes::INVALID_INPUT,
            _ => exit_codes::GENERAL_ERROR,
        }
    }
}
