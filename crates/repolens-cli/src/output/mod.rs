//! Output formatters

pub mod json;
pub mod terminal;

use crate::app::OutputFormat;
use anyhow::Result;
use repolens_core::{IndexStats, RetrievalResult};

/// Format retrieval results
pub fn format_results(results: &[RetrievalResult], format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => json::format_results(results),
        OutputFormat::Cli => Ok(terminal::format_results(results)),
    }
}

/// Format the outcome of an indexing run
pub fn format_stats(stats: &IndexStats, index_path: &str, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => json::format_stats(stats, index_path),
        OutputFormat::Cli => Ok(terminal::format_stats(stats, index_path)),
    }
}
