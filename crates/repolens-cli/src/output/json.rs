//! JSON output formatter

use anyhow::Result;
use repolens_core::{IndexStats, RetrievalResult};

pub fn format_results(results: &[RetrievalResult]) -> Result<String> {
    Ok(serde_json::to_string_pretty(results)? + "\n")
}

pub fn format_stats(stats: &IndexStats, index_path: &str) -> Result<String> {
    let output = serde_json::json!({
        "index": index_path,
        "stats": stats,
    });
    Ok(serde_json::to_string_pretty(&output)? + "\n")
}
