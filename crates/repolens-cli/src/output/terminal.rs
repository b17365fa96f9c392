//! Terminal output formatter

use repolens_core::{IndexStats, RetrievalResult};

pub fn format_results(results: &[RetrievalResult]) -> String {
    if results.is_empty() {
        return "No results above the score threshold\n".to_string();
    }

    let mut output = String::new();
    for result in results {
        let score_pct = (result.score * 100.0) as u32;
        let lines = if result.start_line == result.end_line {
            result.start_line.to_string()
        } else {
            format!("{}-{}", result.start_line, result.end_line)
        };
        output.push_str(&format!("{:>3}% {}:{}\n", score_pct, result.file_path, lines));
    }
    output
}

pub fn format_stats(stats: &IndexStats, index_path: &str) -> String {
    let mut output = String::new();
    output.push_str(&format!("Indexed:         {}\n", stats.source));
    output.push_str(&format!("Files:           {}\n", stats.files));
    if stats.skipped > 0 {
        output.push_str(&format!("Skipped:         {}\n", stats.skipped));
    }
    output.push_str(&format!("Chunks:          {}\n", stats.chunks));
    output.push_str(&format!("Bytes:           {}\n", stats.bytes));
    output.push_str(&format!("Topology:        {}\n", stats.topology));
    if let Some(requests) = stats.requests {
        output.push_str(&format!("Requests:        {}\n", requests));
    }
    output.push_str(&format!("Saved to:        {}\n", index_path));
    output
}
