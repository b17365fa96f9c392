//! Index command

use crate::app::{IndexArgs, OutputFormat};
use crate::output::format_stats;
use anyhow::Result;
use repolens_core::{CodeIndexer, Config, EmbedProgress};

pub async fn run(args: IndexArgs, config: Config, format: OutputFormat) -> Result<()> {
    let mut indexer = CodeIndexer::from_config(config)?;

    if format == OutputFormat::Cli {
        eprintln!("Indexing {}...", args.root);
        indexer = indexer.with_progress(|progress: EmbedProgress| {
            eprint!(
                "\rEmbedding: {}/{} chunks   ",
                progress.processed_chunks, progress.total_chunks
            );
        });
    }
    let result = indexer.index(&args.root).await;
    if format == OutputFormat::Cli {
        eprintln!();
    }
    let stats = result?;

    print!("{}", format_stats(&stats, &indexer.store().base().display().to_string(), format)?);
    Ok(())
}
