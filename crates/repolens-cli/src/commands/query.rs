//! Query command

use crate::app::{OutputFormat, QueryArgs};
use crate::output::format_results;
use anyhow::Result;
use repolens_core::{CodeIndexer, Config, RepoLensError};

pub async fn run(args: QueryArgs, config: Config, format: OutputFormat) -> Result<()> {
    let query = args.query.join(" ");
    if query.trim().is_empty() {
        return Err(RepoLensError::InvalidInput("Query is empty".to_string()).into());
    }

    let indexer = CodeIndexer::from_config(config)?;
    let results = indexer
        .query_with_threshold(&query, args.limit, args.min_score)
        .await?;

    print!("{}", format_results(&results, format)?);
    Ok(())
}
