//! Status command

use crate::app::OutputFormat;
use anyhow::Result;
use repolens_core::{Config, IndexStore, RepoLensError};

pub async fn run(config: &Config, format: OutputFormat) -> Result<()> {
    let store = IndexStore::new(config.index.path.clone());

    let manifest = match store.manifest() {
        Ok(manifest) => manifest,
        Err(RepoLensError::IndexNotReady) => {
            match format {
                OutputFormat::Json => {
                    println!("{}", serde_json::json!({ "ready": false, "path": store.base() }));
                }
                OutputFormat::Cli => {
                    println!("No index at {}", store.base().display());
                    println!("Run 'repolens index <ROOT>' to build one.");
                }
            }
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string_pretty(&serde_json::json!({
                    "ready": true,
                    "path": store.base(),
                    "manifest": manifest,
                }))?
            );
        }
        OutputFormat::Cli => {
            println!("Index:           {}", store.base().display());
            println!("Source:          {}", manifest.source);
            println!("Chunks:          {}", manifest.chunk_count);
            println!("Topology:        {}", manifest.topology);
            println!("Model:           {}", manifest.model);
            println!("Created:         {}", manifest.created_at.format("%Y-%m-%d %H:%M:%S UTC"));
        }
    }
    Ok(())
}
