//! Index command handler: describe the configured index store.

use clap::Args;
use lexchat_core::{config::AppConfig, AppResult};
use lexchat_knowledge::{load_index, VectorIndex};

/// Show information about the loaded index
#[derive(Args, Debug)]
pub struct IndexCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl IndexCommand {
    pub fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let stored = load_index(&config.index_path())?;

        if self.json {
            let output = serde_json::json!({
                "path": stored.path,
                "chunks": stored.chunk_count(),
                "dimensions": stored.index.dimensions(),
                "metric": stored.index.metric().as_str(),
                "embeddingModel": stored.embedding_model,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
            return Ok(());
        }

        println!("Index:      {}", stored.path.display());
        println!("Chunks:     {}", stored.chunk_count());
        println!("Dimensions: {}", stored.index.dimensions());
        println!("Metric:     {}", stored.index.metric());
        if let Some(model) = &stored.embedding_model {
            println!("Embedding:  {}", model);
        }

        if model_mismatch(stored.embedding_model.as_deref(), &config.retrieval.embedding_model) {
            println!(
                "Warning: configured embedding model is '{}'",
                config.retrieval.embedding_model
            );
        }

        Ok(())
    }
}

fn model_mismatch(stored: Option<&str>, configured: &str) -> bool {
    stored.is_some_and(|model| model != configured)
}
