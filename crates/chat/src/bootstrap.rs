//! Wiring the pipeline from configuration.

use crate::canned::CannedReplyTable;
use crate::router::ResponseRouter;
use lexchat_core::{AppConfig, AppError, AppResult, CallPolicy};
use lexchat_knowledge::{
    create_provider, load_index, EmbeddingConfig, EmbeddingProvider, Retriever, StoredIndex,
    VectorIndex,
};
use lexchat_llm::{create_client, GenerationMode, Generator};
use lexchat_prompt::{list_prompts, load_prompt, PromptAssembler};
use std::sync::Arc;

/// Prompt id that falls back to the built-in template when no file exists.
pub const DEFAULT_TEMPLATE_ID: &str = "rag.system.default";

/// Compile the system template selected by the prompt config.
///
/// Order: inline `prompt.template`, then `.lexchat/prompts/<templateId>.yml`,
/// then the built-in template for the default id.
pub fn build_assembler(config: &AppConfig) -> AppResult<PromptAssembler> {
    let prompt = &config.prompt;

    let assembler = if let Some(template) = &prompt.template {
        PromptAssembler::new(template)?
    } else {
        let file = config
            .lexchat_dir()
            .join("prompts")
            .join(format!("{}.yml", prompt.template_id));

        if file.exists() {
            PromptAssembler::from_definition(&load_prompt(&config.workspace, &prompt.template_id)?)?
        } else if prompt.template_id == DEFAULT_TEMPLATE_ID {
            PromptAssembler::with_default_template()?
        } else {
            let available = list_prompts(&config.workspace)?;
            let available = if available.is_empty() {
                "none".to_string()
            } else {
                available.join(", ")
            };
            return Err(AppError::Prompt(format!(
                "Prompt '{}' not found at {:?} (available: {})",
                prompt.template_id, file, available
            )));
        }
    };

    Ok(assembler.with_max_context_chars(prompt.max_context_chars))
}

/// Create the generator for the configured provider and model.
pub fn build_generator(config: &AppConfig) -> AppResult<Generator> {
    let provider = config.provider.as_str();
    let client = create_client(
        provider,
        config.resolve_endpoint(provider).as_deref(),
        config.resolve_api_key(provider).as_deref(),
        config.provider_timeout(provider),
    )?;

    let mode = if config.prompt.stream {
        GenerationMode::Stream
    } else {
        GenerationMode::Complete
    };

    Ok(Generator::new(client, config.model.clone())
        .with_temperature(config.prompt.temperature)
        .with_max_tokens(config.prompt.max_tokens)
        .with_mode(mode)
        .with_policy(CallPolicy::from_config(&config.resilience)))
}

/// Create the retriever over an already loaded index.
pub fn build_retriever(config: &AppConfig, stored: StoredIndex) -> AppResult<Retriever> {
    let embedding_config = EmbeddingConfig::from_app_config(config);

    if let Some(model) = &stored.embedding_model {
        if model != &embedding_config.model {
            tracing::warn!(
                "Index {:?} was built with embedding model '{}' but '{}' is configured",
                stored.path,
                model,
                embedding_config.model
            );
        }
    }

    let embedder: Arc<dyn EmbeddingProvider> = create_provider(&embedding_config)?;
    if embedder.dimensions() != stored.index.dimensions() {
        return Err(AppError::Config(format!(
            "Embedding dimensions ({}) do not match the index ({})",
            embedder.dimensions(),
            stored.index.dimensions()
        )));
    }

    let index: Arc<dyn VectorIndex> = Arc::new(stored.index);

    Ok(Retriever::new(embedder, index)
        .with_policy(CallPolicy::from_config(&config.resilience))
        .with_min_score(config.retrieval.min_score))
}

/// Validate the config, load the index and assemble the router.
///
/// A missing or unreadable index is fatal.
pub fn build_router(config: &AppConfig) -> AppResult<ResponseRouter> {
    config.validate()?;

    let stored = load_index(&config.index_path())?;
    let chunk_count = stored.chunk_count();
    if chunk_count == 0 {
        tracing::warn!("Index {:?} contains no chunks", stored.path);
    }

    let retriever = build_retriever(config, stored)?;
    let assembler = build_assembler(config)?;
    let generator = build_generator(config)?;
    let canned = Arc::new(CannedReplyTable::from_config(config.canned_replies.as_ref()));

    tracing::info!(
        "Router ready: {} canned replies, {} indexed chunks, generator {} ({}), template '{}'",
        canned.len(),
        chunk_count,
        config.provider,
        generator.model(),
        assembler.source_id()
    );

    Ok(ResponseRouter::new(canned, retriever, assembler, generator)
        .with_top_k(config.retrieval.top_k))
}

#[cfg(test)]
mod tests {
    use super::*;
    use lexchat_core::AnswerPath;
    use rusqlite::{params, Connection};
    use std::path::Path;
    use tempfile::TempDir;

    fn write_index(path: &Path, dimensions: usize) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        let conn = Connection::open(path).unwrap();
        conn.execute_batch(
            "CREATE TABLE meta (key TEXT PRIMARY KEY, value TEXT);
             CREATE TABLE chunks (id INTEGER PRIMARY KEY, text TEXT NOT NULL, metadata TEXT, embedding BLOB NOT NULL);",
        )
        .unwrap();
        conn.execute(
            "INSERT INTO meta (key, value) VALUES ('dimensions', ?1)",
            params![dimensions.to_string()],
        )
        .unwrap();

        let blob: Vec<u8> = (0..dimensions)
            .flat_map(|i| (if i == 0 { 1.0f32 } else { 0.0f32 }).to_le_bytes())
            .collect();
        conn.execute(
            "INSERT INTO chunks (text, metadata, embedding) VALUES ('Section 378: Theft.', NULL, ?1)",
            params![blob],
        )
        .unwrap();
    }

    fn offline_config(workspace: &Path) -> AppConfig {
        let mut config = AppConfig {
            workspace: workspace.to_path_buf(),
            provider: "ollama".to_string(),
            model: "llama3.2".to_string(),
            ..Default::default()
        };
        config.retrieval.embedding_provider = "mock".to_string();
        config.retrieval.embedding_dimensions = 16;
        config
    }

    #[test]
    fn test_builtin_template_for_default_id() {
        let temp = TempDir::new().unwrap();
        let assembler = build_assembler(&offline_config(temp.path())).unwrap();
        assert_eq!(assembler.source_id(), "builtin");
    }

    #[test]
    fn test_inline_template_wins() {
        let temp = TempDir::new().unwrap();
        let mut config = offline_config(temp.path());
        config.prompt.template = Some("Excerpts:\n{{context}}".to_string());

        let assembler = build_assembler(&config).unwrap();
        assert_eq!(assembler.source_id(), "inline");
    }

    #[test]
    fn test_prompt_file_is_loaded() {
        let temp = TempDir::new().unwrap();
        let prompts = temp.path().join(".lexchat/prompts");
        std::fs::create_dir_all(&prompts).unwrap();
        std::fs::write(
            prompts.join("rag.system.ipc.yml"),
            "id: rag.system.ipc\ntitle: IPC\napiVersion: \"1.0\"\ntemplate: \"IPC:\\n{{context}}\"\n",
        )
        .unwrap();

        let mut config = offline_config(temp.path());
        config.prompt.template_id = "rag.system.ipc".to_string();

        assert_eq!(build_assembler(&config).unwrap().source_id(), "rag.system.ipc");
    }

    #[test]
    fn test_unknown_prompt_id_is_an_error() {
        let temp = TempDir::new().unwrap();
        let mut config = offline_config(temp.path());
        config.prompt.template_id = "missing".to_string();
        assert!(matches!(
            build_assembler(&config),
            Err(AppError::Prompt(msg)) if msg.contains("available: none")
        ));
    }

    #[test]
    fn test_unknown_prompt_id_lists_available_prompts() {
        let temp = TempDir::new().unwrap();
        let prompts = temp.path().join(".lexchat/prompts");
        std::fs::create_dir_all(&prompts).unwrap();
        for id in ["rag.system.ipc", "rag.system.crpc"] {
            std::fs::write(
                prompts.join(format!("{}.yml", id)),
                format!("id: {}\ntitle: T\napiVersion: \"1.0\"\ntemplate: \"{{{{context}}}}\"\n", id),
            )
            .unwrap();
        }

        let mut config = offline_config(temp.path());
        config.prompt.template_id = "rag.system.bns".to_string();

        match build_assembler(&config) {
            Err(AppError::Prompt(msg)) => {
                assert!(msg.contains("'rag.system.bns'"));
                assert!(msg.contains("available: rag.system.crpc, rag.system.ipc"));
            }
            Err(other) => panic!("Unexpected error: {}", other),
            Ok(_) => panic!("Expected a missing prompt error"),
        }
    }

    #[test]
    fn test_missing_index_is_fatal() {
        let temp = TempDir::new().unwrap();
        let result = build_router(&offline_config(temp.path()));
        assert!(matches!(result, Err(AppError::Index(_))));
    }

    #[test]
    fn test_dimension_mismatch_is_fatal() {
        let temp = TempDir::new().unwrap();
        let config = offline_config(temp.path());
        write_index(&config.index_path(), 8);

        assert!(matches!(build_router(&config), Err(AppError::Config(_))));
    }

    #[tokio::test]
    async fn test_router_answers_canned_without_services() {
        let temp = TempDir::new().unwrap();
        let mut config = offline_config(temp.path());
        config.retrieval.top_k = 3;
        write_index(&config.index_path(), 16);

        let router = build_router(&config).unwrap();
        assert_eq!(router.top_k(), 3);

        let result = router.route("Bye", &[]).await.unwrap();
        assert_eq!(result.path, AnswerPath::Canned);
        assert_eq!(result.text, "Goodbye! Have a great day!");
    }
}
