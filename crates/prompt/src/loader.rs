//! Loader for YAML prompt definitions under `.lexchat/prompts/`.

use crate::types::PromptDefinition;
use lexchat_core::{AppError, AppResult};
use std::path::{Path, PathBuf};

/// Placeholder every system template must contain.
pub const CONTEXT_PLACEHOLDER: &str = "{{context}}";

fn prompts_dir(workspace_path: &Path) -> PathBuf {
    workspace_path.join(".lexchat/prompts")
}

/// Load a prompt definition by ID from the workspace.
///
/// Looks for `<id>.yml` in `.lexchat/prompts/`.
///
/// # Example
/// ```no_run
/// use lexchat_prompt::load_prompt;
/// use std::path::Path;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let prompt = load_prompt(Path::new("."), "rag.system.default")?;
/// println!("Loaded prompt: {}", prompt.title);
/// # Ok(())
/// # }
/// ```
pub fn load_prompt(workspace_path: &Path, prompt_id: &str) -> AppResult<PromptDefinition> {
    let prompt_file = prompts_dir(workspace_path).join(format!("{}.yml", prompt_id));

    tracing::debug!("Loading prompt from: {:?}", prompt_file);

    if !prompt_file.exists() {
        return Err(AppError::Prompt(format!(
            "Prompt file not found: {:?}",
            prompt_file
        )));
    }

    let contents = std::fs::read_to_string(&prompt_file).map_err(|e| {
        AppError::Prompt(format!(
            "Failed to read prompt file {:?}: {}",
            prompt_file, e
        ))
    })?;

    let definition: PromptDefinition = serde_yaml::from_str(&contents).map_err(|e| {
        AppError::Prompt(format!(
            "Failed to parse prompt YAML {:?}: {}",
            prompt_file, e
        ))
    })?;

    validate_prompt(&definition)?;

    if definition.id != prompt_id {
        tracing::warn!(
            "Prompt file {:?} declares id '{}'",
            prompt_file,
            definition.id
        );
    }

    tracing::info!("Loaded prompt: {} ({})", definition.id, definition.title);

    Ok(definition)
}

/// List all available prompt IDs in the workspace, sorted.
pub fn list_prompts(workspace_path: &Path) -> AppResult<Vec<String>> {
    let dir = prompts_dir(workspace_path);

    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut prompt_ids = Vec::new();

    for entry in std::fs::read_dir(&dir)? {
        let path = entry?.path();
        if path.is_file() && path.extension().and_then(|s| s.to_str()) == Some("yml") {
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                prompt_ids.push(stem.to_string());
            }
        }
    }

    prompt_ids.sort();
    Ok(prompt_ids)
}

/// Check that a system template can receive the context block.
pub fn validate_template(template: &str) -> AppResult<()> {
    if template.trim().is_empty() {
        return Err(AppError::Prompt(
            "Prompt template cannot be empty".to_string(),
        ));
    }

    if !template.contains(CONTEXT_PLACEHOLDER) {
        return Err(AppError::Prompt(format!(
            "Prompt template must contain {}",
            CONTEXT_PLACEHOLDER
        )));
    }

    Ok(())
}

/// Validate a prompt definition.
fn validate_prompt(def: &PromptDefinition) -> AppResult<()> {
    if def.id.is_empty() {
        return Err(AppError::Prompt("Prompt ID cannot be empty".to_string()));
    }

    if def.title.is_empty() {
        return Err(AppError::Prompt("Prompt title cannot be empty".to_string()));
    }

    if def.api_version.is_empty() {
        return Err(AppError::Prompt(
            "Prompt apiVersion cannot be empty".to_string(),
        ));
    }

    // Simple x.y check
    if !def.api_version.contains('.') {
        return Err(AppError::Prompt(format!(
            "Invalid apiVersion format: {}. Expected format: 'x.y'",
            def.api_version
        )));
    }

    validate_template(&def.template)
}
