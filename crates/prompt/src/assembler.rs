//! Assembly of the generation request from retrieved context.

use crate::loader::validate_template;
use crate::types::PromptDefinition;
use handlebars::Handlebars;
use lexchat_core::{AppError, AppResult, GenerationRequest, RetrievedChunk};
use serde_json::json;

/// Built-in system template.
pub const DEFAULT_SYSTEM_TEMPLATE: &str = "You are an assistant for both general conversation and question-answering tasks. \
For question-answering tasks, use the following pieces of retrieved context to answer the question. \
If you don't know the answer, say that you don't know. \
Use three sentences maximum and keep the answer concise.\
\n\n{{context}}";

/// Separator placed between chunk texts in the context block.
pub const CONTEXT_SEPARATOR: &str = "\n\n";

const TEMPLATE_NAME: &str = "system";

/// Fills the system template with retrieved context.
///
/// The template is compiled once; [`PromptAssembler::build`] does no I/O and
/// returns the same request for the same inputs.
pub struct PromptAssembler {
    handlebars: Handlebars<'static>,
    source_id: String,
    max_context_chars: Option<usize>,
}

impl PromptAssembler {
    /// Compile a system template. It must contain `{{context}}`.
    pub fn new(template: &str) -> AppResult<Self> {
        Self::compile("inline", template)
    }

    /// Assembler using [`DEFAULT_SYSTEM_TEMPLATE`].
    pub fn with_default_template() -> AppResult<Self> {
        Self::compile("builtin", DEFAULT_SYSTEM_TEMPLATE)
    }

    /// Assembler for a loaded prompt definition.
    pub fn from_definition(definition: &PromptDefinition) -> AppResult<Self> {
        Self::compile(&definition.id, &definition.template)
    }

    fn compile(source_id: &str, template: &str) -> AppResult<Self> {
        validate_template(template)?;

        let mut handlebars = Handlebars::new();
        // Plain text, not HTML
        handlebars.register_escape_fn(handlebars::no_escape);
        handlebars
            .register_template_string(TEMPLATE_NAME, template)
            .map_err(|e| AppError::Prompt(format!("Failed to register template: {}", e)))?;

        tracing::debug!("Compiled system template '{}'", source_id);

        Ok(Self {
            handlebars,
            source_id: source_id.to_string(),
            max_context_chars: None,
        })
    }

    /// Cap the context block at `max` characters. Whole chunks only.
    pub fn with_max_context_chars(mut self, max: Option<usize>) -> Self {
        self.max_context_chars = max;
        self
    }

    /// Identifier of the template in use.
    pub fn source_id(&self) -> &str {
        &self.source_id
    }

    /// Chunks that fit under the cap, in order.
    fn select<'a>(&self, context: &'a [RetrievedChunk]) -> &'a [RetrievedChunk] {
        let Some(max) = self.max_context_chars else {
            return context;
        };

        let separator = CONTEXT_SEPARATOR.chars().count();
        let mut used = 0;
        let mut taken = 0;

        for chunk in context {
            let cost = chunk.text.chars().count() + if taken > 0 { separator } else { 0 };
            if used + cost > max {
                break;
            }
            used += cost;
            taken += 1;
        }

        if taken < context.len() {
            tracing::debug!(
                "Context cap of {} chars keeps {} of {} chunks",
                max,
                taken,
                context.len()
            );
        }

        &context[..taken]
    }

    /// Build the request for one turn.
    pub fn build(&self, context: &[RetrievedChunk], query: &str) -> AppResult<GenerationRequest> {
        let selected = self.select(context);

        let block = selected
            .iter()
            .map(|chunk| chunk.text.as_str())
            .collect::<Vec<_>>()
            .join(CONTEXT_SEPARATOR);

        let instructions = self
            .handlebars
            .render(TEMPLATE_NAME, &json!({ "context": block }))
            .map_err(|e| AppError::Prompt(format!("Failed to render template: {}", e)))?;

        Ok(GenerationRequest {
            instructions,
            context: selected.to_vec(),
            query: query.to_string(),
        })
    }
}
