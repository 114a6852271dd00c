//! Per-message routing between canned replies and the RAG pipeline.

use crate::canned::CannedReplyTable;
use lexchat_core::{AnswerResult, AppError, AppResult, Message};
use lexchat_knowledge::Retriever;
use lexchat_llm::Generator;
use lexchat_prompt::PromptAssembler;
use std::sync::Arc;

/// Default number of chunks requested per question.
pub const DEFAULT_TOP_K: usize = 8;

/// Decides, per message, between a canned reply and a generated answer.
///
/// Holds no per-session state; the transcript is owned by the caller.
pub struct ResponseRouter {
    canned: Arc<CannedReplyTable>,
    retriever: Retriever,
    assembler: PromptAssembler,
    generator: Generator,
    top_k: usize,
}

impl ResponseRouter {
    pub fn new(
        canned: Arc<CannedReplyTable>,
        retriever: Retriever,
        assembler: PromptAssembler,
        generator: Generator,
    ) -> Self {
        Self {
            canned,
            retriever,
            assembler,
            generator,
            top_k: DEFAULT_TOP_K,
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// Answer one user message.
    ///
    /// A canned trigger always wins. Otherwise the question goes through
    /// retrieval, prompt assembly and generation; any failure there comes
    /// back as [`AppError::RetrievalOrGeneration`]. The transcript is not
    /// consulted for generation and is never modified.
    pub async fn route(&self, input: &str, transcript: &[Message]) -> AppResult<AnswerResult> {
        if let Some(reply) = self.canned.lookup(input) {
            tracing::debug!("Canned reply for {:?}", input.trim());
            return Ok(AnswerResult::canned(reply));
        }

        tracing::debug!(
            "Routing to RAG (k = {}, transcript has {} messages)",
            self.top_k,
            transcript.len()
        );

        match self.answer(input.trim()).await {
            Ok(text) => Ok(AnswerResult::generated(text)),
            Err(e) => {
                tracing::warn!("RAG path failed: {}", e);
                Err(AppError::rag(e))
            }
        }
    }

    async fn answer(&self, query: &str) -> AppResult<String> {
        let context = self.retriever.fetch(query, self.top_k).await?;
        let request = self.assembler.build(&context, query)?;
        self.generator.generate(&request).await
    }
}
