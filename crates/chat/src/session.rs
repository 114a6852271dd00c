//! Per-session transcript and turn handling.

use crate::router::ResponseRouter;
use lexchat_core::{AnswerResult, AppResult, Message};
use std::sync::Arc;

/// Append-only record of successful turns.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transcript {
    messages: Vec<Message>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Record a completed turn: the user message, then the answer.
    pub fn record_turn(&mut self, user: impl Into<String>, answer: impl Into<String>) {
        self.messages.push(Message::user(user));
        self.messages.push(Message::assistant(answer));
    }

    /// Drop every message.
    pub fn clear(&mut self) {
        self.messages.clear();
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// One conversation: a shared router plus this session's transcript.
pub struct ChatSession {
    router: Arc<ResponseRouter>,
    transcript: Transcript,
}

impl ChatSession {
    pub fn new(router: Arc<ResponseRouter>) -> Self {
        Self {
            router,
            transcript: Transcript::new(),
        }
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    /// Route one message. The transcript grows only when the turn succeeds.
    pub async fn ask(&mut self, input: &str) -> AppResult<AnswerResult> {
        let result = self.router.route(input, self.transcript.messages()).await?;
        self.transcript.record_turn(input, result.text.clone());
        Ok(result)
    }

    /// Start over with an empty transcript.
    pub fn reset(&mut self) {
        tracing::debug!("Clearing transcript ({} messages)", self.transcript.len());
        self.transcript.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canned::CannedReplyTable;
    use crate::testing::{CountingEmbedder, ScriptedLlm};
    use lexchat_core::{AppError, CallPolicy, Role};
    use lexchat_knowledge::{DistanceMetric, FlatIndex, IndexEntry, Retriever};
    use lexchat_llm::Generator;
    use lexchat_prompt::PromptAssembler;
    use std::time::Duration;

    fn session(llm: ScriptedLlm) -> ChatSession {
        let mut index = FlatIndex::new(2, DistanceMetric::Cosine);
        index
            .push(IndexEntry {
                text: "Section 420: Cheating.".to_string(),
                metadata: serde_json::Map::new(),
                embedding: vec![1.0, 0.0],
            })
            .unwrap();

        let policy = CallPolicy::new(Duration::from_millis(50), 0, Duration::ZERO);
        let router = ResponseRouter::new(
            Arc::new(CannedReplyTable::default()),
            Retriever::new(Arc::new(CountingEmbedder::new(vec![1.0, 0.0])), Arc::new(index))
                .with_policy(policy),
            PromptAssembler::with_default_template().unwrap(),
            Generator::new(Arc::new(llm), "m").with_policy(policy),
        );
        ChatSession::new(Arc::new(router))
    }

    #[test]
    fn test_transcript_record_and_clear() {
        let mut transcript = Transcript::new();
        transcript.record_turn("hi", "Hello!");

        assert_eq!(transcript.len(), 2);
        assert_eq!(transcript.messages()[0].role(), Role::User);
        assert_eq!(transcript.messages()[1].content(), "Hello!");

        transcript.clear();
        assert!(transcript.is_empty());
    }

    #[tokio::test]
    async fn test_successful_turns_are_recorded() {
        let mut session = session(ScriptedLlm::answering("Section 420 covers cheating."));

        session.ask("hi").await.unwrap();
        session.ask("What is Section 420?").await.unwrap();

        let messages = session.transcript().messages();
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[2].content(), "What is Section 420?");
        assert_eq!(messages[3].content(), "Section 420 covers cheating.");
    }

    #[tokio::test]
    async fn test_failed_turn_leaves_transcript_unchanged() {
        let mut session = session(ScriptedLlm::hanging());
        session.ask("hello").await.unwrap();
        let before = session.transcript().clone();

        let err = session.ask("What is Section 420?").await.unwrap_err();

        assert!(matches!(err, AppError::RetrievalOrGeneration(_)));
        assert_eq!(session.transcript(), &before);
    }

    #[tokio::test]
    async fn test_reset() {
        let mut session = session(ScriptedLlm::answering("ok"));
        session.ask("thanks").await.unwrap();
        session.reset();
        assert!(session.transcript().is_empty());
    }
}
