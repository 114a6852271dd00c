//! Shared domain types for a question-answering turn.

use serde::{Deserialize, Serialize};

/// Who authored a transcript message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// A single transcript message. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    role: Role,
    content: String,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn content(&self) -> &str {
        &self.content
    }
}

/// A chunk of indexed text returned by a similarity search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedChunk {
    /// Chunk text
    pub text: String,

    /// Source metadata carried through from the index, uninterpreted
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,

    /// Similarity score (higher = more relevant)
    pub score: f32,
}

impl RetrievedChunk {
    pub fn new(text: impl Into<String>, score: f32) -> Self {
        Self {
            text: text.into(),
            metadata: serde_json::Map::new(),
            score,
        }
    }

    pub fn with_metadata(mut self, metadata: serde_json::Map<String, serde_json::Value>) -> Self {
        self.metadata = metadata;
        self
    }
}

/// Everything the generator needs for one RAG turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// System message: the instruction template with the context block filled in
    pub instructions: String,

    /// Chunks included in the context block, in retrieval order
    pub context: Vec<RetrievedChunk>,

    /// The user's question
    pub query: String,
}

/// Which path produced the text of a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnswerPath {
    Canned,
    Generated,
}

impl AnswerPath {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Canned => "canned",
            Self::Generated => "generated",
        }
    }
}

/// The outcome of routing one user message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerResult {
    pub text: String,
    pub path: AnswerPath,
}

impl AnswerResult {
    pub fn canned(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            path: AnswerPath::Canned,
        }
    }

    pub fn generated(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            path: AnswerPath::Generated,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_constructors() {
        let msg = Message::user("What is bail?");
        assert_eq!(msg.role(), Role::User);
        assert_eq!(msg.content(), "What is bail?");
        assert_eq!(Message::assistant("ok").role(), Role::Assistant);
    }

    #[test]
    fn test_answer_result_serialization() {
        let json = serde_json::to_value(AnswerResult::canned("Hello")).unwrap();
        assert_eq!(json["path"], "canned");
        assert_eq!(json["text"], "Hello");
    }

    #[test]
    fn test_chunk_metadata_defaults_to_empty() {
        let chunk: RetrievedChunk =
            serde_json::from_str(r#"{"text": "Section 378", "score": 0.8}"#).unwrap();
        assert!(chunk.metadata.is_empty());
        assert_eq!(chunk.score, 0.8);
    }
}
