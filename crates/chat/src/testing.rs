//! Test doubles for the embedder, the vector index and the chat-completion client.

use lexchat_core::{AppError, AppResult, RetrievedChunk};
use lexchat_knowledge::{DistanceMetric, EmbeddingProvider, FlatIndex, VectorIndex};
use lexchat_llm::{LlmClient, LlmRequest, LlmResponse, LlmStream, LlmUsage};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Returns the same vector for every text and counts calls.
#[derive(Debug)]
pub(crate) struct CountingEmbedder {
    vector: Vec<f32>,
    fail: bool,
    calls: AtomicU32,
}

impl CountingEmbedder {
    pub(crate) fn new(vector: Vec<f32>) -> Self {
        Self {
            vector,
            fail: false,
            calls: AtomicU32::new(0),
        }
    }

    pub(crate) fn failing(vector: Vec<f32>) -> Self {
        Self {
            fail: true,
            ..Self::new(vector)
        }
    }

    pub(crate) fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for CountingEmbedder {
    fn provider_name(&self) -> &str {
        "counting"
    }

    fn model_name(&self) -> &str {
        "counting-v1"
    }

    fn dimensions(&self) -> usize {
        self.vector.len()
    }

    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(AppError::unavailable("counting", "connection refused"));
        }
        Ok(texts.iter().map(|_| self.vector.clone()).collect())
    }
}

/// Delegates to a [`FlatIndex`] and records the `k` of every search.
pub(crate) struct RecordingIndex {
    inner: FlatIndex,
    requested: Mutex<Vec<usize>>,
}

impl RecordingIndex {
    pub(crate) fn new(inner: FlatIndex) -> Self {
        Self {
            inner,
            requested: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn requested(&self) -> Vec<usize> {
        self.requested.lock().unwrap().clone()
    }
}

impl VectorIndex for RecordingIndex {
    fn search(&self, query: &[f32], k: usize) -> AppResult<Vec<RetrievedChunk>> {
        self.requested.lock().unwrap().push(k);
        self.inner.search(query, k)
    }

    fn len(&self) -> usize {
        self.inner.len()
    }

    fn dimensions(&self) -> usize {
        self.inner.dimensions()
    }

    fn metric(&self) -> DistanceMetric {
        self.inner.metric()
    }
}

/// Answers with a fixed text, or never answers at all.
pub(crate) struct ScriptedLlm {
    answer: Option<String>,
    calls: AtomicU32,
    requests: Mutex<Vec<LlmRequest>>,
}

impl ScriptedLlm {
    pub(crate) fn answering(answer: &str) -> Self {
        Self {
            answer: Some(answer.to_string()),
            calls: AtomicU32::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Sleeps far longer than any test timeout.
    pub(crate) fn hanging() -> Self {
        Self {
            answer: None,
            ..Self::answering("")
        }
    }

    pub(crate) fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn requests(&self) -> Vec<LlmRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl LlmClient for ScriptedLlm {
    fn provider_name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());

        match &self.answer {
            Some(answer) => Ok(LlmResponse {
                content: answer.clone(),
                model: request.model.clone(),
                usage: LlmUsage::default(),
            }),
            None => {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Err(AppError::Llm("no answer".to_string()))
            }
        }
    }

    async fn stream(&self, _request: &LlmRequest) -> AppResult<LlmStream> {
        Err(AppError::Llm("streaming not scripted".to_string()))
    }
}
