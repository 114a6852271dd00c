//! Chat-completion provider implementations.

pub mod gemini;
pub mod ollama;

pub use gemini::GeminiClient;
pub use ollama::OllamaClient;

use crate::client::{LlmStream, LlmStreamChunk};
use futures::{Stream, StreamExt};
use lexchat_core::{AppError, AppResult};

/// Splits a byte stream into complete, non-empty lines.
///
/// Bytes are buffered until a newline arrives, so multi-byte characters and
/// JSON documents split across network reads are reassembled intact.
#[derive(Debug, Default)]
pub(crate) struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    /// Append bytes and return every line completed by them.
    pub(crate) fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(bytes);

        let mut lines = Vec::new();
        while let Some(pos) = self.pending.iter().position(|b| *b == b'\n') {
            let raw: Vec<u8> = self.pending.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&raw).trim().to_string();
            if !line.is_empty() {
                lines.push(line);
            }
        }
        lines
    }

    /// Whatever is left once the stream has ended.
    pub(crate) fn finish(&mut self) -> Option<String> {
        let rest = String::from_utf8_lossy(&self.pending).trim().to_string();
        self.pending.clear();
        (!rest.is_empty()).then_some(rest)
    }
}

/// Turn an HTTP body stream into an [`LlmStream`] by parsing it line by line.
///
/// `parse` returns `None` for lines that carry no fragment (keep-alives,
/// SSE comments).
pub(crate) fn line_stream<S, B, F>(body: S, mut parse: F) -> LlmStream
where
    S: Stream<Item = Result<B, reqwest::Error>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    F: FnMut(&str) -> Option<AppResult<LlmStreamChunk>> + Send + 'static,
{
    let mut buffer = LineBuffer::default();

    let body = body
        .map(Some)
        .chain(futures::stream::once(async { None }));

    let stream = body.flat_map(move |item| {
        let lines = match item {
            Some(Ok(bytes)) => buffer.push(bytes.as_ref()),
            Some(Err(e)) => {
                return futures::stream::iter(vec![Err(AppError::unavailable(
                    "LLM stream",
                    e.to_string(),
                ))]);
            }
            None => buffer.finish().into_iter().collect(),
        };

        let chunks: Vec<AppResult<LlmStreamChunk>> =
            lines.iter().filter_map(|line| parse(line)).collect();
        futures::stream::iter(chunks)
    });

    Box::pin(stream)
}
