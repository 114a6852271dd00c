//! Typing-effect rendering of a finished answer.

use std::io::Write;
use std::time::Duration;
use unicode_segmentation::UnicodeSegmentation;

/// Split `text` into consecutive fragments of `graphemes_per_fragment`
/// grapheme clusters (at least one). Concatenating the fragments gives back
/// `text` exactly.
pub fn typing_fragments(text: &str, graphemes_per_fragment: usize) -> Vec<&str> {
    let per_fragment = graphemes_per_fragment.max(1);

    let mut fragments = Vec::new();
    let mut start = 0;
    let mut count = 0;

    for (offset, grapheme) in text.grapheme_indices(true) {
        count += 1;
        if count == per_fragment {
            let end = offset + grapheme.len();
            fragments.push(&text[start..end]);
            start = end;
            count = 0;
        }
    }

    if start < text.len() {
        fragments.push(&text[start..]);
    }

    fragments
}

/// Writes answers to a terminal, optionally with a typing effect.
#[derive(Debug, Clone, Copy)]
pub struct TypingDisplay {
    pub enabled: bool,
    pub delay: Duration,
    pub graphemes_per_fragment: usize,
}

impl Default for TypingDisplay {
    fn default() -> Self {
        Self {
            enabled: true,
            delay: Duration::from_millis(20),
            graphemes_per_fragment: 1,
        }
    }
}

impl TypingDisplay {
    pub fn from_config(config: &lexchat_core::config::DisplayConfig) -> Self {
        Self {
            enabled: config.typing,
            delay: Duration::from_millis(config.typing_delay_ms),
            graphemes_per_fragment: config.graphemes_per_fragment,
        }
    }

    /// Write `text` followed by a newline.
    pub async fn render<W: Write>(&self, out: &mut W, text: &str) -> std::io::Result<()> {
        if !self.enabled || self.delay.is_zero() {
            writeln!(out, "{}", text)?;
            return out.flush();
        }

        for fragment in typing_fragments(text, self.graphemes_per_fragment) {
            out.write_all(fragment.as_bytes())?;
            out.flush()?;
            tokio::time::sleep(self.delay).await;
        }
        writeln!(out)?;
        out.flush()
    }
}
