//! Conversational front end for LexChat.
//!
//! - [`CannedReplyTable`]: small-talk replies that skip retrieval
//! - [`ResponseRouter`]: canned reply or retrieval-augmented answer
//! - [`ChatSession`]: a transcript that only records successful turns
//! - [`TypingDisplay`]: incremental rendering of a finished answer
//! - [`build_router`]: the whole pipeline from an [`AppConfig`](lexchat_core::AppConfig)

pub mod bootstrap;
pub mod canned;
pub mod display;
pub mod router;
pub mod session;

#[cfg(test)]
mod testing;

pub use bootstrap::build_router;
pub use canned::CannedReplyTable;
pub use display::{typing_fragments, TypingDisplay};
pub use router::ResponseRouter;
pub use session::{ChatSession, Transcript};
