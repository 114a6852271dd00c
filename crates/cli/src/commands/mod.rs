//! Command handlers for the LexChat CLI.

pub mod ask;
pub mod chat;
pub mod index;

pub use ask::AskCommand;
pub use chat::ChatCommand;
pub use index::IndexCommand;
