//! Conversation history and transcript export.

pub mod store;
pub mod transcript;

pub use store::{ConversationStore, Role, Turn};
pub use transcript::{ClipboardWidget, render, script_literal};
