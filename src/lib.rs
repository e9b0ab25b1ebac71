//! selfdx: a password-gated chat page that relays a patient's questions to a
//! hosted language model under a fixed doctor persona, and hands the
//! transcript to the clipboard for an external survey.

pub mod api;
pub mod auth;
pub mod chat;
pub mod config;
pub mod conversation;
pub mod error;
pub mod llm;
pub mod persona;
pub mod session;

pub use error::{Error, Result};
