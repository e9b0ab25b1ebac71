//! HTTP API server for the chat UI.
//!
//! Serves the embedded single-page interface and a JSON API for creating
//! sessions, passing the password gate, sending messages, and exporting the
//! transcript.

mod chat;
mod error;
mod server;
mod sessions;
mod state;

pub use server::{router, start_http_server};
pub use state::ApiState;
