//! Completion service boundary: request assembly, clients, retries.

pub mod openai;
pub mod request;
pub mod routing;
pub mod traits;

pub use openai::OpenAiClient;
pub use request::{ChatMessage, ChatRequest, MessageRole, ModelConfig};
pub use routing::RetryPolicy;
pub use traits::{CompletionClient, CompletionClientDyn};
