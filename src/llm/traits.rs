//! Completion client trait and dynamic dispatch companion.

use super::request::ChatRequest;
use crate::error::LlmError;

use std::future::Future;
use std::pin::Pin;

/// Static trait for completion backends.
/// Use this for type-safe implementations.
pub trait CompletionClient: Send + Sync + 'static {
    /// Short name for logs.
    fn name(&self) -> &str;

    /// Send one request and return the assistant's reply text.
    fn complete(
        &self,
        request: &ChatRequest,
    ) -> impl Future<Output = Result<String, LlmError>> + Send;
}

/// Dynamic trait for runtime polymorphism.
/// Use this when you need `Arc<dyn CompletionClientDyn>` in shared state.
pub trait CompletionClientDyn: Send + Sync + 'static {
    fn name(&self) -> &str;

    fn complete<'a>(
        &'a self,
        request: &'a ChatRequest,
    ) -> Pin<Box<dyn Future<Output = Result<String, LlmError>> + Send + 'a>>;
}

/// Blanket implementation: any type implementing CompletionClient automatically implements CompletionClientDyn.
impl<T: CompletionClient> CompletionClientDyn for T {
    fn name(&self) -> &str {
        CompletionClient::name(self)
    }

    fn complete<'a>(
        &'a self,
        request: &'a ChatRequest,
    ) -> Pin<Box<dyn Future<Output = Result<String, LlmError>> + Send + 'a>> {
        Box::pin(CompletionClient::complete(self, request))
    }
}
