//! The per-submission turn pipeline: assemble, call, append.

use crate::conversation::{ConversationStore, Turn};
use crate::error::{ConversationError, Result};
use crate::llm::request::{self, ModelConfig};
use crate::llm::traits::CompletionClientDyn;
use crate::persona::SystemPersona;

use std::sync::Arc;

/// Everything needed to turn a user message into a recorded exchange.
#[derive(Clone)]
pub struct TurnPipeline {
    persona: SystemPersona,
    model: ModelConfig,
    client: Arc<dyn CompletionClientDyn>,
}

impl TurnPipeline {
    pub fn new(
        persona: SystemPersona,
        model: ModelConfig,
        client: Arc<dyn CompletionClientDyn>,
    ) -> Self {
        Self {
            persona,
            model,
            client,
        }
    }

    pub fn persona(&self) -> &SystemPersona {
        &self.persona
    }

    pub fn model(&self) -> &ModelConfig {
        &self.model
    }

    /// Run one submission against `conversation` and return the reply.
    ///
    /// On success the user turn and then the assistant turn are appended.
    /// When the completion call fails only the user turn is kept and the
    /// error is returned. When the conversation has no room for a full
    /// exchange nothing is appended and the service is not called.
    pub async fn submit(
        &self,
        conversation: &mut ConversationStore,
        message: String,
    ) -> Result<String> {
        if conversation.remaining().is_some_and(|remaining| remaining < 2) {
            return Err(ConversationError::CapacityReached {
                capacity: conversation.capacity().unwrap_or_default(),
            }
            .into());
        }

        let request = request::build(&self.persona, conversation.all(), &message, &self.model)?;
        let message_len = message.len();
        conversation.append(Turn::user(message))?;

        match self.client.complete(&request).await {
            Ok(reply) => {
                conversation.append(Turn::assistant(reply.clone()))?;
                tracing::info!(
                    client = self.client.name(),
                    model = %self.model.model,
                    message_len,
                    reply_len = reply.len(),
                    turns = conversation.len(),
                    "turn completed"
                );
                Ok(reply)
            }
            Err(error) => {
                tracing::warn!(
                    client = self.client.name(),
                    model = %self.model.model,
                    %error,
                    turns = conversation.len(),
                    "completion failed, user turn kept"
                );
                Err(error.into())
            }
        }
    }
}
