//! Structured chat requests and the builder that assembles them.

use crate::conversation::{Role, Turn};
use crate::error::LlmError;
use crate::persona::SystemPersona;

use serde::Serialize;

/// Sampling temperatures accepted by the completion service.
pub const TEMPERATURE_RANGE: std::ops::RangeInclusive<f32> = 0.0..=2.0;

/// Role tag on a request message. `System` only ever carries the persona.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

impl From<Role> for MessageRole {
    fn from(role: Role) -> Self {
        match role {
            Role::User => MessageRole::User,
            Role::Assistant => MessageRole::Assistant,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

impl From<&Turn> for ChatMessage {
    fn from(turn: &Turn) -> Self {
        Self::new(turn.role().into(), turn.text())
    }
}

/// Which backend model to use and how to sample from it.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelConfig {
    pub model: String,
    pub temperature: f32,
}

/// A fully assembled request: persona, prior turns, new user message.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
}

impl ChatRequest {
    pub fn builder() -> ChatRequestBuilder {
        ChatRequestBuilder::default()
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn temperature(&self) -> f32 {
        self.temperature
    }

    /// `[system, ...history, user]` in that order.
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }
}

/// Collects request parts and validates them in [`build`](Self::build), so a
/// malformed request fails here instead of at the remote service.
#[derive(Debug, Default)]
pub struct ChatRequestBuilder {
    persona: Option<String>,
    history: Vec<ChatMessage>,
    user_message: Option<String>,
    model: Option<String>,
    temperature: Option<f32>,
}

impl ChatRequestBuilder {
    pub fn persona(mut self, persona: &SystemPersona) -> Self {
        self.persona = Some(persona.text().to_owned());
        self
    }

    pub fn history<'a>(mut self, turns: impl IntoIterator<Item = &'a Turn>) -> Self {
        self.history = turns.into_iter().map(ChatMessage::from).collect();
        self
    }

    /// The newest user message, passed through verbatim.
    pub fn user_message(mut self, message: impl Into<String>) -> Self {
        self.user_message = Some(message.into());
        self
    }

    pub fn model_config(mut self, config: &ModelConfig) -> Self {
        self.model = Some(config.model.clone());
        self.temperature = Some(config.temperature);
        self
    }

    pub fn build(self) -> Result<ChatRequest, LlmError> {
        let persona = self
            .persona
            .filter(|text| !text.trim().is_empty())
            .ok_or_else(|| LlmError::InvalidRequest("persona text is required".into()))?;
        let user_message = self
            .user_message
            .ok_or_else(|| LlmError::InvalidRequest("user message is required".into()))?;
        let model = self
            .model
            .filter(|model| !model.trim().is_empty())
            .ok_or_else(|| LlmError::InvalidRequest("model identifier is required".into()))?;
        let temperature = self
            .temperature
            .ok_or_else(|| LlmError::InvalidRequest("temperature is required".into()))?;
        if !TEMPERATURE_RANGE.contains(&temperature) {
            return Err(LlmError::InvalidRequest(format!(
                "temperature {temperature} is outside 0..=2"
            )));
        }

        let mut messages = Vec::with_capacity(self.history.len() + 2);
        messages.push(ChatMessage::new(MessageRole::System, persona));
        messages.extend(self.history);
        messages.push(ChatMessage::new(MessageRole::User, user_message));

        Ok(ChatRequest {
            model,
            messages,
            temperature,
        })
    }
}

/// Assemble the request for one turn.
pub fn build(
    persona: &SystemPersona,
    history: &[Turn],
    new_message: &str,
    model: &ModelConfig,
) -> Result<ChatRequest, LlmError> {
    ChatRequest::builder()
        .persona(persona)
        .history(history)
        .user_message(new_message)
        .model_config(model)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model() -> ModelConfig {
        ModelConfig {
            model: "o4-mini".into(),
            temperature: 1.0,
        }
    }

    #[test]
    fn output_is_persona_then_history_then_message() {
        let persona = SystemPersona::default();
        let history = vec![
            Turn::user("I have a headache"),
            Turn::assistant("How long has it lasted?"),
        ];

        let request = build(&persona, &history, "Two days", &model()).unwrap();
        let messages = request.messages();

        assert_eq!(messages.len(), history.len() + 2);
        assert_eq!(messages[0].role, MessageRole::System);
        assert_eq!(messages[0].content, persona.text());
        assert_eq!(messages[1], ChatMessage::new(MessageRole::User, "I have a headache"));
        assert_eq!(
            messages[2],
            ChatMessage::new(MessageRole::Assistant, "How long has it lasted?")
        );
        assert_eq!(messages[3], ChatMessage::new(MessageRole::User, "Two days"));
        assert_eq!(request.model(), "o4-mini");
        assert_eq!(request.temperature(), 1.0);
    }

    #[test]
    fn empty_history_yields_two_messages() {
        let request = build(&SystemPersona::default(), &[], "hello", &model()).unwrap();
        assert_eq!(request.messages().len(), 2);
    }

    #[test]
    fn user_message_is_passed_through_verbatim() {
        let raw = "  <b>odd</b>\n\t{{query}}  ";
        let request = build(&SystemPersona::default(), &[], raw, &model()).unwrap();
        assert_eq!(request.messages()[1].content, raw);
    }

    #[test]
    fn missing_fields_fail_fast() {
        let missing_persona = ChatRequest::builder()
            .user_message("hi")
            .model_config(&model())
            .build();
        assert!(matches!(missing_persona, Err(LlmError::InvalidRequest(_))));

        let missing_message = ChatRequest::builder()
            .persona(&SystemPersona::default())
            .model_config(&model())
            .build();
        assert!(matches!(missing_message, Err(LlmError::InvalidRequest(_))));

        let missing_model = ChatRequest::builder()
            .persona(&SystemPersona::default())
            .user_message("hi")
            .build();
        assert!(matches!(missing_model, Err(LlmError::InvalidRequest(_))));
    }

    #[test]
    fn out_of_range_temperature_is_rejected() {
        let hot = ModelConfig {
            model: "o4-mini".into(),
            temperature: 2.5,
        };
        let result = build(&SystemPersona::default(), &[], "hi", &hot);
        assert!(matches!(result, Err(LlmError::InvalidRequest(_))));
    }

    #[test]
    fn serializes_in_chat_completions_shape() {
        let request = build(&SystemPersona::default(), &[], "hi", &model()).unwrap();
        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(body["model"], "o4-mini");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["role"], "user");
        assert_eq!(body["messages"][1]["content"], "hi");
        assert_eq!(body["temperature"], 1.0);
    }
}
