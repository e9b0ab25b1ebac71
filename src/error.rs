//! Top-level error types for selfdx.

use std::sync::Arc;

/// Crate-wide result type alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error enum wrapping domain-specific errors.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error(transparent)]
    Conversation(#[from] ConversationError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("template error: {0}")]
    Template(#[from] minijinja::Error),
}

/// Configuration loading errors. All of these are fatal at startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to load config from {path}: {source}")]
    Load {
        path: String,
        source: Arc<std::io::Error>,
    },

    #[error("failed to parse config from {path}: {message}")]
    Parse { path: String, message: String },

    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error("missing required config key: {0}")]
    MissingKey(String),

    #[error("unknown persona preset: {0}")]
    UnknownPersona(String),

    #[error("unknown model preset: {0}")]
    UnknownModelPreset(String),
}

/// Credential gate errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// Submitted password does not match. Deliberately carries no detail.
    #[error("Password incorrect")]
    IncorrectPassword,

    #[error("session is not authenticated")]
    NotAuthenticated,
}

/// Completion service errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LlmError {
    #[error("invalid completion request: {0}")]
    InvalidRequest(String),

    #[error("network error talking to completion service: {0}")]
    Network(String),

    #[error("completion service rejected credentials ({status})")]
    Auth { status: u16 },

    #[error("completion service rate limit reached: {0}")]
    RateLimited(String),

    #[error("completion service error ({status}): {message}")]
    Provider { status: u16, message: String },

    #[error("malformed response from completion service: {0}")]
    MalformedResponse(String),

    #[error("empty response from completion service")]
    EmptyResponse,
}

impl LlmError {
    /// Whether a later attempt with the same request could succeed.
    pub fn is_retriable(&self) -> bool {
        match self {
            LlmError::Network(_) | LlmError::RateLimited(_) | LlmError::EmptyResponse => true,
            LlmError::Provider { status, .. } => matches!(status, 500 | 502 | 503 | 504),
            LlmError::InvalidRequest(_) | LlmError::Auth { .. } | LlmError::MalformedResponse(_) => {
                false
            }
        }
    }
}

/// Conversation store errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConversationError {
    #[error("conversation is full ({capacity} turns)")]
    CapacityReached { capacity: usize },
}

/// Session lookup and scheduling errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("session {id} not found")]
    NotFound { id: String },

    #[error("session {id} is already generating a reply")]
    Busy { id: String },
}
