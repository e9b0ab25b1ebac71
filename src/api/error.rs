//! Mapping from domain errors to HTTP responses.

use crate::error::{AuthError, ConversationError, Error, LlmError, SessionError};

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

/// A status code plus a message safe to show to the visitor.
#[derive(Debug)]
pub(super) struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub(super) fn internal() -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: "internal error".into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorBody { error: self.message })).into_response()
    }
}

impl From<AuthError> for ApiError {
    fn from(error: AuthError) -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            message: error.to_string(),
        }
    }
}

impl From<SessionError> for ApiError {
    fn from(error: SessionError) -> Self {
        let status = match error {
            SessionError::NotFound { .. } => StatusCode::NOT_FOUND,
            SessionError::Busy { .. } => StatusCode::CONFLICT,
        };
        Self {
            status,
            message: error.to_string(),
        }
    }
}

impl From<ConversationError> for ApiError {
    fn from(error: ConversationError) -> Self {
        Self {
            status: StatusCode::CONFLICT,
            message: error.to_string(),
        }
    }
}

impl From<LlmError> for ApiError {
    fn from(error: LlmError) -> Self {
        match error {
            LlmError::InvalidRequest(_) => {
                tracing::error!(%error, "completion request could not be assembled");
                Self::internal()
            }
            other => Self {
                status: StatusCode::BAD_GATEWAY,
                message: other.to_string(),
            },
        }
    }
}

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        match error {
            Error::Auth(error) => error.into(),
            Error::Session(error) => error.into(),
            Error::Conversation(error) => error.into(),
            Error::Llm(error) => error.into(),
            other => {
                tracing::error!(error = %other, "unexpected error in request handler");
                Self::internal()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_errors_map_to_statuses() {
        let cases: Vec<(ApiError, StatusCode)> = vec![
            (AuthError::IncorrectPassword.into(), StatusCode::UNAUTHORIZED),
            (AuthError::NotAuthenticated.into(), StatusCode::UNAUTHORIZED),
            (
                SessionError::NotFound { id: "x".into() }.into(),
                StatusCode::NOT_FOUND,
            ),
            (SessionError::Busy { id: "x".into() }.into(), StatusCode::CONFLICT),
            (
                ConversationError::CapacityReached { capacity: 2 }.into(),
                StatusCode::CONFLICT,
            ),
            (LlmError::Auth { status: 401 }.into(), StatusCode::BAD_GATEWAY),
            (
                LlmError::InvalidRequest("no persona".into()).into(),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                Error::Llm(LlmError::EmptyResponse).into(),
                StatusCode::BAD_GATEWAY,
            ),
            (
                Error::Template(minijinja::Error::new(
                    minijinja::ErrorKind::TemplateNotFound,
                    "clipboard.html",
                ))
                .into(),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (error, expected) in cases {
            assert_eq!(error.status, expected, "{error:?}");
        }
    }

    #[test]
    fn incorrect_password_message_is_generic() {
        let error: ApiError = AuthError::IncorrectPassword.into();
        assert_eq!(error.message, "Password incorrect");
    }
}
