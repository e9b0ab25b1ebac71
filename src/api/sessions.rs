//! Session lifecycle and the password gate.

use super::error::ApiError;
use super::state::ApiState;
use crate::session::{Session, SessionId};

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Serialize)]
pub(super) struct SessionResponse {
    session_id: SessionId,
    authenticated: bool,
}

#[derive(Deserialize)]
pub(super) struct LoginRequest {
    password: String,
}

pub(super) async fn create_session(
    State(state): State<Arc<ApiState>>,
) -> (StatusCode, Json<SessionResponse>) {
    let session = state.sessions.create().await;
    (
        StatusCode::CREATED,
        Json(SessionResponse {
            session_id: session.id(),
            authenticated: false,
        }),
    )
}

pub(super) async fn end_session(
    State(state): State<Arc<ApiState>>,
    Path(session_id): Path<SessionId>,
) -> Result<StatusCode, ApiError> {
    state.sessions.discard(&session_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Check the shared password. Failed attempts may be retried without limit.
pub(super) async fn login(
    State(state): State<Arc<ApiState>>,
    Path(session_id): Path<SessionId>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<SessionResponse>, ApiError> {
    let session = state.sessions.get(&session_id).await?;

    if !session.is_authenticated() {
        state.gate.check(request.password)?;
        session.mark_authenticated();
        tracing::info!(%session_id, "session authenticated");
    }

    Ok(Json(SessionResponse {
        session_id,
        authenticated: true,
    }))
}

/// Look up a session and require that it has passed the gate.
pub(super) async fn authenticated_session(
    state: &ApiState,
    session_id: &SessionId,
) -> Result<Arc<Session>, ApiError> {
    let session = state.sessions.get(session_id).await?;
    if !session.is_authenticated() {
        return Err(crate::error::AuthError::NotAuthenticated.into());
    }
    Ok(session)
}
