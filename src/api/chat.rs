use super::error::ApiError;
use super::sessions::authenticated_session;
use super::state::ApiState;
use crate::conversation::{Turn, render};
use crate::session::SessionId;

use axum::Json;
use axum::extract::{Path, State};
use axum::response::Html;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Deserialize)]
pub(super) struct SendMessageRequest {
    message: String,
}

#[derive(Serialize)]
pub(super) struct SendMessageResponse {
    reply: String,
    turns: Vec<Turn>,
}

#[derive(Serialize)]
pub(super) struct HistoryResponse {
    turns: Vec<Turn>,
}

#[derive(Serialize)]
pub(super) struct TranscriptResponse {
    text: String,
    turn_count: usize,
}

pub(super) async fn send_message(
    State(state): State<Arc<ApiState>>,
    Path(session_id): Path<SessionId>,
    Json(request): Json<SendMessageRequest>,
) -> Result<Json<SendMessageResponse>, ApiError> {
    let session = authenticated_session(&state, &session_id).await?;
    let mut conversation = session.begin_turn().await?;
    let pipeline = state.pipeline.clone();

    // The turn runs in its own task so a disconnecting browser cannot cancel
    // it halfway; the exchange is recorded either way.
    let turn = tokio::spawn(async move {
        let result = pipeline.submit(&mut conversation, request.message).await;
        (result, conversation.all().to_vec())
    });

    let (result, turns) = turn.await.map_err(|error| {
        tracing::error!(%error, %session_id, "turn task failed");
        ApiError::internal()
    })?;

    let reply = result.map_err(|error| {
        tracing::warn!(%error, %session_id, "failed to complete turn");
        ApiError::from(error)
    })?;

    Ok(Json(SendMessageResponse { reply, turns }))
}

pub(super) async fn history(
    State(state): State<Arc<ApiState>>,
    Path(session_id): Path<SessionId>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let session = authenticated_session(&state, &session_id).await?;
    let turns = session.conversation().await.all().to_vec();
    Ok(Json(HistoryResponse { turns }))
}

pub(super) async fn transcript(
    State(state): State<Arc<ApiState>>,
    Path(session_id): Path<SessionId>,
) -> Result<Json<TranscriptResponse>, ApiError> {
    let session = authenticated_session(&state, &session_id).await?;
    let conversation = session.conversation().await;
    Ok(Json(TranscriptResponse {
        text: render(conversation.all()),
        turn_count: conversation.len(),
    }))
}

/// The copy button document, with the current transcript baked in.
pub(super) async fn clipboard_widget(
    State(state): State<Arc<ApiState>>,
    Path(session_id): Path<SessionId>,
) -> Result<Html<String>, ApiError> {
    let session = authenticated_session(&state, &session_id).await?;
    let text = render(session.conversation().await.all());
    let html = state.clipboard.render(&text).map_err(|error| {
        tracing::error!(%error, %session_id, "failed to render clipboard widget");
        ApiError::internal()
    })?;
    Ok(Html(html))
}
