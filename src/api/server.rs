//! HTTP server setup: router, static file serving, and API routes.

use super::chat::{clipboard_widget, history, send_message, transcript};
use super::sessions::{create_session, end_session, login};
use super::state::ApiState;
use crate::conversation::transcript::ClipboardOptions;

use axum::Router;
use axum::extract::State;
use axum::http::{StatusCode, Uri, header};
use axum::response::{Html, IntoResponse, Json, Response};
use axum::routing::{delete, get, post};
use rust_embed::Embed;
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};

use std::net::SocketAddr;
use std::sync::Arc;

/// Embedded single-page chat UI.
#[derive(Embed)]
#[folder = "interface/"]
struct InterfaceAssets;

// -- Response types --

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    uptime_seconds: u64,
    active_sessions: u64,
}

#[derive(Serialize)]
struct InterfaceResponse {
    title: String,
    reminder: String,
    persona: String,
    model: String,
    clipboard: ClipboardOptions,
}

/// Build the application router. Exposed so tests can serve it on an
/// ephemeral port.
pub fn router(state: Arc<ApiState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        .route("/health", get(health))
        .route("/interface", get(interface))
        .route("/sessions", post(create_session))
        .route("/sessions/{session_id}", delete(end_session))
        .route("/sessions/{session_id}/login", post(login))
        .route(
            "/sessions/{session_id}/messages",
            get(history).post(send_message),
        )
        .route("/sessions/{session_id}/transcript", get(transcript))
        .route("/sessions/{session_id}/clipboard", get(clipboard_widget));

    Router::new()
        .nest("/api", api_routes)
        .fallback(static_handler)
        .layer(cors)
        .with_state(state)
}

/// Start the HTTP server on the given address.
pub async fn start_http_server(
    bind: SocketAddr,
    state: Arc<ApiState>,
    shutdown_rx: tokio::sync::watch::Receiver<bool>,
) -> anyhow::Result<tokio::task::JoinHandle<()>> {
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(bind).await?;
    tracing::info!(%bind, "HTTP server listening");

    let handle = tokio::spawn(async move {
        let mut shutdown = shutdown_rx;
        if let Err(error) = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.wait_for(|v| *v).await;
            })
            .await
        {
            tracing::error!(%error, "HTTP server exited with error");
        }
    });

    Ok(handle)
}

// -- API handlers --

async fn health(State(state): State<Arc<ApiState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        uptime_seconds: state.started_at.elapsed().as_secs(),
        active_sessions: state.sessions.len(),
    })
}

/// Page text and labels the UI renders before and after the gate.
async fn interface(State(state): State<Arc<ApiState>>) -> Json<InterfaceResponse> {
    Json(InterfaceResponse {
        title: state.interface.title.clone(),
        reminder: state.interface.reminder.clone(),
        persona: state.pipeline.persona().source().to_string(),
        model: state.pipeline.model().model.clone(),
        clipboard: state.clipboard.options().clone(),
    })
}

// -- Static file serving --

async fn static_handler(uri: Uri) -> Response {
    let path = uri.path().trim_start_matches('/');

    if !path.is_empty()
        && let Some(content) = InterfaceAssets::get(path)
    {
        let mime = mime_guess::from_path(path).first_or_octet_stream();
        return (
            StatusCode::OK,
            [(header::CONTENT_TYPE, mime.as_ref())],
            content.data,
        )
            .into_response();
    }

    // SPA fallback
    if let Some(content) = InterfaceAssets::get("index.html") {
        return Html(String::from_utf8_lossy(&content.data).into_owned()).into_response();
    }

    (StatusCode::NOT_FOUND, "not found").into_response()
}
