//! HTTP request handlers

use super::sse::sse_stream;
use super::types::{ChatResponse, ErrorResponse, MessageRequest, OptionRequest};
use super::AppState;
use crate::protocol::{ChatRequest, DATA_STREAM_HEADER, DATA_STREAM_VERSION};
use crate::render::SessionView;
use crate::runtime::RuntimeError;
use crate::state_machine::{DialogOption, Event};
use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use futures::StreamExt;
use std::convert::Infallible;

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Data stream chat endpoint
        .route("/api/chat", post(chat))
        // Sessions
        .route("/api/sessions", post(create_session))
        .route("/api/sessions/:id", get(get_session))
        .route("/api/sessions/:id/stream", get(stream_session))
        // User actions
        .route("/api/sessions/:id/options", post(select_option))
        .route("/api/sessions/:id/messages", post(send_message))
        .route("/api/sessions/:id/end", post(end_chat))
        .route("/api/sessions/:id/reset", post(reset_session))
        // Version
        .route("/version", get(get_version))
        .with_state(state)
}

// ============================================================
// Chat Endpoint
// ============================================================

async fn chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Response, AppError> {
    let service = state
        .chat
        .as_ref()
        .ok_or_else(|| AppError::ServiceUnavailable("No model configured".to_string()))?;

    tracing::info!(
        model = %service.model_id(),
        messages = request.messages.len(),
        "Chat request"
    );

    let parts = service
        .stream_parts(&request)
        .map(|part| Ok::<_, Infallible>(part.encode()));

    Ok((
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8"),
            (
                header::HeaderName::from_static(DATA_STREAM_HEADER),
                DATA_STREAM_VERSION,
            ),
        ],
        Body::from_stream(parts),
    )
        .into_response())
}

// ============================================================
// Sessions
// ============================================================

async fn create_session(State(state): State<AppState>) -> Result<Json<SessionView>, AppError> {
    let handle = state.runtime.create_session().await?;
    Ok(Json(handle.view()))
}

async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SessionView>, AppError> {
    let view_rx = state.runtime.subscribe(&id).await?;
    let view = view_rx.borrow().clone();
    Ok(Json(view))
}

async fn stream_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let view_rx = state.runtime.subscribe(&id).await?;
    Ok(sse_stream(view_rx))
}

// ============================================================
// User Actions
// ============================================================

async fn select_option(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<OptionRequest>,
) -> Result<Json<ChatResponse>, AppError> {
    let option = DialogOption::from_label(&req.option)
        .ok_or_else(|| AppError::BadRequest(format!("Unknown option: {}", req.option)))?;
    queue(&state, &id, Event::SelectOption { option }).await
}

async fn send_message(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<MessageRequest>,
) -> Result<Json<ChatResponse>, AppError> {
    queue(&state, &id, Event::SubmitText { text: req.text }).await
}

async fn end_chat(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ChatResponse>, AppError> {
    queue(&state, &id, Event::EndChat { now: Utc::now() }).await
}

async fn reset_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ChatResponse>, AppError> {
    queue(&state, &id, Event::Reset { now: Utc::now() }).await
}

/// Hand the event to the session; the runtime drops anything the state rejects
async fn queue(state: &AppState, id: &str, event: Event) -> Result<Json<ChatResponse>, AppError> {
    state.runtime.send_event(id, event).await?;
    Ok(Json(ChatResponse { queued: true }))
}

async fn get_version() -> &'static str {
    concat!("dudesk ", env!("CARGO_PKG_VERSION"))
}

// ============================================================
// Error Handling
// ============================================================

#[derive(Debug)]
enum AppError {
    BadRequest(String),
    NotFound(String),
    ServiceUnavailable(String),
    Internal(String),
}

impl From<RuntimeError> for AppError {
    fn from(e: RuntimeError) -> Self {
        match e {
            RuntimeError::NotFound(id) => AppError::NotFound(format!("Session not found: {id}")),
            RuntimeError::Closed => AppError::NotFound("Session has expired".to_string()),
            other @ RuntimeError::Init(_) => AppError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::ServiceUnavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(ErrorResponse::new(message));
        (status, body).into_response()
    }
}
