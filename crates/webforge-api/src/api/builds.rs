// Build session HTTP routes
//
// POST /api/build creates a session, records `queued` and hands the session
// to the build runner. Progress is read from /ws/build/{id} (see stream.rs)
// or replayed from /api/build/{id}/events.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use utoipa::ToSchema;
use uuid::Uuid;
use webforge_core::{BuildEvent, BuildStream, SessionSnapshot};
use webforge_worker::BuildRunner;

use super::common::{ApiError, ApiResult, ErrorResponse, ListResponse};
use super::stream;

/// Request to start a build
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateBuildRequest {
    /// Natural-language description of the site to build
    #[schema(example = "build a landing page for a coffee shop")]
    pub message: String,
}

/// A build session
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BuildResponse {
    pub session: SessionSnapshot,
}

/// Event history of a build session, oldest first
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BuildEventsResponse {
    pub session_id: Uuid,
    #[schema(value_type = Vec<Object>)]
    pub events: Vec<BuildEvent>,
}

/// App state for build routes
#[derive(Clone)]
pub struct AppState {
    pub stream: Arc<BuildStream>,
    pub runner: Arc<dyn BuildRunner>,
    /// Close a build WebSocket after this long without an event
    pub idle_timeout: Duration,
}

impl AppState {
    pub fn new(stream: Arc<BuildStream>, runner: Arc<dyn BuildRunner>, idle_timeout: Duration) -> Self {
        Self {
            stream,
            runner,
            idle_timeout,
        }
    }
}

/// Create build routes
pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/api/build", get(list_builds).post(create_build))
        .route("/api/build/:id", get(get_build).delete(delete_build))
        .route("/api/build/:id/events", get(list_build_events))
        .route("/ws/build/:id", get(stream::build_socket))
        .with_state(state)
}

/// Create a session, record `queued` and start the build workflow
pub async fn start_build_session(
    stream: &BuildStream,
    runner: &dyn BuildRunner,
    prompt: &str,
) -> ApiResult<SessionSnapshot> {
    let prompt = prompt.trim();
    if prompt.is_empty() {
        return Err(ApiError::bad_request("Prompt must not be empty."));
    }

    let session = stream.create_session(prompt);
    stream.publish(
        session.id(),
        BuildEvent::status("queued", "Build session created").with_field("prompt", prompt),
    );
    let snapshot = session.snapshot();

    runner.start_build(session.id()).await.map_err(|e| {
        tracing::error!(session_id = %session.id(), error = %e, "Failed to start build");
        stream.drop_session(session.id());
        ApiError::internal()
    })?;

    Ok(snapshot)
}

/// Session ids that do not parse are treated like unknown ones
pub(crate) fn parse_session_id(raw: &str) -> Option<Uuid> {
    Uuid::parse_str(raw).ok()
}

fn session_not_found(raw: &str) -> ApiError {
    ApiError::not_found(format!("Build session '{raw}' not found."))
}

/// POST /api/build - Start a build
#[utoipa::path(
    post,
    path = "/api/build",
    request_body = CreateBuildRequest,
    responses(
        (status = 201, description = "Build session created", body = BuildResponse),
        (status = 400, description = "Empty prompt", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "builds"
)]
pub async fn create_build(
    State(state): State<AppState>,
    Json(req): Json<CreateBuildRequest>,
) -> ApiResult<(StatusCode, Json<BuildResponse>)> {
    let session = start_build_session(&state.stream, state.runner.as_ref(), &req.message).await?;
    tracing::info!(session_id = %session.id, "Build session started");
    Ok((StatusCode::CREATED, Json(BuildResponse { session })))
}

/// GET /api/build - List build sessions
#[utoipa::path(
    get,
    path = "/api/build",
    responses(
        (status = 200, description = "Build sessions, oldest first", body = ListResponse<SessionSnapshot>)
    ),
    tag = "builds"
)]
pub async fn list_builds(State(state): State<AppState>) -> Json<ListResponse<SessionSnapshot>> {
    Json(ListResponse::new(state.stream.list_sessions()))
}

/// GET /api/build/{id} - Get a build session
#[utoipa::path(
    get,
    path = "/api/build/{id}",
    params(("id" = String, Path, description = "Build session ID")),
    responses(
        (status = 200, description = "Build session", body = BuildResponse),
        (status = 404, description = "Build session not found", body = ErrorResponse)
    ),
    tag = "builds"
)]
pub async fn get_build(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<BuildResponse>> {
    let session = parse_session_id(&id)
        .and_then(|uuid| state.stream.get_session(uuid))
        .ok_or_else(|| session_not_found(&id))?;
    Ok(Json(BuildResponse {
        session: session.snapshot(),
    }))
}

/// GET /api/build/{id}/events - Replay a build session's events
#[utoipa::path(
    get,
    path = "/api/build/{id}/events",
    params(("id" = String, Path, description = "Build session ID")),
    responses(
        (status = 200, description = "Event history", body = BuildEventsResponse),
        (status = 404, description = "Build session not found", body = ErrorResponse)
    ),
    tag = "builds"
)]
pub async fn list_build_events(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<BuildEventsResponse>> {
    let session = parse_session_id(&id)
        .and_then(|uuid| state.stream.get_session(uuid))
        .ok_or_else(|| session_not_found(&id))?;
    Ok(Json(BuildEventsResponse {
        session_id: session.id(),
        events: session.history(),
    }))
}

/// DELETE /api/build/{id} - Cancel and forget a build session
#[utoipa::path(
    delete,
    path = "/api/build/{id}",
    params(("id" = String, Path, description = "Build session ID")),
    responses(
        (status = 204, description = "Build session removed (or never existed)")
    ),
    tag = "builds"
)]
pub async fn delete_build(State(state): State<AppState>, Path(id): Path<String>) -> StatusCode {
    let Some(session_id) = parse_session_id(&id) else {
        return StatusCode::NO_CONTENT;
    };

    match state.runner.cancel_build(session_id).await {
        Ok(true) => tracing::info!(session_id = %session_id, "Build cancelled"),
        Ok(false) => {}
        Err(e) => tracing::warn!(session_id = %session_id, error = %e, "Failed to cancel build"),
    }
    if state.stream.drop_session(session_id) {
        tracing::info!(session_id = %session_id, "Build session removed");
    }
    StatusCode::NO_CONTENT
}
