// Health endpoint

use axum::{extract::State, routing::get, Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use webforge_worker::BuildRunner;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub projects_dir: String,
    pub models_dir: String,
    /// Project generator in use (e.g. "scaffold", "openai+scaffold")
    pub generator: String,
    pub active_builds: usize,
}

/// State for health endpoint
#[derive(Clone)]
pub struct AppState {
    pub projects_dir: String,
    pub models_dir: String,
    pub generator: String,
    pub runner: Arc<dyn BuildRunner>,
}

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .with_state(state)
}

/// GET /health - Liveness and configuration summary
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is up", body = HealthResponse)),
    tag = "health"
)]
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        projects_dir: state.projects_dir.clone(),
        models_dir: state.models_dir.clone(),
        generator: state.generator.clone(),
        active_builds: state.runner.active_count().await,
    })
}
