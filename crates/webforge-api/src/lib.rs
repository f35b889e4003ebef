// WebForge API Library
// Decision: Shared library for binaries (API server, OpenAPI export) and router tests

pub mod api;
pub mod config;
pub mod openapi;

use axum::http::{header, Method};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;
use webforge_core::{BuildStream, TextGenerator};
use webforge_storage::{ChatStore, ModelStore, ProjectStore};
use webforge_worker::BuildRunner;

pub use config::ApiConfig;
pub use openapi::ApiDoc;

/// Everything the routes need, constructed once at startup
#[derive(Clone)]
pub struct Services {
    pub stream: Arc<BuildStream>,
    pub runner: Arc<dyn BuildRunner>,
    pub projects: ProjectStore,
    pub models: ModelStore,
    pub chat: ChatStore,
    pub text: Arc<dyn TextGenerator>,
    /// Name of the project generator, reported by /health
    pub generator: String,
}

/// Build the full application router
pub fn app(services: Services, config: &ApiConfig) -> Router {
    let builds_state = api::builds::AppState::new(
        services.stream.clone(),
        services.runner.clone(),
        config.stream_idle_timeout,
    );
    let projects_state = api::projects::AppState::new(services.projects.clone());
    let models_state = api::models::AppState::new(services.models.clone(), config.max_upload_bytes);
    let chat_state = api::chat::AppState {
        chat: services.chat.clone(),
        text: services.text.clone(),
        stream: services.stream.clone(),
        runner: services.runner.clone(),
    };
    let health_state = api::health::AppState {
        projects_dir: services.projects.base_dir().display().to_string(),
        models_dir: services.models.base_dir().display().to_string(),
        generator: services.generator.clone(),
        runner: services.runner.clone(),
    };

    let app = Router::new()
        .merge(api::health::routes(health_state))
        .merge(api::builds::routes(builds_state))
        .merge(api::projects::routes(projects_state))
        .merge(api::models::routes(models_state))
        .merge(api::chat::routes(chat_state))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-doc/openapi.json", ApiDoc::openapi()));

    // Add CORS layer only if origins are configured
    let app = if config.cors_allowed_origins.is_empty() {
        tracing::info!("CORS not configured (same-origin requests only)");
        app
    } else {
        tracing::info!(origins = ?config.cors_allowed_origins, "CORS origins configured");
        app.layer(
            CorsLayer::new()
                .allow_origin(AllowOrigin::list(config.cors_allowed_origins.clone()))
                .allow_methods([
                    Method::GET,
                    Method::POST,
                    Method::PATCH,
                    Method::DELETE,
                    Method::OPTIONS,
                ])
                .allow_headers([
                    header::CONTENT_TYPE,
                    header::ACCEPT,
                    header::ORIGIN,
                    header::CACHE_CONTROL,
                ]),
        )
    };

    app.layer(TraceLayer::new_for_http())
}
