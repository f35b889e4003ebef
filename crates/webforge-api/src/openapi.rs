// OpenAPI specification
//
// Served by the API (Swagger UI) and printed by the export-openapi binary.

use utoipa::OpenApi;
use webforge_core::SessionSnapshot;
use webforge_storage::{
    ChatMessageRow, ChatSessionRow, GrepMatch, ManifestUpdate, ModelComparison, ModelMetadata,
    ProjectManifest, ProjectSummary,
};

use crate::api::{self, ErrorResponse, ListResponse};

/// OpenAPI documentation for the WebForge API
#[derive(OpenApi)]
#[openapi(
    paths(
        api::health::health,
        api::builds::create_build,
        api::builds::list_builds,
        api::builds::get_build,
        api::builds::list_build_events,
        api::builds::delete_build,
        api::projects::list_projects,
        api::projects::create_project,
        api::projects::delete_project,
        api::projects::list_files,
        api::projects::read_file,
        api::projects::save_file,
        api::projects::get_manifest,
        api::projects::update_manifest,
        api::projects::get_tree,
        api::projects::grep_project,
        api::projects::download_project,
        api::projects::run_project,
        api::models::upload_model,
        api::models::list_models,
        api::models::select_model,
        api::models::delete_model,
        api::models::compare_models,
        api::models::optimize_model,
        api::chat::send_message,
        api::chat::list_sessions,
        api::chat::list_messages,
    ),
    components(
        schemas(
            ErrorResponse,
            SessionSnapshot,
            ListResponse<SessionSnapshot>,
            api::builds::CreateBuildRequest,
            api::builds::BuildResponse,
            api::builds::BuildEventsResponse,
            ProjectManifest, ProjectSummary, ManifestUpdate, GrepMatch,
            ListResponse<ProjectSummary>,
            ListResponse<GrepMatch>,
            api::projects::CreateProjectRequest,
            api::projects::SaveFileRequest,
            api::projects::SaveFileResponse,
            api::projects::FileContentResponse,
            ModelMetadata, ModelComparison,
            api::models::ModelListResponse,
            api::models::SelectModelResponse,
            api::models::ModelPairRequest,
            api::models::OptimizeModelResponse,
            ChatSessionRow, ChatMessageRow,
            ListResponse<ChatSessionRow>,
            ListResponse<ChatMessageRow>,
            api::chat::ChatRequest,
            api::chat::ChatResponse,
            api::health::HealthResponse,
        )
    ),
    tags(
        (name = "health", description = "Service health"),
        (name = "builds", description = "Build sessions; live events on /ws/build/{id}"),
        (name = "projects", description = "Generated and user projects"),
        (name = "models", description = "Uploaded model files"),
        (name = "chat", description = "Chat transcripts; streamed replies on /api/chat/ws/{session_id}")
    ),
    info(
        title = "WebForge API",
        version = "0.1.0",
        description = "Prompt-to-project builds with streamed progress, project and model management, chat",
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    )
)]
pub struct ApiDoc;

impl ApiDoc {
    /// Pretty-printed JSON spec
    pub fn to_json() -> Result<String, serde_json::Error> {
        Self::openapi().to_pretty_json()
    }
}
