// Project HTTP routes
//
// Thin layer over ProjectStore. Store calls are synchronous filesystem work
// and run through `blocking`.

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use utoipa::ToSchema;
use webforge_storage::{
    blocking, GrepMatch, ManifestUpdate, ProjectManifest, ProjectStore, ProjectSummary,
    ProjectTree,
};

use super::common::{ApiError, ApiResult, ErrorResponse, ListResponse};

/// Request to create a project from a set of files
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateProjectRequest {
    #[schema(example = "portfolio")]
    pub name: String,
    /// Relative path -> file content
    #[serde(default)]
    pub files: BTreeMap<String, String>,
    #[serde(default)]
    pub summary: String,
}

/// Request to overwrite one file
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct SaveFileRequest {
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct FileContentResponse {
    pub path: String,
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SaveFileResponse {
    pub project: String,
    pub path: String,
    pub saved: bool,
}

/// Query parameters for reading a file
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct FileQuery {
    /// Path relative to the project root
    pub path: String,
}

/// Query parameters for searching a project
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct GrepQuery {
    /// Regular expression matched against each line
    pub pattern: String,
}

/// App state for project routes
#[derive(Clone)]
pub struct AppState {
    pub store: ProjectStore,
}

impl AppState {
    pub fn new(store: ProjectStore) -> Self {
        Self { store }
    }
}

/// Create project routes
pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/api/projects", get(list_projects).post(create_project))
        .route("/api/projects/:project", delete(delete_project))
        .route("/api/projects/:project/files", get(list_files))
        .route("/api/projects/:project/file", get(read_file))
        .route(
            "/api/projects/:project/manifest",
            get(get_manifest).patch(update_manifest),
        )
        .route("/api/projects/:project/tree", get(get_tree))
        .route("/api/projects/:project/grep", get(grep_project))
        .route("/api/projects/save/:project/*path", post(save_file))
        .route("/api/projects/download/:project", get(download_project))
        .route("/api/projects/run/:project", get(run_project))
        .with_state(state)
}

/// GET /api/projects - List projects
#[utoipa::path(
    get,
    path = "/api/projects",
    responses(
        (status = 200, description = "Projects sorted by name", body = ListResponse<ProjectSummary>),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "projects"
)]
pub async fn list_projects(
    State(state): State<AppState>,
) -> ApiResult<Json<ListResponse<ProjectSummary>>> {
    let store = state.store.clone();
    let projects = blocking(move || store.list_projects()).await?;
    Ok(Json(ListResponse::new(projects)))
}

/// POST /api/projects - Create a project
#[utoipa::path(
    post,
    path = "/api/projects",
    request_body = CreateProjectRequest,
    responses(
        (status = 201, description = "Project created", body = ProjectManifest),
        (status = 400, description = "Invalid name or file path", body = ErrorResponse),
        (status = 409, description = "Project already exists", body = ErrorResponse)
    ),
    tag = "projects"
)]
pub async fn create_project(
    State(state): State<AppState>,
    Json(req): Json<CreateProjectRequest>,
) -> ApiResult<(StatusCode, Json<ProjectManifest>)> {
    let store = state.store.clone();
    let manifest = blocking(move || {
        store.create_project(&req.name, &req.files, &req.summary)?;
        store.load_manifest(&req.name)
    })
    .await?
    .ok_or_else(ApiError::internal)?;
    Ok((StatusCode::CREATED, Json(manifest)))
}

/// DELETE /api/projects/{project} - Delete a project
#[utoipa::path(
    delete,
    path = "/api/projects/{project}",
    params(("project" = String, Path, description = "Project name")),
    responses(
        (status = 204, description = "Project deleted"),
        (status = 404, description = "Project not found", body = ErrorResponse)
    ),
    tag = "projects"
)]
pub async fn delete_project(
    State(state): State<AppState>,
    Path(project): Path<String>,
) -> ApiResult<StatusCode> {
    let store = state.store.clone();
    blocking(move || store.delete_project(&project)).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/projects/{project}/files - List a project's files
#[utoipa::path(
    get,
    path = "/api/projects/{project}/files",
    params(("project" = String, Path, description = "Project name")),
    responses(
        (status = 200, description = "Relative file paths", body = ListResponse<String>),
        (status = 404, description = "Project not found", body = ErrorResponse)
    ),
    tag = "projects"
)]
pub async fn list_files(
    State(state): State<AppState>,
    Path(project): Path<String>,
) -> ApiResult<Json<ListResponse<String>>> {
    let store = state.store.clone();
    let files = blocking(move || store.list_project_files(&project)).await?;
    Ok(Json(ListResponse::new(files)))
}

/// GET /api/projects/{project}/file - Read one file
#[utoipa::path(
    get,
    path = "/api/projects/{project}/file",
    params(
        ("project" = String, Path, description = "Project name"),
        ("path" = String, Query, description = "Path relative to the project root")
    ),
    responses(
        (status = 200, description = "File content", body = FileContentResponse),
        (status = 400, description = "Invalid path", body = ErrorResponse),
        (status = 404, description = "Project or file not found", body = ErrorResponse)
    ),
    tag = "projects"
)]
pub async fn read_file(
    State(state): State<AppState>,
    Path(project): Path<String>,
    Query(query): Query<FileQuery>,
) -> ApiResult<Json<FileContentResponse>> {
    let store = state.store.clone();
    let path = query.path.clone();
    let content = blocking(move || store.read_file(&project, &path)).await?;
    Ok(Json(FileContentResponse {
        path: query.path,
        content,
    }))
}

/// POST /api/projects/save/{project}/{path} - Overwrite one file
#[utoipa::path(
    post,
    path = "/api/projects/save/{project}/{path}",
    params(
        ("project" = String, Path, description = "Project name"),
        ("path" = String, Path, description = "Path relative to the project root")
    ),
    request_body = SaveFileRequest,
    responses(
        (status = 200, description = "File saved", body = SaveFileResponse),
        (status = 400, description = "Invalid path", body = ErrorResponse),
        (status = 404, description = "Project not found", body = ErrorResponse)
    ),
    tag = "projects"
)]
pub async fn save_file(
    State(state): State<AppState>,
    Path((project, path)): Path<(String, String)>,
    Json(req): Json<SaveFileRequest>,
) -> ApiResult<Json<SaveFileResponse>> {
    let store = state.store.clone();
    let (target_project, target_path) = (project.clone(), path.clone());
    blocking(move || store.save_file(&target_project, &target_path, &req.content)).await?;
    tracing::debug!(project = %project, path = %path, "File saved");
    Ok(Json(SaveFileResponse {
        project,
        path,
        saved: true,
    }))
}

/// GET /api/projects/{project}/manifest - Read a project's manifest
#[utoipa::path(
    get,
    path = "/api/projects/{project}/manifest",
    params(("project" = String, Path, description = "Project name")),
    responses(
        (status = 200, description = "Manifest", body = ProjectManifest),
        (status = 404, description = "Project or manifest not found", body = ErrorResponse)
    ),
    tag = "projects"
)]
pub async fn get_manifest(
    State(state): State<AppState>,
    Path(project): Path<String>,
) -> ApiResult<Json<ProjectManifest>> {
    let store = state.store.clone();
    let name = project.clone();
    blocking(move || store.load_manifest(&name))
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("Project '{project}' has no manifest.")))
}

/// PATCH /api/projects/{project}/manifest - Update summary, prompt or stack
#[utoipa::path(
    patch,
    path = "/api/projects/{project}/manifest",
    params(("project" = String, Path, description = "Project name")),
    request_body = ManifestUpdate,
    responses(
        (status = 200, description = "Updated manifest", body = ProjectManifest),
        (status = 404, description = "Project not found", body = ErrorResponse)
    ),
    tag = "projects"
)]
pub async fn update_manifest(
    State(state): State<AppState>,
    Path(project): Path<String>,
    Json(update): Json<ManifestUpdate>,
) -> ApiResult<Json<ProjectManifest>> {
    let store = state.store.clone();
    let manifest = blocking(move || store.update_manifest(&project, update)).await?;
    Ok(Json(manifest))
}

/// GET /api/projects/{project}/tree - Directory -> files view
#[utoipa::path(
    get,
    path = "/api/projects/{project}/tree",
    params(("project" = String, Path, description = "Project name")),
    responses(
        (status = 200, description = "Directory (\".\" for the root) -> file name -> relative path"),
        (status = 404, description = "Project not found", body = ErrorResponse)
    ),
    tag = "projects"
)]
pub async fn get_tree(
    State(state): State<AppState>,
    Path(project): Path<String>,
) -> ApiResult<Json<ProjectTree>> {
    let store = state.store.clone();
    let tree = blocking(move || store.describe_project_tree(&project)).await?;
    Ok(Json(tree))
}

/// GET /api/projects/{project}/grep - Search a project's text files
#[utoipa::path(
    get,
    path = "/api/projects/{project}/grep",
    params(
        ("project" = String, Path, description = "Project name"),
        ("pattern" = String, Query, description = "Regular expression")
    ),
    responses(
        (status = 200, description = "Matching lines", body = ListResponse<GrepMatch>),
        (status = 400, description = "Invalid pattern", body = ErrorResponse),
        (status = 404, description = "Project not found", body = ErrorResponse)
    ),
    tag = "projects"
)]
pub async fn grep_project(
    State(state): State<AppState>,
    Path(project): Path<String>,
    Query(query): Query<GrepQuery>,
) -> ApiResult<Json<ListResponse<GrepMatch>>> {
    let store = state.store.clone();
    let matches = blocking(move || store.grep_project(&project, &query.pattern)).await?;
    Ok(Json(ListResponse::new(matches)))
}

/// GET /api/projects/download/{project} - Download a project as a zip archive
#[utoipa::path(
    get,
    path = "/api/projects/download/{project}",
    params(("project" = String, Path, description = "Project name")),
    responses(
        (status = 200, description = "Zip archive (application/zip)"),
        (status = 404, description = "Project not found", body = ErrorResponse)
    ),
    tag = "projects"
)]
pub async fn download_project(
    State(state): State<AppState>,
    Path(project): Path<String>,
) -> ApiResult<Response> {
    let store = state.store.clone();
    let (bytes, filename) = blocking(move || store.zip_project(&project)).await?;
    Ok((
        [
            (header::CONTENT_TYPE, "application/zip".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        bytes,
    )
        .into_response())
}

/// GET /api/projects/run/{project} - Preview a project's entry page
#[utoipa::path(
    get,
    path = "/api/projects/run/{project}",
    params(("project" = String, Path, description = "Project name")),
    responses(
        (status = 200, description = "Entry page HTML"),
        (status = 404, description = "Project or page not found", body = ErrorResponse)
    ),
    tag = "projects"
)]
pub async fn run_project(
    State(state): State<AppState>,
    Path(project): Path<String>,
) -> ApiResult<Html<String>> {
    let store = state.store.clone();
    let html = blocking(move || store.preview_html(&project)).await?;
    Ok(Html(html))
}
