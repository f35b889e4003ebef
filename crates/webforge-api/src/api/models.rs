// Model HTTP routes
//
// Upload, list, select, delete, compare and merge model files. Selecting a
// model only records it as active; nothing is loaded.

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use webforge_storage::{blocking, ModelComparison, ModelMetadata, ModelStore};

use super::common::{ApiError, ApiResult, ErrorResponse};

const UPLOAD_FIELD: &str = "file";

/// Stored models plus the active one
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ModelListResponse {
    pub data: Vec<ModelMetadata>,
    pub active_model: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SelectModelResponse {
    pub active_model: String,
}

/// Two stored models by file name
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ModelPairRequest {
    #[schema(example = "base.gguf")]
    pub first: String,
    #[schema(example = "tuned.gguf")]
    pub second: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OptimizeModelResponse {
    /// File name of the merged model
    pub model: String,
}

/// App state for model routes
#[derive(Clone)]
pub struct AppState {
    pub store: ModelStore,
    pub max_upload_bytes: u64,
}

impl AppState {
    pub fn new(store: ModelStore, max_upload_bytes: u64) -> Self {
        Self {
            store,
            max_upload_bytes,
        }
    }
}

/// Create model routes
pub fn routes(state: AppState) -> Router {
    let upload_limit = usize::try_from(state.max_upload_bytes).unwrap_or(usize::MAX);
    Router::new()
        .route(
            "/api/models/upload",
            post(upload_model).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/api/models", get(list_models))
        .route("/api/models/select/:name", post(select_model))
        .route("/api/models/delete/:name", delete(delete_model))
        .route("/api/models/compare", post(compare_models))
        .route("/api/models/optimize", post(optimize_model))
        .with_state(state)
}

/// POST /api/models/upload - Upload a model file (multipart field `file`)
#[utoipa::path(
    post,
    path = "/api/models/upload",
    request_body(content_type = "multipart/form-data", description = "Multipart form with a `file` field"),
    responses(
        (status = 201, description = "Model stored", body = ModelMetadata),
        (status = 400, description = "Missing file or unsupported format", body = ErrorResponse),
        (status = 413, description = "Upload too large")
    ),
    tag = "models"
)]
pub async fn upload_model(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<(StatusCode, Json<ModelMetadata>)> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::new(e.status(), e.body_text()))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let filename = field
            .file_name()
            .map(str::to_string)
            .ok_or_else(|| ApiError::bad_request("Uploaded file has no name."))?;
        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::new(e.status(), e.body_text()))?;

        tracing::info!(model = %filename, bytes = data.len(), "Model upload received");
        let store = state.store.clone();
        let metadata = blocking(move || store.save_model(&filename, &data)).await?;
        return Ok((StatusCode::CREATED, Json(metadata)));
    }

    Err(ApiError::bad_request(format!(
        "Multipart field '{UPLOAD_FIELD}' is required."
    )))
}

/// GET /api/models - List stored models
#[utoipa::path(
    get,
    path = "/api/models",
    responses(
        (status = 200, description = "Stored models", body = ModelListResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "models"
)]
pub async fn list_models(State(state): State<AppState>) -> ApiResult<Json<ModelListResponse>> {
    let store = state.store.clone();
    let (data, active_model) = blocking(move || {
        let models = store.list_models()?;
        let active = store.settings().active_model()?;
        Ok((models, active))
    })
    .await?;
    Ok(Json(ModelListResponse { data, active_model }))
}

/// POST /api/models/select/{name} - Make a model active
#[utoipa::path(
    post,
    path = "/api/models/select/{name}",
    params(("name" = String, Path, description = "Model file name")),
    responses(
        (status = 200, description = "Model selected", body = SelectModelResponse),
        (status = 404, description = "Model not found", body = ErrorResponse)
    ),
    tag = "models"
)]
pub async fn select_model(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<Json<SelectModelResponse>> {
    let store = state.store.clone();
    let active_model = blocking(move || store.select_model(&name)).await?;
    Ok(Json(SelectModelResponse { active_model }))
}

/// DELETE /api/models/delete/{name} - Delete a model
#[utoipa::path(
    delete,
    path = "/api/models/delete/{name}",
    params(("name" = String, Path, description = "Model file name")),
    responses(
        (status = 204, description = "Model deleted"),
        (status = 404, description = "Model not found", body = ErrorResponse)
    ),
    tag = "models"
)]
pub async fn delete_model(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<StatusCode> {
    let store = state.store.clone();
    blocking(move || store.delete_model(&name)).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/models/compare - Compare two models
#[utoipa::path(
    post,
    path = "/api/models/compare",
    request_body = ModelPairRequest,
    responses(
        (status = 200, description = "Comparison", body = ModelComparison),
        (status = 404, description = "Model not found", body = ErrorResponse)
    ),
    tag = "models"
)]
pub async fn compare_models(
    State(state): State<AppState>,
    Json(req): Json<ModelPairRequest>,
) -> ApiResult<Json<ModelComparison>> {
    let store = state.store.clone();
    let comparison = blocking(move || store.compare_models(&req.first, &req.second)).await?;
    Ok(Json(comparison))
}

/// POST /api/models/optimize - Merge two models into a new file
#[utoipa::path(
    post,
    path = "/api/models/optimize",
    request_body = ModelPairRequest,
    responses(
        (status = 200, description = "Merged model written", body = OptimizeModelResponse),
        (status = 404, description = "Model not found", body = ErrorResponse)
    ),
    tag = "models"
)]
pub async fn optimize_model(
    State(state): State<AppState>,
    Json(req): Json<ModelPairRequest>,
) -> ApiResult<Json<OptimizeModelResponse>> {
    let store = state.store.clone();
    let model = blocking(move || store.optimize_model(&req.first, &req.second)).await?;
    Ok(Json(OptimizeModelResponse { model }))
}
