use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Extension, Json,
};
use serde_json::Value;
use uuid::Uuid;

use super::json_body;
use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::resources::ResourceRecord;

/// GET /api/templates
pub async fn list(State(state): State<AppState>) -> ApiResult<Vec<ResourceRecord>> {
    Ok(ApiResponse::success(state.templates.list().await))
}

/// POST /api/templates - notification template with `name` and `body`
pub async fn create(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<ResourceRecord> {
    let data = json_body(payload)?;
    let record = state.templates.insert(&auth_user.username, data).await?;
    Ok(ApiResponse::created(record))
}

/// DELETE /api/templates/:id
pub async fn remove(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<()> {
    if state.templates.remove(id).await {
        Ok(ApiResponse::no_content())
    } else {
        Err(ApiError::not_found(format!("Template '{}' not found", id)))
    }
}
