use axum::{
    extract::{rejection::JsonRejection, State},
    Extension, Json,
};
use serde_json::Value;

use super::json_body;
use crate::app::AppState;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::resources::ResourceRecord;

/// GET /api/weather - collected readings, oldest first
pub async fn list(State(state): State<AppState>) -> ApiResult<Vec<ResourceRecord>> {
    Ok(ApiResponse::success(state.weather.list().await))
}

/// POST /api/weather/collect - store a reading for a `location`
pub async fn collect(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<ResourceRecord> {
    let data = json_body(payload)?;
    let record = state.weather.insert(&auth_user.username, data).await?;
    Ok(ApiResponse::created(record))
}
