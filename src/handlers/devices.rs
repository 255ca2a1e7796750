use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Extension, Json,
};
use serde_json::Value;
use uuid::Uuid;

use super::json_body;
use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthUser, Authorized};
use crate::resources::ResourceRecord;

/// GET /api/devices
pub async fn list(State(state): State<AppState>) -> ApiResult<Vec<ResourceRecord>> {
    Ok(ApiResponse::success(state.devices.list().await))
}

/// POST /api/devices - register a device; body must carry a `name`
pub async fn create(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Extension(authorized): Extension<Authorized>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<ResourceRecord> {
    let data = json_body(payload)?;
    let record = state.devices.insert(&auth_user.username, data).await?;
    tracing::info!(
        "Device {} registered by {} ({})",
        record.id,
        auth_user.username,
        authorized.role
    );
    Ok(ApiResponse::created(record))
}

/// DELETE /api/devices/:id
pub async fn remove(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<()> {
    if state.devices.remove(id).await {
        Ok(ApiResponse::no_content())
    } else {
        Err(ApiError::not_found(format!("Device '{}' not found", id)))
    }
}
