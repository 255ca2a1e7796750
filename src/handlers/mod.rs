// Route handlers. Public: system, auth::login. Everything else sits behind
// jwt_auth_middleware and, for resources, the per-action role guard.

use axum::extract::rejection::JsonRejection;
use axum::Json;
use serde::de::DeserializeOwned;

use crate::error::ApiError;

pub mod auth;
pub mod devices;
pub mod system;
pub mod templates;
pub mod weather;

/// Unwrap a JSON body, turning extractor rejections into our error envelope.
pub(crate) fn json_body<T: DeserializeOwned>(
    payload: Result<Json<T>, JsonRejection>,
) -> Result<T, ApiError> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| ApiError::invalid_json(rejection.body_text()))
}
