use axum::{
    extract::{rejection::JsonRejection, State},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::json_body;
use crate::app::AppState;
use crate::auth::{verify_password, Claims};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginUser {
    pub id: Uuid,
    pub username: String,
    pub role: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: LoginUser,
    pub expires_in: i64,
}

/// POST /api/auth/login - exchange username/password for an access token
///
/// Unknown users and wrong passwords get the same 401 so the response does
/// not reveal which usernames exist.
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<LoginResponse> {
    let request = json_body(payload)?;
    if request.username.trim().is_empty() || request.password.is_empty() {
        return Err(ApiError::bad_request("username and password are required"));
    }

    let user = state.users.find_by_username(&request.username).await?;
    let user = match user {
        Some(user) if verify_password(&request.password, &user.password_hash) => user,
        _ => {
            tracing::warn!("Failed login for '{}'", request.username);
            return Err(ApiError::invalid_credentials("Invalid username or password"));
        }
    };

    let issued = state.tokens.issue(&user)?;
    tracing::info!("Issued token for '{}' with role '{}'", user.username, user.role);

    Ok(ApiResponse::success(LoginResponse {
        token: issued.token,
        user: LoginUser {
            id: user.id,
            username: user.username,
            role: user.role,
        },
        expires_in: issued.expires_in,
    }))
}

/// GET /api/auth/whoami - the verified claim set of the caller
pub async fn whoami(Extension(auth_user): Extension<AuthUser>) -> ApiResult<Claims> {
    Ok(ApiResponse::success(auth_user.claims))
}
