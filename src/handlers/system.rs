use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};

use crate::app::AppState;

/// GET / - service banner
pub async fn root() -> Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    Json(json!({
        "success": true,
        "data": {
            "name": "iot-guard",
            "version": version,
            "description": "Role-guarded IoT management API",
            "endpoints": {
                "login": "POST /api/auth/login (public)",
                "whoami": "GET /api/auth/whoami (token)",
                "devices": "/api/devices[/:id] (token + role)",
                "weather": "/api/weather, /api/weather/collect (token + role)",
                "templates": "/api/templates[/:id] (token + role)",
            }
        }
    }))
}

/// GET /health - liveness plus user store connectivity
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();
    let backend = state.users.backend();

    match state.users.health_check().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "user_store": backend
                }
            })),
        ),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "success": false,
                "error": "user store unavailable",
                "data": {
                    "status": "degraded",
                    "timestamp": now,
                    "user_store": backend,
                    "user_store_error": e.to_string()
                }
            })),
        ),
    }
}
