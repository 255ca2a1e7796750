use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use super::auth::AuthUser;
use crate::app::AppState;
use crate::auth::{authorize, Role};
use crate::config::RoleSource;
use crate::error::ApiError;
use crate::policy::Action;

/// State for one guarded route: which action it performs.
#[derive(Clone)]
pub struct RoleGuard {
    state: AppState,
    action: Action,
}

impl RoleGuard {
    pub fn new(state: AppState, action: Action) -> Self {
        Self { state, action }
    }
}

/// Outcome of a successful guard check, injected for handlers
#[derive(Clone, Debug)]
pub struct Authorized {
    pub action: Action,
    pub role: Role,
}

/// Role middleware. Runs after `jwt_auth_middleware`; takes the caller's role
/// from the token or the user store depending on configuration, then checks it
/// against the action's permitted-role set.
pub async fn require_roles(
    State(guard): State<RoleGuard>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let RoleGuard { state, action } = guard;

    let Some(auth_user) = request.extensions().get::<AuthUser>().cloned() else {
        return Err(ApiError::missing_credential("Authentication required"));
    };

    let role = match state.config.security.role_source {
        RoleSource::Token => auth_user.role.clone(),
        RoleSource::Store => state
            .users
            .find_by_id(auth_user.id)
            .await?
            .map(|user| user.role),
    };

    let permitted = state.config.policy.permitted(action);
    let role = authorize(role.as_deref(), &permitted).map_err(|denial| {
        tracing::warn!(
            action = %action,
            user = %auth_user.username,
            permitted = %permitted,
            reason = denial.reason(),
            "Authorization denied"
        );
        ApiError::from(denial)
    })?;

    tracing::debug!("{} authorized as {} for {}", auth_user.username, role, action);
    request.extensions_mut().insert(Authorized { action, role });

    Ok(next.run(request).await)
}
