use axum::{
    extract::DefaultBodyLimit,
    http::HeaderValue,
    middleware,
    routing::{delete, get, post, MethodRouter},
    Router,
};
use std::sync::Arc;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};

use crate::auth::{JwtError, TokenService};
use crate::config::{AppConfig, Environment};
use crate::handlers::{auth, devices, system, templates, weather};
use crate::middleware::{jwt_auth_middleware, require_roles, RoleGuard};
use crate::policy::Action;
use crate::resources::{Collection, ResourceKind};
use crate::store::{MemoryUserStore, PgUserStore, StoreError, UserStore};

/// Shared state handed to every handler and middleware.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub tokens: TokenService,
    pub users: Arc<dyn UserStore>,
    pub devices: Arc<Collection>,
    pub weather: Arc<Collection>,
    pub templates: Arc<Collection>,
}

impl AppState {
    pub fn new(config: AppConfig, users: Arc<dyn UserStore>) -> Result<Self, JwtError> {
        let tokens = TokenService::new(&config.security.jwt_secret, config.security.jwt_expiry_hours)?;

        Ok(Self {
            config: Arc::new(config),
            tokens,
            users,
            devices: Arc::new(Collection::new(ResourceKind::Device)),
            weather: Arc::new(Collection::new(ResourceKind::Weather)),
            templates: Arc::new(Collection::new(ResourceKind::Template)),
        })
    }
}

/// Pick the user store from configuration: PostgreSQL when `DATABASE_URL` is
/// set, otherwise the in-memory store seeded from `USERS_FILE`.
pub async fn connect_user_store(config: &AppConfig) -> Result<Arc<dyn UserStore>, StoreError> {
    if let Some(url) = &config.database.url {
        let store = PgUserStore::connect(
            url,
            config.database.max_connections,
            config.database.connection_timeout,
        )
        .await?;
        store.ensure_schema().await?;
        return Ok(Arc::new(store));
    }

    match &config.users_file {
        Some(path) => Ok(Arc::new(MemoryUserStore::from_seed_file(path)?)),
        None => {
            warn!("No DATABASE_URL or USERS_FILE configured; every login will fail");
            Ok(Arc::new(MemoryUserStore::new()))
        }
    }
}

pub fn app(state: AppState) -> Router {
    info!(
        "Role source: {:?}, user store: {}",
        state.config.security.role_source,
        state.users.backend()
    );

    let body_limit = state.config.api.max_request_size_bytes;
    let cors = cors_layer(&state.config);

    Router::new()
        // Public
        .route("/", get(system::root))
        .route("/health", get(system::health))
        .route("/api/auth/login", post(auth::login))
        // Protected
        .merge(protected_routes(&state))
        // Global middleware
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn protected_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/api/auth/whoami", get(auth::whoami))
        .route(
            "/api/devices",
            guarded(state, Action::DeviceList, get(devices::list))
                .merge(guarded(state, Action::DeviceCreate, post(devices::create))),
        )
        .route(
            "/api/devices/:id",
            guarded(state, Action::DeviceDelete, delete(devices::remove)),
        )
        .route(
            "/api/weather",
            guarded(state, Action::WeatherList, get(weather::list)),
        )
        .route(
            "/api/weather/collect",
            guarded(state, Action::WeatherCollect, post(weather::collect)),
        )
        .route(
            "/api/templates",
            guarded(state, Action::TemplateList, get(templates::list))
                .merge(guarded(state, Action::TemplateCreate, post(templates::create))),
        )
        .route(
            "/api/templates/:id",
            guarded(state, Action::TemplateDelete, delete(templates::remove)),
        )
        // Token check runs before every role check above
        .route_layer(middleware::from_fn_with_state(state.clone(), jwt_auth_middleware))
}

/// Attach the role guard for `action` to a single method route.
fn guarded(state: &AppState, action: Action, route: MethodRouter<AppState>) -> MethodRouter<AppState> {
    route.layer(middleware::from_fn_with_state(
        RoleGuard::new(state.clone(), action),
        require_roles,
    ))
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    if !config.security.enable_cors {
        return CorsLayer::new();
    }
    if config.environment == Environment::Development {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = config
        .security
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any)
}
