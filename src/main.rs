use anyhow::Context;
use tracing_subscriber::EnvFilter;

use iot_guard::{app, connect_user_store, AppConfig, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up JWT_SECRET, USERS_FILE, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Configuration is read once here and injected; nothing reads env later
    let config = AppConfig::from_env().context("invalid configuration")?;
    tracing::info!("Starting iot-guard in {:?} mode", config.environment);

    let users = connect_user_store(&config)
        .await
        .context("failed to open user store")?;

    let bind_addr = config.bind_addr();
    let state = AppState::new(config, users).context("failed to initialise token service")?;

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    tracing::info!("iot-guard listening on http://{}", bind_addr);

    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("iot-guard stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
