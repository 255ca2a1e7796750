#![allow(dead_code)]

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use iot_guard::auth::hash_password;
use iot_guard::config::{AppConfig, RoleSource};
use iot_guard::store::{MemoryUserStore, UserRecord};
use iot_guard::{app, AppState};
use reqwest::StatusCode;
use serde_json::{json, Value};
use uuid::Uuid;

pub const SECRET: &str = "integration-test-secret";
pub const PASSWORD: &str = "correct horse";

/// A server running inside the test's runtime, with its user store exposed
/// so tests can change accounts while it runs.
pub struct TestServer {
    pub port: u16,
    pub base_url: String,
    pub users: Arc<MemoryUserStore>,
    pub client: reqwest::Client,
}

pub fn user(username: &str, role: &str) -> UserRecord {
    UserRecord {
        id: Uuid::new_v4(),
        username: username.to_string(),
        password_hash: hash_password(PASSWORD),
        role: role.to_string(),
    }
}

/// Default accounts: one per role, plus one whose stored role has odd casing.
pub fn seed_users() -> Vec<UserRecord> {
    vec![
        user("alice", "admin"),
        user("eddie", "editor"),
        user("victor", "viewer"),
        user("shouty", "ADMIN"),
    ]
}

impl TestServer {
    pub async fn start() -> Result<Self> {
        Self::start_with(RoleSource::Token, seed_users()).await
    }

    pub async fn start_with(role_source: RoleSource, users: Vec<UserRecord>) -> Result<Self> {
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);

        let mut config = AppConfig::development()
            .with_secret(SECRET)
            .with_role_source(role_source);
        config.server.port = port;

        let users = Arc::new(MemoryUserStore::with_users(users));
        let state = AppState::new(config.clone(), users.clone())?;
        let listener = tokio::net::TcpListener::bind(config.bind_addr()).await?;
        tokio::spawn(async move {
            let _ = axum::serve(listener, app(state)).await;
        });

        let server = Self {
            port,
            base_url,
            users,
            client: reqwest::Client::new(),
        };
        server.wait_ready(Duration::from_secs(10)).await?;
        Ok(server)
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if let Ok(resp) = self.client.get(self.url("/health")).send().await {
                if resp.status() == StatusCode::OK {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn login(&self, username: &str) -> Result<String> {
        let res = self
            .client
            .post(self.url("/api/auth/login"))
            .json(&json!({ "username": username, "password": PASSWORD }))
            .send()
            .await?;
        anyhow::ensure!(res.status() == StatusCode::OK, "login as {} got {}", username, res.status());
        let body: Value = res.json().await?;
        body["data"]["token"]
            .as_str()
            .map(str::to_string)
            .context("login response without token")
    }

    /// Send a request and return status plus JSON body (Null when empty).
    pub async fn send(
        &self,
        method: reqwest::Method,
        path: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> Result<(StatusCode, Value)> {
        let mut req = self.client.request(method, self.url(path));
        if let Some(token) = token {
            req = req.bearer_auth(token);
        }
        if let Some(body) = body {
            req = req.json(&body);
        }
        let res = req.send().await?;
        let status = res.status();
        let text = res.text().await?;
        let body = if text.is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text)?
        };
        Ok((status, body))
    }
}
