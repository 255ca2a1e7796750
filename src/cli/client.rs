use anyhow::{anyhow, bail, Context};
use reqwest::Method;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use url::Url;

use super::Credentials;
use crate::auth::inspect;
use crate::policy::Action;

/// Result of a login: the token and the role the server reported.
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub username: String,
    pub role: Option<String>,
    pub token: String,
    pub expires_in: Option<i64>,
}

/// Status and decoded body of one HTTP exchange.
#[derive(Debug, Clone, Serialize)]
pub struct ProbeResponse {
    pub status: u16,
    pub body: Value,
}

impl ProbeResponse {
    /// Machine code from an error envelope, if any.
    pub fn error_code(&self) -> Option<&str> {
        self.body.get("code").and_then(Value::as_str)
    }
}

/// Thin HTTP client for the API. Transport failures are retried
/// sequentially with a fixed delay; HTTP error statuses are returned as-is.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base: Url,
    retries: u32,
    delay: Duration,
}

impl ApiClient {
    pub fn new(server: &str) -> anyhow::Result<Self> {
        let mut base = Url::parse(server).with_context(|| format!("invalid server URL '{}'", server))?;
        if base.cannot_be_a_base() {
            bail!("server URL '{}' cannot carry request paths", server);
        }
        // A path prefix such as `/iot` must survive joining
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            http,
            base,
            retries: 0,
            delay: Duration::from_secs(2),
        })
    }

    pub fn with_retries(mut self, retries: u32, delay: Duration) -> Self {
        self.retries = retries;
        self.delay = delay;
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// Resolve an API path against the server URL, keeping any path prefix.
    pub fn endpoint(&self, path: &str) -> anyhow::Result<Url> {
        self.base
            .join(path.trim_start_matches('/'))
            .with_context(|| format!("invalid request path '{}'", path))
    }

    /// Send one request, retrying transport errors.
    pub async fn call(
        &self,
        method: Method,
        path: &str,
        token: Option<&str>,
        body: Option<&Value>,
    ) -> anyhow::Result<ProbeResponse> {
        let url = self.endpoint(path)?;

        let mut attempt = 0;
        loop {
            let mut request = self.http.request(method.clone(), url.clone());
            if let Some(token) = token {
                request = request.bearer_auth(token);
            }
            if let Some(body) = body {
                request = request.json(body);
            }

            match request.send().await {
                Ok(response) => {
                    let status = response.status().as_u16();
                    let text = response.text().await.unwrap_or_default();
                    let body = if text.trim().is_empty() {
                        Value::Null
                    } else {
                        serde_json::from_str(&text).unwrap_or(Value::String(text))
                    };
                    return Ok(ProbeResponse { status, body });
                }
                Err(e) if attempt < self.retries => {
                    attempt += 1;
                    tracing::warn!(
                        "{} {} failed ({}); retry {}/{} in {:?}",
                        method, url, e, attempt, self.retries, self.delay
                    );
                    tokio::time::sleep(self.delay).await;
                }
                Err(e) => return Err(anyhow!(e).context(format!("{} {} failed", method, url))),
            }
        }
    }

    pub async fn login(&self, username: &str, password: &str) -> anyhow::Result<Session> {
        let body = serde_json::json!({ "username": username, "password": password });
        let response = self
            .call(Method::POST, "/api/auth/login", None, Some(&body))
            .await?;

        if response.status != 200 {
            bail!(
                "login as '{}' failed with {}: {}",
                username,
                response.status,
                describe_error(&response.body)
            );
        }

        // Accept both `{data: {token, user}}` and a bare `{token, user}`
        let data = response.body.get("data").unwrap_or(&response.body);
        let token = data
            .get("token")
            .and_then(Value::as_str)
            .ok_or_else(|| anyhow!("login response has no token: {}", response.body))?;

        Ok(Session {
            username: username.to_string(),
            role: data
                .pointer("/user/role")
                .and_then(Value::as_str)
                .map(str::to_string),
            token: token.to_string(),
            expires_in: data.get("expires_in").and_then(Value::as_i64),
        })
    }

    /// Turn command-line credentials into a session: an explicit token wins,
    /// otherwise log in with username and password.
    pub async fn session(&self, credentials: &Credentials) -> anyhow::Result<Session> {
        if let Some(token) = &credentials.token {
            let claims = inspect(token).context("--token is not a decodable JWT")?;
            return Ok(Session {
                username: claims.username,
                role: claims.role,
                token: token.clone(),
                expires_in: Some(claims.exp - chrono::Utc::now().timestamp()),
            });
        }

        match (&credentials.username, &credentials.password) {
            (Some(username), Some(password)) => self.login(username, password).await,
            _ => bail!("provide --token, or --username and --password (or PROBE_USERNAME / PROBE_PASSWORD)"),
        }
    }

    pub async fn whoami(&self, token: &str) -> anyhow::Result<ProbeResponse> {
        self.call(Method::GET, "/api/auth/whoami", Some(token), None).await
    }

    /// Perform an action's request with its sample body.
    pub async fn probe(&self, action: Action, token: Option<&str>) -> anyhow::Result<ProbeResponse> {
        let body = action.sample_body();
        self.call(action.method(), &action.probe_path(), token, body.as_ref())
            .await
    }
}

/// Short description of an error body for messages.
pub fn describe_error(body: &Value) -> String {
    match (body.get("code").and_then(Value::as_str), body.get("error").and_then(Value::as_str)) {
        (Some(code), Some(message)) => format!("{} ({})", message, code),
        (None, Some(message)) => message.to_string(),
        _ => body.to_string(),
    }
}
