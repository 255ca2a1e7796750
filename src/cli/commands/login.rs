use serde_json::json;

use crate::cli::client::{describe_error, ApiClient};
use crate::cli::utils::{format_timestamp, output_fields};
use crate::cli::{Credentials, OutputFormat};

pub async fn handle_login(
    server: &str,
    credentials: Credentials,
    output_format: OutputFormat,
) -> anyhow::Result<()> {
    let client = ApiClient::new(server)?;
    let session = client.session(&credentials).await?;

    let fields = [
        ("username", session.username.clone()),
        ("role", session.role.clone().unwrap_or_else(|| "-".to_string())),
        (
            "expires_in",
            session
                .expires_in
                .map(|s| format!("{}s", s))
                .unwrap_or_else(|| "-".to_string()),
        ),
        ("token", session.token.clone()),
    ];
    output_fields(&output_format, &fields, &session)
}

pub async fn handle_whoami(
    server: &str,
    credentials: Credentials,
    output_format: OutputFormat,
) -> anyhow::Result<()> {
    let client = ApiClient::new(server)?;
    let session = client.session(&credentials).await?;
    let response = client.whoami(&session.token).await?;

    if response.status != 200 {
        anyhow::bail!(
            "whoami returned {}: {}",
            response.status,
            describe_error(&response.body)
        );
    }

    let claims = response.body.get("data").cloned().unwrap_or(response.body);
    let text = |key: &str| {
        claims
            .get(key)
            .map(|v| v.as_str().map(str::to_string).unwrap_or_else(|| v.to_string()))
            .unwrap_or_else(|| "-".to_string())
    };
    let timestamp = |key: &str| {
        claims
            .get(key)
            .and_then(|v| v.as_i64())
            .map(format_timestamp)
            .unwrap_or_else(|| "-".to_string())
    };

    let fields = [
        ("id", text("id")),
        ("username", text("username")),
        ("role", text("role")),
        ("issued_at", timestamp("iat")),
        ("expires_at", timestamp("exp")),
    ];
    output_fields(&output_format, &fields, &json!({ "claims": claims }))
}
