use anyhow::Context;
use clap::Args;
use serde_json::json;
use uuid::Uuid;

use crate::auth::{hash_password, inspect, Claims, TokenService};
use crate::cli::utils::{format_timestamp, output_fields, output_success};
use crate::cli::OutputFormat;

#[derive(Args, Debug, Clone)]
pub struct ForgeArgs {
    #[arg(long, help = "username claim")]
    pub username: String,

    #[arg(long, help = "role claim; omit to mint a token without a role")]
    pub role: Option<String>,

    #[arg(long, help = "id claim (random when omitted)")]
    pub id: Option<Uuid>,

    #[arg(
        long,
        default_value_t = 1,
        allow_negative_numbers = true,
        help = "Lifetime in hours; negative values mint an already-expired token"
    )]
    pub expires_in_hours: i64,

    #[arg(long, env = "JWT_SECRET", hide_env_values = true, help = "Signing secret")]
    pub secret: String,
}

pub fn handle_decode(token: &str, secret: Option<&str>, output_format: OutputFormat) -> anyhow::Result<()> {
    let claims = inspect(token).context("token could not be decoded")?;

    let verification = match secret {
        Some(secret) => {
            let tokens = TokenService::new(secret, 1)?;
            match tokens.verify(token) {
                Ok(_) => "valid".to_string(),
                Err(e) => format!("invalid: {}", e),
            }
        }
        None => "not checked (no secret)".to_string(),
    };

    let expired = claims.is_expired();
    let fields = [
        ("id", claims.id.to_string()),
        ("username", claims.username.clone()),
        ("role", claims.role.clone().unwrap_or_else(|| "<absent>".to_string())),
        ("issued_at", format_timestamp(claims.iat)),
        ("expires_at", format_timestamp(claims.exp)),
        ("expired", expired.to_string()),
        ("signature", verification.clone()),
    ];
    output_fields(
        &output_format,
        &fields,
        &json!({
            "claims": claims,
            "expired": expired,
            "signature": verification
        }),
    )
}

pub fn forge(args: &ForgeArgs) -> anyhow::Result<(Claims, String)> {
    let tokens = TokenService::new(&args.secret, 1)?;
    let ttl = chrono::Duration::try_hours(args.expires_in_hours)
        .with_context(|| format!("--expires-in-hours {} is out of range", args.expires_in_hours))?;
    let claims = Claims::new(
        args.id.unwrap_or_else(Uuid::new_v4),
        args.username.clone(),
        args.role.clone(),
        ttl,
    )?;
    let token = tokens.issue_claims(&claims)?;
    Ok((claims, token))
}

pub fn handle_forge(args: ForgeArgs, output_format: OutputFormat) -> anyhow::Result<()> {
    let (claims, token) = forge(&args)?;
    match output_format {
        OutputFormat::Json => output_success(
            &output_format,
            "token minted",
            Some(json!({ "token": token, "claims": claims })),
        ),
        OutputFormat::Text => {
            println!("{}", token);
            Ok(())
        }
    }
}

pub fn handle_hash_password(password: &str, output_format: OutputFormat) -> anyhow::Result<()> {
    if password.is_empty() {
        anyhow::bail!("password must not be empty");
    }
    let hash = hash_password(password);
    match output_format {
        OutputFormat::Json => output_success(&output_format, "password hashed", Some(json!({ "password_hash": hash }))),
        OutputFormat::Text => {
            println!("{}", hash);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(role: Option<&str>, hours: i64) -> ForgeArgs {
        ForgeArgs {
            username: "mallory".to_string(),
            role: role.map(str::to_string),
            id: None,
            expires_in_hours: hours,
            secret: "forge-secret".to_string(),
        }
    }

    #[test]
    fn forged_tokens_verify_with_the_same_secret() {
        let (claims, token) = forge(&args(Some("Admin"), 1)).unwrap();
        let verified = TokenService::new("forge-secret", 1).unwrap().verify(&token).unwrap();
        assert_eq!(verified, claims);
        assert_eq!(verified.role.as_deref(), Some("Admin"));
    }

    #[test]
    fn forge_without_role_or_already_expired() {
        let (claims, _) = forge(&args(None, 1)).unwrap();
        assert!(claims.role.is_none());

        let (claims, token) = forge(&args(Some("viewer"), -1)).unwrap();
        assert!(claims.is_expired());
        assert!(TokenService::new("forge-secret", 1).unwrap().verify(&token).is_err());
    }

    #[test]
    fn forge_rejects_out_of_range_lifetimes() {
        assert!(forge(&args(Some("admin"), i64::MAX)).is_err());
        assert!(forge(&args(Some("admin"), 10_000_000_000)).is_err());
        assert!(forge(&args(Some("admin"), -10_000_000_000)).is_err());
    }
}
