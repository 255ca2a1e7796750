use clap::Args;
use std::time::Duration;

use super::{Mismatch, ProbeOutcome};
use crate::cli::client::{ApiClient, Session};
use crate::cli::utils::output_fields;
use crate::cli::{probe_policy, Credentials, OutputFormat, RetryArgs};
use crate::policy::{Action, Policy};

#[derive(Args, Debug, Clone)]
pub struct CheckArgs {
    #[arg(help = "Action to call, e.g. device.create")]
    pub action: Action,

    #[command(flatten)]
    pub credentials: Credentials,

    #[command(flatten)]
    pub retry: RetryArgs,

    #[arg(long, help = "Expected status (default: predicted from the policy)")]
    pub expect: Option<u16>,
}

/// Call `action` with the session's token and compare against the policy.
pub async fn run_check(
    client: &ApiClient,
    policy: &Policy,
    session: &Session,
    action: Action,
    expect: Option<u16>,
) -> anyhow::Result<ProbeOutcome> {
    let expected = expect.unwrap_or_else(|| policy.expected_status(action, session.role.as_deref()));
    let response = client.probe(action, Some(&session.token)).await?;
    Ok(ProbeOutcome::new(
        &session.username,
        session.role.clone(),
        action,
        expected,
        &response,
    ))
}

pub async fn handle(server: &str, args: CheckArgs, output_format: OutputFormat) -> anyhow::Result<()> {
    let client = ApiClient::new(server)?
        .with_retries(args.retry.retries, Duration::from_secs(args.retry.delay_secs));
    let policy = probe_policy()?;
    let session = client.session(&args.credentials).await?;

    let outcome = run_check(&client, &policy, &session, args.action, args.expect).await?;

    let fields = [
        ("account", outcome.account.clone()),
        ("role", outcome.role.clone().unwrap_or_else(|| "-".to_string())),
        ("request", format!("{} {}", outcome.method, outcome.path)),
        ("expected", outcome.expected.to_string()),
        ("actual", outcome.actual.to_string()),
        ("code", outcome.code.clone().unwrap_or_else(|| "-".to_string())),
        ("result", if outcome.ok { "ok" } else { "MISMATCH" }.to_string()),
    ];
    output_fields(&output_format, &fields, &outcome)?;

    if !outcome.ok {
        tracing::debug!(
            "{} as '{}' returned {}, expected {}",
            outcome.action,
            outcome.account,
            outcome.actual,
            outcome.expected
        );
        return Err(Mismatch {
            mismatches: 1,
            total: 1,
        }
        .into());
    }
    Ok(())
}
