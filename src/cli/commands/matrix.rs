use anyhow::{anyhow, Context};
use clap::Args;
use serde_json::json;
use std::time::Duration;

use super::{Mismatch, ProbeOutcome};
use crate::cli::client::ApiClient;
use crate::cli::{probe_policy, OutputFormat, RetryArgs};
use crate::policy::{Action, Policy};

#[derive(Args, Debug, Clone)]
pub struct MatrixArgs {
    #[arg(
        long = "account",
        env = "PROBE_ACCOUNTS",
        hide_env_values = true,
        value_delimiter = ',',
        required = true,
        help = "username:password; repeat the flag or separate with commas"
    )]
    pub accounts: Vec<String>,

    #[arg(long = "action", help = "Limit to these actions (default: all)")]
    pub actions: Vec<Action>,

    #[arg(long, help = "Also call every action without a token")]
    pub anonymous: bool,

    #[command(flatten)]
    pub retry: RetryArgs,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub username: String,
    pub password: String,
}

impl std::str::FromStr for Account {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (username, password) = s
            .trim()
            .split_once(':')
            .ok_or_else(|| anyhow!("account '{}' must be username:password", s.trim()))?;
        if username.is_empty() {
            return Err(anyhow!("account '{}' has an empty username", s.trim()));
        }
        Ok(Self {
            username: username.to_string(),
            password: password.to_string(),
        })
    }
}

/// Log in as each account and run every action, sequentially.
pub async fn run_matrix(
    client: &ApiClient,
    policy: &Policy,
    accounts: &[Account],
    actions: &[Action],
    anonymous: bool,
) -> anyhow::Result<Vec<ProbeOutcome>> {
    let mut outcomes = Vec::with_capacity((accounts.len() + 1) * actions.len());

    for account in accounts {
        let session = client
            .login(&account.username, &account.password)
            .await
            .with_context(|| format!("matrix login as '{}'", account.username))?;

        for &action in actions {
            let expected = policy.expected_status(action, session.role.as_deref());
            let response = client.probe(action, Some(&session.token)).await?;
            outcomes.push(ProbeOutcome::new(
                &session.username,
                session.role.clone(),
                action,
                expected,
                &response,
            ));
        }
    }

    if anonymous {
        for &action in actions {
            let response = client.probe(action, None).await?;
            outcomes.push(ProbeOutcome::new("<none>", None, action, 401, &response));
        }
    }

    Ok(outcomes)
}

pub async fn handle(server: &str, args: MatrixArgs, output_format: OutputFormat) -> anyhow::Result<()> {
    let accounts = args
        .accounts
        .iter()
        .map(|a| a.parse::<Account>())
        .collect::<anyhow::Result<Vec<_>>>()?;
    let actions = if args.actions.is_empty() {
        Action::ALL.to_vec()
    } else {
        args.actions.clone()
    };

    let client = ApiClient::new(server)?
        .with_retries(args.retry.retries, Duration::from_secs(args.retry.delay_secs));
    let policy = probe_policy()?;

    let outcomes = run_matrix(&client, &policy, &accounts, &actions, args.anonymous).await?;
    let mismatches = outcomes.iter().filter(|o| !o.ok).count();

    match output_format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string_pretty(&json!({
                    "success": mismatches == 0,
                    "mismatches": mismatches,
                    "results": outcomes
                }))?
            );
        }
        OutputFormat::Text => {
            for outcome in &outcomes {
                println!("{}", outcome.to_line());
            }
            println!("{} checks, {} mismatches", outcomes.len(), mismatches);
        }
    }

    if mismatches > 0 {
        return Err(Mismatch {
            mismatches,
            total: outcomes.len(),
        }
        .into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_accounts() {
        let account: Account = "ops:pa:ss".parse().unwrap();
        assert_eq!(account.username, "ops");
        assert_eq!(account.password, "pa:ss");
        assert!("nopassword".parse::<Account>().is_err());
        assert!(":pw".parse::<Account>().is_err());
    }
}
