pub mod client;
pub mod commands;
pub mod utils;

use clap::{Args, Parser, Subcommand};
use serde::{Deserialize, Serialize};

use crate::policy::Policy;

#[derive(Parser)]
#[command(name = "probe")]
#[command(about = "Probe the iot-guard API: log in, inspect tokens, check role enforcement")]
#[command(version)]
pub struct Cli {
    #[arg(
        long,
        global = true,
        env = "PROBE_SERVER",
        default_value = "http://localhost:3000",
        help = "Base URL of the API"
    )]
    pub server: String,

    #[arg(long, global = true, help = "Output in human-readable text format")]
    pub text: bool,

    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// How a command obtains a token: an explicit one, or by logging in.
#[derive(Args, Debug, Clone, Default)]
pub struct Credentials {
    #[arg(long, env = "PROBE_USERNAME", help = "Username to log in with")]
    pub username: Option<String>,

    #[arg(long, env = "PROBE_PASSWORD", hide_env_values = true, help = "Password to log in with")]
    pub password: Option<String>,

    #[arg(long, env = "PROBE_TOKEN", hide_env_values = true, help = "Use this token instead of logging in")]
    pub token: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct RetryArgs {
    #[arg(long, default_value_t = 0, help = "Repeat failed HTTP calls this many times")]
    pub retries: u32,

    #[arg(long, default_value_t = 2, help = "Seconds to wait between retries")]
    pub delay_secs: u64,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Log in and print the issued token")]
    Login {
        #[command(flatten)]
        credentials: Credentials,
    },

    #[command(about = "Show the claims the server sees for a token")]
    Whoami {
        #[command(flatten)]
        credentials: Credentials,
    },

    #[command(about = "Decode a token's claim set (verifies the signature when a secret is given)")]
    Decode {
        #[arg(help = "Token to decode")]
        token: String,
        #[arg(long, env = "JWT_SECRET", hide_env_values = true, help = "Verify with this secret")]
        secret: Option<String>,
    },

    #[command(about = "Mint a token with an arbitrary claim set")]
    Forge(commands::token::ForgeArgs),

    #[command(about = "Hash a password for a user seed file")]
    HashPassword {
        #[arg(long, env = "PROBE_PASSWORD", hide_env_values = true)]
        password: String,
    },

    #[command(about = "Call one protected action and compare the status with the policy")]
    Check(commands::check::CheckArgs),

    #[command(about = "Run every action for every account and compare with the policy")]
    Matrix(commands::matrix::MatrixArgs),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

/// Policy the probe predicts statuses with: defaults plus the same
/// `POLICY_*` overrides the server reads.
pub fn probe_policy() -> anyhow::Result<Policy> {
    Ok(Policy::default().with_overrides(|key| std::env::var(key).ok())?)
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);
    let server = cli.server;

    match cli.command {
        Commands::Login { credentials } => {
            commands::login::handle_login(&server, credentials, output_format).await
        }
        Commands::Whoami { credentials } => {
            commands::login::handle_whoami(&server, credentials, output_format).await
        }
        Commands::Decode { token, secret } => {
            commands::token::handle_decode(&token, secret.as_deref(), output_format)
        }
        Commands::Forge(args) => commands::token::handle_forge(args, output_format),
        Commands::HashPassword { password } => {
            commands::token::handle_hash_password(&password, output_format)
        }
        Commands::Check(args) => commands::check::handle(&server, args, output_format).await,
        Commands::Matrix(args) => commands::matrix::handle(&server, args, output_format).await,
    }
}
