pub mod check;
pub mod login;
pub mod matrix;
pub mod token;

use serde::Serialize;
use thiserror::Error;

use crate::cli::client::ProbeResponse;
use crate::policy::Action;

/// Observed statuses disagreed with the policy; the CLI exits non-zero.
#[derive(Debug, Error)]
#[error("{mismatches} of {total} checks did not match the policy")]
pub struct Mismatch {
    pub mismatches: usize,
    pub total: usize,
}

/// Observed vs expected status for one (account, action) pair.
#[derive(Debug, Clone, Serialize)]
pub struct ProbeOutcome {
    pub account: String,
    pub role: Option<String>,
    pub action: Action,
    pub method: String,
    pub path: String,
    pub expected: u16,
    pub actual: u16,
    pub code: Option<String>,
    pub ok: bool,
}

impl ProbeOutcome {
    pub fn new(
        account: &str,
        role: Option<String>,
        action: Action,
        expected: u16,
        response: &ProbeResponse,
    ) -> Self {
        Self {
            account: account.to_string(),
            role,
            action,
            method: action.method().to_string(),
            path: action.probe_path(),
            expected,
            actual: response.status,
            code: response.error_code().map(str::to_string),
            ok: expected == response.status,
        }
    }

    /// One aligned text line.
    pub fn to_line(&self) -> String {
        format!(
            "{} {:<10} {:<8} {:<16} expected {} got {}{}",
            if self.ok { "✓" } else { "✗" },
            self.account,
            self.role.as_deref().unwrap_or("-"),
            self.action.name(),
            self.expected,
            self.actual,
            self.code
                .as_deref()
                .map(|c| format!(" ({})", c))
                .unwrap_or_default()
        )
    }
}
