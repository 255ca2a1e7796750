use serde::Serialize;
use serde_json::{json, Value};

use crate::cli::OutputFormat;

/// Output a success message in the appropriate format
pub fn output_success(
    output_format: &OutputFormat,
    message: &str,
    data: Option<Value>,
) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            let mut response = json!({
                "success": true,
                "message": message
            });

            if let (Some(target), Some(Value::Object(extra))) = (response.as_object_mut(), data) {
                target.extend(extra);
            }

            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        OutputFormat::Text => {
            println!("✓ {}", message);
        }
    }
    Ok(())
}

/// Report a failed command: a JSON error document on stdout, or a line on
/// stderr in text mode.
pub fn output_error(
    output_format: &OutputFormat,
    message: &str,
    error_code: Option<&str>,
) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&error_document(message, error_code))?);
        }
        OutputFormat::Text => match error_code {
            Some(code) => eprintln!("Error [{}]: {}", code, message),
            None => eprintln!("Error: {}", message),
        },
    }
    Ok(())
}

/// Same shape as the API's error envelope.
fn error_document(message: &str, error_code: Option<&str>) -> Value {
    let mut response = json!({
        "success": false,
        "error": message
    });
    if let Some(code) = error_code {
        response["code"] = json!(code);
    }
    response
}

/// Machine code for a CLI failure, when it has one.
pub fn error_code(err: &anyhow::Error) -> Option<&'static str> {
    if err.downcast_ref::<crate::cli::commands::Mismatch>().is_some() {
        Some("POLICY_MISMATCH")
    } else if err.downcast_ref::<reqwest::Error>().is_some() {
        Some("UNREACHABLE")
    } else {
        None
    }
}

/// Print `key: value` lines in text mode, or the whole value as JSON
pub fn output_fields<T: Serialize>(
    output_format: &OutputFormat,
    fields: &[(&str, String)],
    value: &T,
) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(value)?);
        }
        OutputFormat::Text => {
            let width = fields.iter().map(|(k, _)| k.len()).max().unwrap_or(0);
            for (key, val) in fields {
                println!("{:width$}  {}", key, val, width = width);
            }
        }
    }
    Ok(())
}

/// Render a unix timestamp for text output
pub fn format_timestamp(ts: i64) -> String {
    chrono::DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.to_rfc3339())
        .unwrap_or_else(|| ts.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_documents_match_api_envelope() {
        let doc = error_document("2 of 24 checks did not match the policy", Some("POLICY_MISMATCH"));
        assert_eq!(doc["success"], false);
        assert_eq!(doc["code"], "POLICY_MISMATCH");
        assert!(error_document("boom", None).get("code").is_none());
    }

    #[test]
    fn classifies_cli_errors() {
        let mismatch = anyhow::Error::from(crate::cli::commands::Mismatch {
            mismatches: 1,
            total: 3,
        });
        assert_eq!(error_code(&mismatch), Some("POLICY_MISMATCH"));
        assert_eq!(error_code(&mismatch.context("matrix")), Some("POLICY_MISMATCH"));
        assert_eq!(error_code(&anyhow::anyhow!("bad flag")), None);
    }

    #[test]
    fn formats_timestamps() {
        assert_eq!(format_timestamp(0), "1970-01-01T00:00:00+00:00");
        assert_eq!(format_timestamp(i64::MAX), i64::MAX.to_string());
    }
}
