//! Result normalization
//!
//! Functions answer either with a bare JSON result or with an HTTP-style
//! envelope `{"statusCode": 200, "body": ...}` whose body may itself be a
//! JSON-encoded string. Both strategies funnel their parsed output through
//! [`normalize`] so that callers see one success/failure contract.

use serde_json::Value;

use crate::error::{GatewayError, Result};

/// Unwraps an optional envelope and turns reported errors into failures
pub(crate) fn normalize(function: &str, raw: Value) -> Result<Value> {
    let result = match raw.get("statusCode") {
        Some(code) => {
            let body = decode_body(raw.get("body").cloned().unwrap_or(Value::Null));
            let status = code.as_u64().unwrap_or(0);
            if status != 200 {
                return Err(GatewayError::Application {
                    function: function.to_string(),
                    error_type: error_type(&body),
                    message: error_message(&body)
                        .unwrap_or_else(|| format!("function returned status code {}", code)),
                });
            }
            body
        }
        None => raw,
    };

    if let Some(error) = result.get("error").filter(|e| !e.is_null()) {
        return Err(GatewayError::Application {
            function: function.to_string(),
            error_type: error_type(&result),
            message: describe_error(error),
        });
    }

    Ok(result)
}

/// Parses a process's standard output, falling back to its last non-empty line
pub(crate) fn parse_output(function: &str, stdout: &str) -> Result<Value> {
    let trimmed = stdout.trim();
    if trimmed.is_empty() {
        return Err(GatewayError::Parse {
            function: function.to_string(),
            message: "function produced no output".to_string(),
        });
    }

    if let Ok(value) = serde_json::from_str(trimmed) {
        return Ok(value);
    }

    // Functions may print diagnostics before the result line
    let last_line = trimmed.lines().rev().find(|line| !line.trim().is_empty());
    last_line
        .and_then(|line| serde_json::from_str(line.trim()).ok())
        .ok_or_else(|| GatewayError::Parse {
            function: function.to_string(),
            message: format!("output is not JSON: {}", truncate(trimmed, 200)),
        })
}

fn decode_body(body: Value) -> Value {
    match body {
        Value::String(text) => serde_json::from_str(&text).unwrap_or(Value::String(text)),
        other => other,
    }
}

fn error_message(body: &Value) -> Option<String> {
    match body {
        Value::String(text) if !text.is_empty() => Some(text.clone()),
        _ => body
            .get("error")
            .or_else(|| body.get("message"))
            .filter(|e| !e.is_null())
            .map(describe_error),
    }
}

fn error_type(body: &Value) -> Option<String> {
    body.get("errorType")
        .or_else(|| body.get("error_type"))
        .or_else(|| body.get("error").and_then(|e| e.get("type")))
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn describe_error(error: &Value) -> String {
    match error {
        Value::String(message) => message.clone(),
        _ => error
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| error.to_string()),
    }
}

pub(crate) fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut truncated: String = text.chars().take(max_chars).collect();
    truncated.push_str("...");
    truncated
}
