//! Errors - エラー型と分類
//!
//! - `SessionError`: ローカルの前提条件違反（channel には流さない）
//! - `TransportError`: envelope の送出失敗
//! - `ExecutionError`: リモート task 実行の失敗（HTTP / network）

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to serialize envelope: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum SessionError {
    /// An outbound operation was attempted before any INIT established a run.
    #[error("no active run: INIT has not been received")]
    MissingRunContext,

    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Code used when no HTTP response was obtained.
pub const NETWORK_ERROR: &str = "NETWORK_ERROR";

/// Code used when a 2xx body could not be decoded into the requested shape.
pub const INVALID_RESPONSE: &str = "INVALID_RESPONSE";

/// Normalized failure of a remote task invocation.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[error("{code}: {message}")]
pub struct ExecutionError {
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ExecutionError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn network(description: impl Into<String>) -> Self {
        Self::new(NETWORK_ERROR, description)
    }

    /// Build from a non-2xx response. Missing fields fall back to
    /// `HTTP_<status>` and a generic message.
    pub fn from_http_failure(status: u16, body: &str) -> Self {
        let parsed: Option<serde_json::Value> = serde_json::from_str(body).ok();

        let field = |name: &str| -> Option<String> {
            parsed
                .as_ref()
                .and_then(|v| v.get(name))
                .and_then(serde_json::Value::as_str)
                .map(str::to_string)
        };

        let code = field("code").unwrap_or_else(|| format!("HTTP_{status}"));
        let message =
            field("message").unwrap_or_else(|| format!("Request failed with status {status}"));

        let details = match parsed {
            Some(serde_json::Value::Object(mut obj)) => match obj.remove("details") {
                Some(details) => Some(details),
                None => Some(serde_json::Value::Object(obj)),
            },
            Some(other) => Some(other),
            None if body.trim().is_empty() => None,
            None => Some(serde_json::Value::String(body.to_string())),
        };

        Self {
            code,
            message,
            details,
        }
    }
}
