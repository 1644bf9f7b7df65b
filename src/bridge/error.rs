//! Execution failures and their tool-facing rendering

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Category of an execution failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionErrorKind {
    /// Provisioning or starting the sandbox failed
    Sandbox,
    /// The sandbox did not become reachable in time
    NotReady,
    /// The request exceeded its timeout
    Timeout,
    /// Nothing accepted the connection
    Connection,
    /// The sandbox answered with a non-2xx status
    HttpStatus,
    /// Any other transport or URL problem
    Request,
}

/// Structured failure of one bridge call
#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("sandbox unavailable: {0}")]
    Sandbox(#[from] crate::error::Error),

    #[error("sandbox not ready within {timeout:?} (last observed: {last_status})")]
    NotReady {
        timeout: Duration,
        last_status: String,
    },

    #[error("request to {url} timed out after {timeout:?}")]
    Timeout { url: String, timeout: Duration },

    #[error("could not connect to {url}: {message}")]
    Connection { url: String, message: String },

    #[error("sandbox returned HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("request error: {0}")]
    Request(String),
}

impl ExecutionError {
    /// Classify a transport error, keeping timeouts apart from refusals
    pub fn from_reqwest(url: &str, timeout: Duration, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ExecutionError::Timeout {
                url: url.to_string(),
                timeout,
            }
        } else if err.is_connect() {
            ExecutionError::Connection {
                url: url.to_string(),
                message: err.to_string(),
            }
        } else {
            ExecutionError::Request(err.to_string())
        }
    }

    /// Kind tag
    pub fn kind(&self) -> ExecutionErrorKind {
        match self {
            ExecutionError::Sandbox(_) => ExecutionErrorKind::Sandbox,
            ExecutionError::NotReady { .. } => ExecutionErrorKind::NotReady,
            ExecutionError::Timeout { .. } => ExecutionErrorKind::Timeout,
            ExecutionError::Connection { .. } => ExecutionErrorKind::Connection,
            ExecutionError::HttpStatus { .. } => ExecutionErrorKind::HttpStatus,
            ExecutionError::Request(_) => ExecutionErrorKind::Request,
        }
    }

    /// Tool-facing failure value
    pub fn to_failure(&self) -> ExecutionFailure {
        ExecutionFailure {
            result: "error".to_string(),
            kind: self.kind(),
            message: format!("Execution failed: {}", self),
        }
    }
}

/// Failure payload returned to tool callers in place of an exception
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionFailure {
    /// Always "error"
    pub result: String,
    /// What went wrong
    pub kind: ExecutionErrorKind,
    /// Human-readable description, starts with "Execution failed"
    pub message: String,
}

impl ExecutionFailure {
    /// JSON text of the payload
    pub fn render(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| self.message.clone())
    }
}
