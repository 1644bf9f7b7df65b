//! Execution kinds and their HTTP shape

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use url::Url;

use super::error::ExecutionError;
use crate::sandbox::SandboxSession;

/// What the sandbox is asked to run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionKind {
    /// A cell in the sandbox's IPython kernel
    IpythonCell,
    /// A shell command
    ShellCommand,
}

impl ExecutionKind {
    /// Tool name, also the last path segment of the endpoint
    pub fn tool_name(&self) -> &'static str {
        match self {
            ExecutionKind::IpythonCell => "run_ipython_cell",
            ExecutionKind::ShellCommand => "run_shell_command",
        }
    }

    /// JSON field carrying the payload
    pub fn payload_field(&self) -> &'static str {
        match self {
            ExecutionKind::IpythonCell => "code",
            ExecutionKind::ShellCommand => "command",
        }
    }

    /// Request body for a payload
    pub fn body(&self, payload: &str) -> Value {
        let mut body = Map::new();
        body.insert(
            self.payload_field().to_string(),
            Value::String(payload.to_string()),
        );
        Value::Object(body)
    }

    /// Endpoint for this kind on a session
    pub fn endpoint(&self, session: &SandboxSession) -> Result<Url, ExecutionError> {
        let base = format!("{}/", session.base_url().trim_end_matches('/'));
        Url::parse(&base)
            .and_then(|base| base.join(&format!("tools/{}", self.tool_name())))
            .map_err(|e| ExecutionError::Request(format!("Invalid sandbox URL {}: {}", base, e)))
    }
}

impl std::fmt::Display for ExecutionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tool_name())
    }
}
