//! Sandbox execution tools
//!
//! `run_ipython_cell` and `run_shell_command` forward their payload through
//! the execution bridge. Bridge failures come back as a failed `ToolResult`
//! carrying the rendered failure payload, never as an `Err`.

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::debug;

use super::traits::{Tool, ToolResult};
use crate::bridge::{ExecutionBridge, ExecutionKind};
use crate::error::{Error, Result};
use crate::sandbox::SandboxType;

fn schema(kind: ExecutionKind, payload_description: &str) -> Value {
    let types: Vec<&str> = SandboxType::ALL.iter().map(|t| t.as_str()).collect();
    let mut properties = Map::new();
    properties.insert(
        kind.payload_field().to_string(),
        json!({
            "type": "string",
            "description": payload_description
        }),
    );
    properties.insert(
        "sandbox_type".to_string(),
        json!({
            "type": "string",
            "enum": types,
            "description": "Sandbox to run in (defaults to the tool's configured type)"
        }),
    );

    json!({
        "type": "object",
        "properties": properties,
        "required": [kind.payload_field()]
    })
}

async fn run(
    bridge: &ExecutionBridge,
    default_type: SandboxType,
    kind: ExecutionKind,
    args: Value,
) -> Result<ToolResult> {
    let field = kind.payload_field();
    let payload = args
        .get(field)
        .and_then(|v| v.as_str())
        .ok_or_else(|| Error::InvalidInput(format!("Missing '{}' parameter", field)))?;

    let sandbox_type = match args.get("sandbox_type").and_then(|v| v.as_str()) {
        Some(name) => name.parse::<SandboxType>()?,
        None => default_type,
    };

    debug!("{} tool call on {} sandbox", kind, sandbox_type);

    match bridge.try_execute(sandbox_type, kind, payload).await {
        Ok(output) => Ok(ToolResult::success(output)),
        Err(e) => Ok(ToolResult::failure(e.to_failure().render())),
    }
}

/// Built-in tool: run a cell in the sandbox's IPython kernel
pub struct RunIpythonCellTool {
    bridge: Arc<ExecutionBridge>,
    default_type: SandboxType,
}

impl RunIpythonCellTool {
    pub fn new(bridge: Arc<ExecutionBridge>, default_type: SandboxType) -> Self {
        RunIpythonCellTool {
            bridge,
            default_type,
        }
    }
}

#[async_trait]
impl Tool for RunIpythonCellTool {
    fn name(&self) -> &str {
        ExecutionKind::IpythonCell.tool_name()
    }

    fn description(&self) -> &str {
        "Run Python code in an isolated sandbox's IPython kernel and return its output"
    }

    fn parameters_schema(&self) -> Value {
        schema(ExecutionKind::IpythonCell, "Python code to execute")
    }

    async fn execute(&self, args: Value) -> Result<ToolResult> {
        run(&self.bridge, self.default_type, ExecutionKind::IpythonCell, args).await
    }
}

/// Built-in tool: run a shell command in the sandbox
pub struct RunShellCommandTool {
    bridge: Arc<ExecutionBridge>,
    default_type: SandboxType,
}

impl RunShellCommandTool {
    pub fn new(bridge: Arc<ExecutionBridge>, default_type: SandboxType) -> Self {
        RunShellCommandTool {
            bridge,
            default_type,
        }
    }
}

#[async_trait]
impl Tool for RunShellCommandTool {
    fn name(&self) -> &str {
        ExecutionKind::ShellCommand.tool_name()
    }

    fn description(&self) -> &str {
        "Run a shell command in an isolated sandbox and return its output"
    }

    fn parameters_schema(&self) -> Value {
        schema(ExecutionKind::ShellCommand, "Shell command to execute")
    }

    async fn execute(&self, args: Value) -> Result<ToolResult> {
        run(&self.bridge, self.default_type, ExecutionKind::ShellCommand, args).await
    }
}
