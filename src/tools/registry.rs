//! Tool registry - maps tool names to implementations

use std::collections::HashMap;
use std::sync::Arc;

use crate::bridge::ExecutionBridge;
use crate::error::Result;
use crate::sandbox::SandboxType;

use super::sandbox_exec::{RunIpythonCellTool, RunShellCommandTool};
use super::traits::{Tool, ToolCall, ToolDefinition, ToolResult};

/// Registry of available tools
pub struct ToolRegistry {
    tools: HashMap<String, Box<dyn Tool>>,
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        ToolRegistry {
            tools: HashMap::new(),
        }
    }

    /// Registry holding both sandbox execution tools
    pub fn with_sandbox_tools(bridge: Arc<ExecutionBridge>, default_type: SandboxType) -> Self {
        let mut registry = Self::new();
        registry.register(RunIpythonCellTool::new(bridge.clone(), default_type));
        registry.register(RunShellCommandTool::new(bridge, default_type));
        registry
    }

    /// Register a tool
    pub fn register<T: Tool + 'static>(&mut self, tool: T) {
        self.tools.insert(tool.name().to_string(), Box::new(tool));
    }

    /// Get a tool by name
    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.tools.get(name).map(|t| t.as_ref())
    }

    /// Get all tool definitions
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.values().map(|t| t.to_definition()).collect()
    }

    /// Execute a tool call
    pub async fn execute(&self, call: &ToolCall) -> Result<ToolResult> {
        match self.get(&call.name) {
            Some(tool) => tool.execute(call.arguments.clone()).await,
            None => Ok(ToolResult::failure(format!("Unknown tool: {}", call.name))),
        }
    }

    /// Get tool count
    pub fn count(&self) -> usize {
        self.tools.len()
    }

    /// List tool names
    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(|s| s.as_str()).collect()
    }
}
