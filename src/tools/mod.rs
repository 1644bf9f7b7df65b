//! Tools module - function-calling surface over the execution bridge
//!
//! Each tool implements the `Tool` trait and is registered into a
//! `ToolRegistry`.
//!
//! ## Built-in Tools
//!
//! - **run_ipython_cell**: Run Python code in a sandbox's IPython kernel
//! - **run_shell_command**: Run a shell command in a sandbox

mod registry;
mod sandbox_exec;
mod traits;

// Core trait and types
pub use traits::{FunctionDefinition, Tool, ToolCall, ToolDefinition, ToolResult};

// Registry
pub use registry::ToolRegistry;

// Built-in tools
pub use sandbox_exec::{RunIpythonCellTool, RunShellCommandTool};
