//! # Sandpool
//!
//! A pool of per-type container sandboxes with an authenticated execution
//! bridge into them.
//!
//! ## Features
//!
//! - **One sandbox per type:** lazily provisioned, cached, serialized per type
//! - **Credentialed sessions:** fresh bearer token and mount directory per sandbox
//! - **Docker backend:** bollard-driven lifecycle with optional gVisor runtime
//! - **Execution bridge:** run IPython cells and shell commands over HTTP
//! - **Tool surface:** function-calling tools backed by the bridge

pub mod bridge;
pub mod config;
pub mod error;
pub mod sandbox;
pub mod tools;

pub use bridge::{ExecutionBridge, ExecutionError, ExecutionKind};
pub use config::Config;
pub use error::{Error, Result};
pub use sandbox::{SandboxManager, SandboxSession, SandboxType};

/// Application version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const NAME: &str = env!("CARGO_PKG_NAME");
