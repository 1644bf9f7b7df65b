//! Configuration module
//!
//! - types/mod.rs: Root `Config`
//! - types/sandbox.rs: Sandbox pool configuration
//! - types/bridge.rs: Execution bridge configuration
//! - io.rs: Configuration loading and saving
//! - validation.rs: Configuration validation
//! - paths.rs: Configuration file paths

mod io;
mod paths;
mod types;
mod validation;

// Re-export config types
pub use types::bridge::{BridgeConfig, ReadinessConfig};
pub use types::sandbox::SandboxConfig;
pub use types::Config;

// Re-export IO and utilities
pub use io::{
    apply_env_overrides, apply_overrides_from, load_config, load_config_from_path,
    load_config_with, read_config_snapshot, save_config, ConfigSnapshot,
};
pub use paths::{config_dir, config_path};
pub use validation::{validate_config, ConfigValidationResult, ValidationIssue};
