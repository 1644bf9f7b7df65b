//! Configuration types module

pub mod bridge;
pub mod sandbox;

use serde::{Deserialize, Serialize};

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Sandbox pool configuration
    #[serde(default)]
    pub sandbox: sandbox::SandboxConfig,

    /// Execution bridge configuration
    #[serde(default)]
    pub bridge: bridge::BridgeConfig,
}

impl Config {
    /// Load configuration from the config file and environment
    ///
    /// Layers, lowest first:
    /// 1. Default values
    /// 2. Config file (if present)
    /// 3. Environment variable overrides
    pub fn from_env() -> crate::error::Result<Self> {
        crate::config::load_config()
    }
}
