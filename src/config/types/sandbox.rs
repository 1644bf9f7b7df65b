//! Sandbox configuration types
//!
//! Image selection, port scanning, mounts and container runtime settings.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use crate::sandbox::{
    RuntimeProfile, SandboxType, DEFAULT_PORT_RANGE_START, DEFAULT_PORT_SCAN_ATTEMPTS,
};

/// Sandbox configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SandboxConfig {
    /// Root for per-session mount directories, relative to the working directory
    #[serde(default = "default_mount_root")]
    pub mount_root: PathBuf,
    /// Host name used in sandbox endpoint URLs
    #[serde(default = "default_endpoint_host")]
    pub endpoint_host: String,
    /// First host port probed
    #[serde(default = "default_port_range_start")]
    pub port_range_start: u16,
    /// Number of host ports probed per allocation
    #[serde(default = "default_port_scan_attempts")]
    pub port_scan_attempts: u16,
    /// Container runtime profile
    #[serde(default)]
    pub runtime: RuntimeProfile,
    /// Image for types without an explicit mapping
    #[serde(default = "default_image")]
    pub default_image: String,
    /// Per-type image overrides
    #[serde(default)]
    pub images: HashMap<SandboxType, String>,
    /// Working directory inside the container
    #[serde(default = "default_workdir")]
    pub workdir: String,
    /// Environment variable carrying the auth token into the container
    #[serde(default = "default_token_env_var")]
    pub token_env_var: String,
    /// Seconds the runtime waits before killing on stop
    #[serde(default = "default_stop_timeout")]
    pub stop_timeout_secs: u64,
    /// Pull missing images on create
    #[serde(default = "default_true")]
    pub pull_images: bool,
    /// Upper bound for one image pull
    #[serde(with = "humantime_serde", default = "default_pull_timeout")]
    pub pull_timeout: Duration,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        SandboxConfig {
            mount_root: default_mount_root(),
            endpoint_host: default_endpoint_host(),
            port_range_start: default_port_range_start(),
            port_scan_attempts: default_port_scan_attempts(),
            runtime: RuntimeProfile::default(),
            default_image: default_image(),
            images: HashMap::new(),
            workdir: default_workdir(),
            token_env_var: default_token_env_var(),
            stop_timeout_secs: default_stop_timeout(),
            pull_images: true,
            pull_timeout: default_pull_timeout(),
        }
    }
}

impl SandboxConfig {
    /// Image for a sandbox type: override, then built-in table, then default
    pub fn image_for(&self, sandbox_type: SandboxType) -> String {
        self.images
            .get(&sandbox_type)
            .cloned()
            .or_else(|| sandbox_type.builtin_image().map(str::to_string))
            .unwrap_or_else(|| self.default_image.clone())
    }
}

fn default_mount_root() -> PathBuf {
    PathBuf::from("sessions_mount_dir")
}

fn default_endpoint_host() -> String {
    "localhost".to_string()
}

fn default_port_range_start() -> u16 {
    DEFAULT_PORT_RANGE_START
}

fn default_port_scan_attempts() -> u16 {
    DEFAULT_PORT_SCAN_ATTEMPTS
}

fn default_image() -> String {
    "sandpool/runtime-base:latest".to_string()
}

fn default_workdir() -> String {
    "/workspace".to_string()
}

fn default_token_env_var() -> String {
    "SANDBOX_AUTH_TOKEN".to_string()
}

fn default_stop_timeout() -> u64 {
    10
}

fn default_true() -> bool {
    true
}

fn default_pull_timeout() -> Duration {
    Duration::from_secs(600)
}
