//! Sandbox identity and lifecycle types

use serde::{Deserialize, Serialize};

/// Port the in-container HTTP service listens on
pub const PRIMARY_CONTAINER_PORT: u16 = 80;

/// Kind of sandbox; selects the container image and endpoint shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SandboxType {
    /// Minimal image with a shell and an IPython kernel
    Base,
    /// Python toolchain
    Python,
    /// Node.js toolchain
    Node,
    /// JVM toolchain
    Java,
    /// Headless browser with a VNC desktop
    Browser,
    /// File manipulation only
    Filesystem,
}

impl SandboxType {
    /// Every sandbox type, in declaration order
    pub const ALL: [SandboxType; 6] = [
        SandboxType::Base,
        SandboxType::Python,
        SandboxType::Node,
        SandboxType::Java,
        SandboxType::Browser,
        SandboxType::Filesystem,
    ];

    /// Stable index into per-type tables
    pub(crate) fn index(self) -> usize {
        self as usize
    }

    /// Lowercase name used in container names and config keys
    pub fn as_str(&self) -> &'static str {
        match self {
            SandboxType::Base => "base",
            SandboxType::Python => "python",
            SandboxType::Node => "node",
            SandboxType::Java => "java",
            SandboxType::Browser => "browser",
            SandboxType::Filesystem => "filesystem",
        }
    }

    /// Image from the built-in table, if this type has one
    pub fn builtin_image(&self) -> Option<&'static str> {
        match self {
            SandboxType::Base => Some("sandpool/runtime-base:latest"),
            SandboxType::Python => Some("sandpool/runtime-python:latest"),
            SandboxType::Node => Some("sandpool/runtime-node:latest"),
            SandboxType::Java => Some("sandpool/runtime-java:latest"),
            SandboxType::Browser => Some("sandpool/runtime-browser:latest"),
            SandboxType::Filesystem => None,
        }
    }

    /// Container ports the sandbox image exposes
    pub fn container_ports(&self) -> Vec<u16> {
        vec![PRIMARY_CONTAINER_PORT]
    }
}

impl std::str::FromStr for SandboxType {
    type Err = crate::error::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "base" => Ok(SandboxType::Base),
            "python" | "py" => Ok(SandboxType::Python),
            "node" | "nodejs" | "js" => Ok(SandboxType::Node),
            "java" | "jvm" => Ok(SandboxType::Java),
            "browser" => Ok(SandboxType::Browser),
            "filesystem" | "fs" => Ok(SandboxType::Filesystem),
            _ => Err(crate::error::Error::InvalidInput(format!(
                "Unknown sandbox type: {}. Supported: base, python, node, java, browser, filesystem",
                s
            ))),
        }
    }
}

impl std::fmt::Display for SandboxType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle state of a provisioned sandbox
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SandboxState {
    /// Container exists but was never started
    Created,
    /// Container was started
    Running,
    /// Container was stopped; may be started again
    Stopped,
    /// Container is gone; terminal
    Removed,
}

impl SandboxState {
    /// Whether the state machine allows moving from `self` to `next`
    pub fn can_transition_to(&self, next: SandboxState) -> bool {
        use SandboxState::*;
        match (self, next) {
            (Removed, _) => false,
            (_, Removed) => true,
            (Created | Stopped | Running, Running) => true,
            (Running | Stopped, Stopped) => true,
            _ => false,
        }
    }
}

impl std::fmt::Display for SandboxState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SandboxState::Created => write!(f, "created"),
            SandboxState::Running => write!(f, "running"),
            SandboxState::Stopped => write!(f, "stopped"),
            SandboxState::Removed => write!(f, "removed"),
        }
    }
}

/// Container runtime selection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeProfile {
    /// Whatever the daemon's default runtime is
    #[default]
    Standard,
    /// gVisor user-space kernel
    Gvisor,
}

impl RuntimeProfile {
    /// Runtime name to hand to the container runtime, `None` for the default
    pub fn runtime_name(&self) -> Option<&'static str> {
        match self {
            RuntimeProfile::Standard => None,
            RuntimeProfile::Gvisor => Some("runsc"),
        }
    }
}

impl std::str::FromStr for RuntimeProfile {
    type Err = crate::error::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "standard" | "runc" | "default" => Ok(RuntimeProfile::Standard),
            "gvisor" | "runsc" => Ok(RuntimeProfile::Gvisor),
            _ => Err(crate::error::Error::Config(format!(
                "Invalid runtime profile: {}. Valid: standard, gvisor",
                s
            ))),
        }
    }
}

/// Host directory bound into a container
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeBinding {
    /// Absolute host path
    pub host_path: String,
    /// Path inside the container
    pub container_path: String,
    /// Mount read-only
    #[serde(default)]
    pub readonly: bool,
}

impl VolumeBinding {
    /// Docker bind string, `host:container:rw|ro`
    pub fn to_bind(&self) -> String {
        format!(
            "{}:{}:{}",
            self.host_path,
            self.container_path,
            if self.readonly { "ro" } else { "rw" }
        )
    }
}
