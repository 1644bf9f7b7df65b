//! Container lifecycle adapter boundary

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};

use super::types::{RuntimeProfile, SandboxType, VolumeBinding};
use crate::error::Result;

/// Status token the bridge waits for
pub const STATUS_RUNNING: &str = "running";

/// Everything the runtime needs to create one sandbox container
#[derive(Debug, Clone)]
pub struct ContainerSpec {
    /// Sandbox type the container belongs to
    pub sandbox_type: SandboxType,
    /// Container name
    pub name: String,
    /// Image reference
    pub image: String,
    /// Ports the container exposes
    pub ports: Vec<u16>,
    /// Container port -> host port
    pub port_map: BTreeMap<u16, u16>,
    /// Host directories to bind
    pub volumes: Vec<VolumeBinding>,
    /// Environment variables
    pub env: HashMap<String, String>,
    /// Runtime to run the container under
    pub runtime: RuntimeProfile,
}

/// Create/start/stop/remove/inspect against a container runtime.
///
/// Implementations must be safe to call concurrently; the registry shares one
/// adapter across every sandbox type.
#[async_trait]
pub trait ContainerAdapter: Send + Sync {
    /// Adapter name
    fn name(&self) -> &str;

    /// Create a container and return its id
    async fn create(&self, spec: &ContainerSpec) -> Result<String>;

    /// Start a container
    async fn start(&self, container_id: &str) -> Result<()>;

    /// Stop a container
    async fn stop(&self, container_id: &str) -> Result<()>;

    /// Remove a container
    async fn remove(&self, container_id: &str) -> Result<()>;

    /// Raw runtime status, e.g. "running" or "exited"
    async fn status(&self, container_id: &str) -> Result<String>;
}
