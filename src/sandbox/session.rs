//! Sandbox session record
//!
//! A session is the live record of one provisioned container. Everything but
//! `state` is fixed at creation. Endpoint URLs are computed on every call
//! from the port map and token so they can never drift from them.

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;

use super::types::{SandboxState, SandboxType, PRIMARY_CONTAINER_PORT};

/// One provisioned sandbox instance
#[derive(Debug, Clone, Serialize)]
pub struct SandboxSession {
    /// Registry key
    pub sandbox_type: SandboxType,
    /// Opaque id namespacing the mount directory
    pub session_id: String,
    /// Runtime-assigned container id
    pub container_id: String,
    /// Container name handed to the runtime
    pub container_name: String,
    /// Container port -> host port
    pub host_port_map: BTreeMap<u16, u16>,
    /// Host directory bound into the container
    pub mount_dir: PathBuf,
    /// Host name used in endpoint URLs
    pub endpoint_host: String,
    /// Bearer token for the in-container API
    #[serde(skip_serializing)]
    pub auth_token: SecretString,
    /// Lifecycle state
    pub state: SandboxState,
    /// Creation time
    pub created_at: DateTime<Utc>,
}

impl SandboxSession {
    /// Host port mapped to the sandbox's HTTP service
    pub fn primary_port(&self) -> Option<u16> {
        self.host_port_map.get(&PRIMARY_CONTAINER_PORT).copied()
    }

    /// `host:port` authority of the HTTP service
    pub fn authority(&self) -> String {
        match self.primary_port() {
            Some(port) => format!("{}:{}", self.endpoint_host, port),
            None => self.endpoint_host.clone(),
        }
    }

    /// Root of the tool API, e.g. `http://localhost:8003/fastapi`
    pub fn base_url(&self) -> String {
        format!("http://{}/fastapi", self.authority())
    }

    /// Model-context-protocol endpoint
    pub fn mcp_url(&self) -> String {
        format!("http://{}/mcp", self.authority())
    }

    /// Browser desktop served over noVNC
    pub fn desktop_url(&self) -> String {
        format!(
            "http://{}/vnc/vnc_lite.html?password={}",
            self.authority(),
            self.auth_token.expose_secret()
        )
    }

    /// Websocket streaming the browser screen
    pub fn cast_ws_url(&self) -> String {
        format!(
            "ws://{}/ws/cast?token={}",
            self.authority(),
            self.auth_token.expose_secret()
        )
    }

    /// Artifact store for files produced in the sandbox
    pub fn artifacts_url(&self) -> String {
        format!("http://{}/artifacts", self.authority())
    }
}

#[cfg(test)]
pub(crate) fn sample_session(port: u16) -> SandboxSession {
    SandboxSession {
        sandbox_type: SandboxType::Base,
        session_id: "0123456789abcdef0123456789abcdef".to_string(),
        container_id: "abc123".to_string(),
        container_name: "sandbox-base-0123456789ab".to_string(),
        host_port_map: BTreeMap::from([(PRIMARY_CONTAINER_PORT, port)]),
        mount_dir: PathBuf::from("/tmp/sessions_mount_dir/0123456789abcdef0123456789abcdef"),
        endpoint_host: "localhost".to_string(),
        auth_token: SecretString::from("tok3n".to_string()),
        state: SandboxState::Created,
        created_at: Utc::now(),
    }
}
