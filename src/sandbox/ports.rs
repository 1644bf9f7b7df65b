//! Host port allocation
//!
//! Ports are found by binding a throwaway listener and releasing it at once.
//! Nothing holds the port afterwards, so another process may grab it before
//! the container runtime binds it. That window is accepted.

use std::collections::{BTreeMap, HashSet};
use std::net::TcpListener;

use tracing::debug;

use crate::error::{Error, Result};

/// Default first candidate port
pub const DEFAULT_PORT_RANGE_START: u16 = 8000;

/// Default number of candidates probed per batch
pub const DEFAULT_PORT_SCAN_ATTEMPTS: u16 = 1000;

/// Maps container ports to free host ports
pub trait PortAllocator: Send + Sync {
    /// Allocate one distinct host port per container port
    fn allocate(&self, container_ports: &[u16]) -> Result<BTreeMap<u16, u16>>;
}

/// Scans a bounded window and probes each candidate with a bind
#[derive(Debug, Clone)]
pub struct ProbingPortAllocator {
    start: u16,
    attempts: u16,
}

impl Default for ProbingPortAllocator {
    fn default() -> Self {
        Self::new(DEFAULT_PORT_RANGE_START, DEFAULT_PORT_SCAN_ATTEMPTS)
    }
}

impl ProbingPortAllocator {
    /// Create an allocator scanning `attempts` ports starting at `start`
    pub fn new(start: u16, attempts: u16) -> Self {
        Self { start, attempts }
    }

    fn candidates(&self) -> impl Iterator<Item = u16> {
        let end = self.start.saturating_add(self.attempts);
        self.start..end
    }
}

/// Check if a port is available by attempting to bind to it
pub fn is_port_available(port: u16) -> bool {
    TcpListener::bind(("127.0.0.1", port)).is_ok()
}

impl PortAllocator for ProbingPortAllocator {
    fn allocate(&self, container_ports: &[u16]) -> Result<BTreeMap<u16, u16>> {
        let mut taken = HashSet::new();
        let mut map = BTreeMap::new();

        for &container_port in container_ports {
            let host_port = self
                .candidates()
                .find(|port| !taken.contains(port) && is_port_available(*port))
                .ok_or(Error::NoFreePort {
                    start: self.start,
                    attempts: self.attempts,
                })?;

            debug!("Container port {} -> host port {}", container_port, host_port);
            taken.insert(host_port);
            map.insert(container_port, host_port);
        }

        Ok(map)
    }
}
