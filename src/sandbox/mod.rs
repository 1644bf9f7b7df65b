//! Sandbox module - per-type container sandboxes
//!
//! - `types`: sandbox types, lifecycle states, runtime profiles
//! - `session`: the record of one provisioned sandbox
//! - `ports`: host port allocation
//! - `credentials`: per-session tokens
//! - `adapter`: the container runtime boundary, `docker` implements it
//! - `manager`: the registry holding one session per type

mod adapter;
mod credentials;
mod docker;
mod manager;
mod ports;
mod session;
mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use adapter::{ContainerAdapter, ContainerSpec, STATUS_RUNNING};
pub use credentials::{generate_token, session_id_for, TOKEN_LENGTH};
pub use docker::DockerAdapter;
pub use manager::{SandboxManager, STATUS_NOT_FOUND, STATUS_UNKNOWN};
pub use ports::{
    is_port_available, PortAllocator, ProbingPortAllocator, DEFAULT_PORT_RANGE_START,
    DEFAULT_PORT_SCAN_ATTEMPTS,
};
pub use session::SandboxSession;
pub use types::{
    RuntimeProfile, SandboxState, SandboxType, VolumeBinding, PRIMARY_CONTAINER_PORT,
};

#[cfg(test)]
pub(crate) use session::sample_session;
