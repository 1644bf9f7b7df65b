//! Execution bridge - runs code and shell commands inside sandboxes
//!
//! Each call resolves the sandbox for a type through the manager, makes sure
//! it is running and reachable, then POSTs the payload to the sandbox's tool
//! endpoint with the session's bearer token.

mod error;
mod executor;
mod readiness;
mod request;

pub use error::{ExecutionError, ExecutionErrorKind, ExecutionFailure};
pub use executor::ExecutionBridge;
pub use request::ExecutionKind;
