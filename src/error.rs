//! Error types for Sandpool

use thiserror::Error;

use crate::sandbox::SandboxType;

/// Result type alias using Sandpool's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for Sandpool
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Creating a sandbox failed; nothing was cached
    #[error("Provisioning failed for {sandbox_type} sandbox: {source}")]
    Provisioning {
        sandbox_type: SandboxType,
        #[source]
        source: Box<Error>,
    },

    /// Start/stop/remove failed on a cached sandbox; the cache entry is kept
    #[error("Failed to {operation} {sandbox_type} sandbox: {source}")]
    Lifecycle {
        sandbox_type: SandboxType,
        operation: &'static str,
        #[source]
        source: Box<Error>,
    },

    /// Docker/container runtime error
    #[error("Container error: {0}")]
    Container(String),

    /// The port scan window was exhausted
    #[error("No free port available in {start}..{start}+{attempts}")]
    NoFreePort { start: u16, attempts: u16 },

    /// HTTP request error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Timeout error
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Generic internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Wrap an underlying failure as a provisioning error
    pub fn provisioning(sandbox_type: SandboxType, source: Error) -> Self {
        Error::Provisioning {
            sandbox_type,
            source: Box::new(source),
        }
    }

    /// Wrap an underlying failure as a lifecycle error
    pub fn lifecycle(sandbox_type: SandboxType, operation: &'static str, source: Error) -> Self {
        Error::Lifecycle {
            sandbox_type,
            operation,
            source: Box::new(source),
        }
    }

    /// Check if this error came from sandbox creation
    pub fn is_provisioning(&self) -> bool {
        matches!(self, Error::Provisioning { .. })
    }

    /// Check if this error came from a start/stop/remove call
    pub fn is_lifecycle(&self) -> bool {
        matches!(self, Error::Lifecycle { .. })
    }

    /// Check if error is a client error (user's fault)
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Error::InvalidInput(_) | Error::Config(_)
        )
    }
}

impl From<bollard::errors::Error> for Error {
    fn from(err: bollard::errors::Error) -> Self {
        Error::Container(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provisioning_error_carries_cause() {
        let err = Error::provisioning(
            SandboxType::Python,
            Error::Container("image not found".to_string()),
        );
        assert!(err.is_provisioning());
        assert!(!err.is_lifecycle());

        let text = err.to_string();
        assert!(text.contains("python"));
        assert!(text.contains("image not found"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_lifecycle_error_names_operation() {
        let err = Error::lifecycle(
            SandboxType::Base,
            "stop",
            Error::Container("daemon unreachable".to_string()),
        );
        assert!(err.is_lifecycle());
        assert_eq!(
            err.to_string(),
            "Failed to stop base sandbox: Container error: daemon unreachable"
        );
    }
}
