//! Execution bridge
//!
//! Forwards code and shell commands into a sandbox's HTTP API. The sandbox is
//! provisioned and started on demand.

use reqwest::{header, Client};
use secrecy::ExposeSecret;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::error::ExecutionError;
use super::readiness::wait_until_ready;
use super::request::ExecutionKind;
use crate::config::BridgeConfig;
use crate::error::Result;
use crate::sandbox::{SandboxManager, SandboxSession, SandboxType, STATUS_RUNNING};

/// Sends execution requests to sandboxes owned by a manager
pub struct ExecutionBridge {
    /// Sandbox registry
    manager: Arc<SandboxManager>,
    /// HTTP client, shared across sandboxes
    client: Client,
    /// Timeouts and readiness polling
    config: BridgeConfig,
}

impl ExecutionBridge {
    /// Create a bridge over a manager
    pub fn new(manager: Arc<SandboxManager>, config: BridgeConfig) -> Result<Self> {
        let client = Client::builder().timeout(config.request_timeout).build()?;

        Ok(ExecutionBridge {
            manager,
            client,
            config,
        })
    }

    /// The registry this bridge draws sandboxes from
    pub fn manager(&self) -> &Arc<SandboxManager> {
        &self.manager
    }

    /// Run code in the sandbox's IPython kernel
    pub async fn run_ipython_cell(&self, sandbox_type: SandboxType, code: &str) -> String {
        self.execute(sandbox_type, ExecutionKind::IpythonCell, code)
            .await
    }

    /// Run a shell command in the sandbox
    pub async fn run_shell_command(&self, sandbox_type: SandboxType, command: &str) -> String {
        self.execute(sandbox_type, ExecutionKind::ShellCommand, command)
            .await
    }

    /// Execute and always return text: the response body, or a rendered failure
    pub async fn execute(
        &self,
        sandbox_type: SandboxType,
        kind: ExecutionKind,
        payload: &str,
    ) -> String {
        match self.try_execute(sandbox_type, kind, payload).await {
            Ok(body) => body,
            Err(e) => {
                warn!("{} on {} sandbox failed: {}", kind, sandbox_type, e);
                e.to_failure().render()
            }
        }
    }

    /// Execute and return the response body, or a structured error
    pub async fn try_execute(
        &self,
        sandbox_type: SandboxType,
        kind: ExecutionKind,
        payload: &str,
    ) -> std::result::Result<String, ExecutionError> {
        let session = self.manager.get_sandbox(sandbox_type).await?;
        self.ensure_running(sandbox_type, &session).await?;

        let url = kind.endpoint(&session)?;
        debug!("POST {} ({} bytes)", url, payload.len());

        let response = self
            .client
            .post(url.clone())
            .bearer_auth(session.auth_token.expose_secret())
            .header(header::HOST, session.authority())
            .json(&kind.body(payload))
            .send()
            .await
            .map_err(|e| ExecutionError::from_reqwest(url.as_str(), self.config.request_timeout, e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ExecutionError::from_reqwest(url.as_str(), self.config.request_timeout, e))?;

        if !status.is_success() {
            return Err(ExecutionError::HttpStatus {
                status: status.as_u16(),
                body,
            });
        }

        Ok(body)
    }

    /// Start the sandbox and wait for it unless it already runs
    async fn ensure_running(
        &self,
        sandbox_type: SandboxType,
        session: &SandboxSession,
    ) -> std::result::Result<(), ExecutionError> {
        let status = self.manager.get_sandbox_status(sandbox_type).await;
        if status == STATUS_RUNNING {
            return Ok(());
        }

        info!("{} sandbox is {}, starting it", sandbox_type, status);
        self.manager.start_sandbox(sandbox_type).await?;

        wait_until_ready(
            &self.manager,
            &self.client,
            sandbox_type,
            session,
            &self.config.readiness,
        )
        .await
    }
}
