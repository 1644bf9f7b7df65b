//! Readiness polling for freshly started sandboxes
//!
//! A sandbox counts as ready once the runtime reports it running and its HTTP
//! service answers anything at all. Probes back off exponentially until the
//! configured timeout.

use backoff::ExponentialBackoffBuilder;
use reqwest::Client;
use std::time::Instant;
use tracing::{debug, info};

use super::error::ExecutionError;
use crate::config::ReadinessConfig;
use crate::sandbox::{SandboxManager, SandboxSession, SandboxType, STATUS_RUNNING};

/// Poll until `session` is reachable or the readiness timeout passes
pub(crate) async fn wait_until_ready(
    manager: &SandboxManager,
    client: &Client,
    sandbox_type: SandboxType,
    session: &SandboxSession,
    config: &ReadinessConfig,
) -> Result<(), ExecutionError> {
    let policy = ExponentialBackoffBuilder::new()
        .with_initial_interval(config.initial_interval)
        .with_max_interval(config.max_interval)
        .with_max_elapsed_time(Some(config.timeout))
        .build();

    let probe_url = session.base_url();
    let started = Instant::now();

    backoff::future::retry(policy, || {
        let probe_url = probe_url.clone();
        async move {
            let status = manager.get_sandbox_status(sandbox_type).await;
            if status != STATUS_RUNNING {
                debug!("{} sandbox not running yet ({})", sandbox_type, status);
                return Err(backoff::Error::transient(ExecutionError::NotReady {
                    timeout: config.timeout,
                    last_status: status,
                }));
            }

            client
                .get(&probe_url)
                .timeout(config.probe_timeout)
                .send()
                .await
                .map_err(|e| {
                    debug!("{} sandbox endpoint not answering: {}", sandbox_type, e);
                    backoff::Error::transient(ExecutionError::NotReady {
                        timeout: config.timeout,
                        last_status: format!("running, endpoint unreachable: {}", e),
                    })
                })?;

            Ok(())
        }
    })
    .await?;

    info!("{} sandbox ready after {:?}", sandbox_type, started.elapsed());
    Ok(())
}
