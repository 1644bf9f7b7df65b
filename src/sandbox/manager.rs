//! Sandbox registry
//!
//! Holds at most one live session per sandbox type. Each type has its own
//! async mutex; provisioning and every lifecycle call for a type run while
//! holding it, so concurrent first requests create exactly one container.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use secrecy::ExposeSecret;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, info, warn};

use super::adapter::{ContainerAdapter, ContainerSpec};
use super::credentials::{generate_token, session_id_for};
use super::docker::DockerAdapter;
use super::ports::{PortAllocator, ProbingPortAllocator};
use super::session::SandboxSession;
use super::types::{SandboxState, SandboxType, VolumeBinding};
use crate::config::SandboxConfig;
use crate::error::{Error, Result};

/// Status reported for a type with no cached session
pub const STATUS_NOT_FOUND: &str = "not_found";

/// Status reported when the runtime could not be asked
pub const STATUS_UNKNOWN: &str = "unknown";

const SLOT_COUNT: usize = SandboxType::ALL.len();

type Slot = Arc<Mutex<Option<SandboxSession>>>;

/// Registry and lifecycle manager for sandbox sessions
pub struct SandboxManager {
    /// Sandbox configuration
    config: Arc<SandboxConfig>,
    /// Container runtime
    adapter: Arc<dyn ContainerAdapter>,
    /// Host port source
    ports: Arc<dyn PortAllocator>,
    /// One slot per sandbox type, indexed by `SandboxType::index`
    slots: [Slot; SLOT_COUNT],
}

/// Everything provisioning needs, owned so it can run in its own task
#[derive(Clone)]
struct Provisioner {
    config: Arc<SandboxConfig>,
    adapter: Arc<dyn ContainerAdapter>,
    ports: Arc<dyn PortAllocator>,
}

impl SandboxManager {
    /// Create a manager over an adapter, probing ports per the config
    pub fn new(config: SandboxConfig, adapter: Arc<dyn ContainerAdapter>) -> Self {
        let ports = Arc::new(ProbingPortAllocator::new(
            config.port_range_start,
            config.port_scan_attempts,
        ));

        SandboxManager {
            config: Arc::new(config),
            adapter,
            ports,
            slots: std::array::from_fn(|_| Arc::new(Mutex::new(None))),
        }
    }

    /// Create a manager backed by the local Docker daemon
    pub async fn connect(config: SandboxConfig) -> Result<Self> {
        let adapter = DockerAdapter::connect(&config).await?;
        Ok(Self::new(config, Arc::new(adapter)))
    }

    /// Replace the port allocator
    pub fn with_port_allocator(mut self, ports: Arc<dyn PortAllocator>) -> Self {
        self.ports = ports;
        self
    }

    /// Sandbox configuration in use
    pub fn config(&self) -> &SandboxConfig {
        &self.config
    }

    async fn lock(&self, sandbox_type: SandboxType) -> MutexGuard<'_, Option<SandboxSession>> {
        self.slots[sandbox_type.index()].lock().await
    }

    /// Return the cached session for a type, provisioning one on first use
    ///
    /// Provisioning runs in its own task holding the type's lock, so a caller
    /// that gives up early still leaves the new container cached.
    pub async fn get_sandbox(&self, sandbox_type: SandboxType) -> Result<SandboxSession> {
        let mut slot = self.slots[sandbox_type.index()].clone().lock_owned().await;

        if let Some(session) = slot.as_ref() {
            return Ok(session.clone());
        }

        let provisioner = Provisioner {
            config: self.config.clone(),
            adapter: self.adapter.clone(),
            ports: self.ports.clone(),
        };

        let task = tokio::spawn(async move {
            let session = provisioner
                .provision(sandbox_type)
                .await
                .map_err(|e| Error::provisioning(sandbox_type, e))?;

            info!(
                "Provisioned {} sandbox: container={} base_url={}",
                sandbox_type,
                session.container_name,
                session.base_url()
            );

            *slot = Some(session.clone());
            Ok(session)
        });

        task.await.map_err(|e| {
            Error::Internal(format!(
                "Provisioning task for {} sandbox failed: {}",
                sandbox_type, e
            ))
        })?
    }

    /// Cached session for a type, without provisioning
    pub async fn peek_sandbox(&self, sandbox_type: SandboxType) -> Option<SandboxSession> {
        self.lock(sandbox_type).await.clone()
    }
}

impl Provisioner {
    /// Host directory a session's files live in
    fn mount_dir_for(&self, session_id: &str) -> Result<PathBuf> {
        Ok(std::env::current_dir()?
            .join(&self.config.mount_root)
            .join(session_id))
    }

    async fn provision(&self, sandbox_type: SandboxType) -> Result<SandboxSession> {
        let image = self.config.image_for(sandbox_type);
        let container_ports = sandbox_type.container_ports();

        let host_port_map = self.ports.allocate(&container_ports)?;
        info!("Allocated ports for {} sandbox: {:?}", sandbox_type, host_port_map);

        let auth_token = generate_token();
        let session_id = session_id_for(&auth_token);

        let mount_dir = self.mount_dir_for(&session_id)?;
        tokio::fs::create_dir_all(&mount_dir).await?;

        let volumes = vec![VolumeBinding {
            host_path: mount_dir.to_string_lossy().into_owned(),
            container_path: self.config.workdir.clone(),
            readonly: false,
        }];
        let env = HashMap::from([(
            self.config.token_env_var.clone(),
            auth_token.expose_secret().to_string(),
        )]);

        let spec = ContainerSpec {
            sandbox_type,
            name: format!("sandbox-{}-{}", sandbox_type, session_id).to_lowercase(),
            image,
            ports: container_ports,
            port_map: host_port_map.clone(),
            volumes,
            env,
            runtime: self.config.runtime,
        };

        debug!("Creating container {} from {}", spec.name, spec.image);

        let container_id = match self.adapter.create(&spec).await {
            Ok(id) => id,
            Err(e) => {
                // Only succeeds while the directory is still empty
                if let Err(cleanup) = tokio::fs::remove_dir(&mount_dir).await {
                    debug!("Left mount dir {} in place: {}", mount_dir.display(), cleanup);
                }
                return Err(e);
            }
        };

        Ok(SandboxSession {
            sandbox_type,
            session_id,
            container_id,
            container_name: spec.name,
            host_port_map,
            mount_dir,
            endpoint_host: self.config.endpoint_host.clone(),
            auth_token,
            state: SandboxState::Created,
            created_at: Utc::now(),
        })
    }
}

impl SandboxManager {
    /// Start the cached container for a type
    pub async fn start_sandbox(&self, sandbox_type: SandboxType) -> Result<()> {
        let mut slot = self.lock(sandbox_type).await;
        let Some(session) = slot.as_mut() else {
            warn!("No {} sandbox to start; request one first", sandbox_type);
            return Ok(());
        };

        self.adapter
            .start(&session.container_id)
            .await
            .map_err(|e| Error::lifecycle(sandbox_type, "start", e))?;

        transition(session, SandboxState::Running);
        info!("Started {} sandbox ({})", sandbox_type, session.container_name);
        Ok(())
    }

    /// Stop the cached container for a type
    pub async fn stop_sandbox(&self, sandbox_type: SandboxType) -> Result<()> {
        let mut slot = self.lock(sandbox_type).await;
        self.stop_locked(sandbox_type, &mut slot).await
    }

    /// Remove the cached container for a type and forget the session
    pub async fn remove_sandbox(&self, sandbox_type: SandboxType) -> Result<()> {
        let mut slot = self.lock(sandbox_type).await;
        self.remove_locked(sandbox_type, &mut slot).await
    }

    /// Stop then remove, under one lock
    pub async fn stop_and_remove_sandbox(&self, sandbox_type: SandboxType) -> Result<()> {
        let mut slot = self.lock(sandbox_type).await;
        self.stop_locked(sandbox_type, &mut slot).await?;
        self.remove_locked(sandbox_type, &mut slot).await
    }

    async fn stop_locked(
        &self,
        sandbox_type: SandboxType,
        slot: &mut Option<SandboxSession>,
    ) -> Result<()> {
        let Some(session) = slot.as_mut() else {
            debug!("No {} sandbox to stop", sandbox_type);
            return Ok(());
        };

        self.adapter
            .stop(&session.container_id)
            .await
            .map_err(|e| Error::lifecycle(sandbox_type, "stop", e))?;

        transition(session, SandboxState::Stopped);
        info!("Stopped {} sandbox ({})", sandbox_type, session.container_name);
        Ok(())
    }

    async fn remove_locked(
        &self,
        sandbox_type: SandboxType,
        slot: &mut Option<SandboxSession>,
    ) -> Result<()> {
        let Some(session) = slot.as_mut() else {
            debug!("No {} sandbox to remove", sandbox_type);
            return Ok(());
        };

        self.adapter
            .remove(&session.container_id)
            .await
            .map_err(|e| Error::lifecycle(sandbox_type, "remove", e))?;

        transition(session, SandboxState::Removed);
        if let Some(session) = slot.take() {
            info!("Removed {} sandbox ({})", sandbox_type, session.container_name);
        }
        Ok(())
    }

    /// Raw runtime status for a type's container, or `not_found`
    ///
    /// Never fails: a runtime error is logged and reported as `unknown`.
    pub async fn get_sandbox_status(&self, sandbox_type: SandboxType) -> String {
        let container_id = match self.lock(sandbox_type).await.as_ref() {
            Some(session) => session.container_id.clone(),
            None => return STATUS_NOT_FOUND.to_string(),
        };

        match self.adapter.status(&container_id).await {
            Ok(status) => status,
            Err(e) => {
                warn!("Could not read status of {} sandbox: {}", sandbox_type, e);
                STATUS_UNKNOWN.to_string()
            }
        }
    }

    /// Copy of every cached session
    pub async fn get_all_sandboxes(&self) -> HashMap<SandboxType, SandboxSession> {
        let mut all = HashMap::new();
        for sandbox_type in SandboxType::ALL {
            if let Some(session) = self.lock(sandbox_type).await.as_ref() {
                all.insert(sandbox_type, session.clone());
            }
        }
        all
    }

    /// Stop and remove every cached sandbox.
    ///
    /// Keeps going past failures and returns the first one.
    pub async fn release_all(&self) -> Result<()> {
        let mut first_error = None;

        for sandbox_type in SandboxType::ALL {
            if let Err(e) = self.stop_and_remove_sandbox(sandbox_type).await {
                warn!("Failed to release {} sandbox: {}", sandbox_type, e);
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

fn transition(session: &mut SandboxSession, next: SandboxState) {
    if session.state.can_transition_to(next) {
        session.state = next;
    } else {
        debug!(
            "Keeping {} sandbox in state {} (runtime accepted {})",
            session.sandbox_type, session.state, next
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sandbox::testing::{FakeAdapter, FixedPortAllocator};
    use crate::sandbox::types::PRIMARY_CONTAINER_PORT;
    use std::sync::atomic::Ordering;
    use std::time::Duration;
    use tempfile::TempDir;
    use tokio_test::{assert_err, assert_ok};

    fn manager_with(adapter: Arc<FakeAdapter>) -> (SandboxManager, TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let config = SandboxConfig {
            mount_root: dir.path().to_path_buf(),
            ..SandboxConfig::default()
        };
        let manager = SandboxManager::new(config, adapter)
            .with_port_allocator(Arc::new(FixedPortAllocator(vec![8003])));
        (manager, dir)
    }

    #[tokio::test]
    async fn test_get_sandbox_is_idempotent() {
        let adapter = Arc::new(FakeAdapter::new());
        let (manager, _dir) = manager_with(adapter.clone());

        let first = manager.get_sandbox(SandboxType::Python).await.unwrap();
        let second = manager.get_sandbox(SandboxType::Python).await.unwrap();

        assert_eq!(first.session_id, second.session_id);
        assert_eq!(first.container_id, second.container_id);
        assert_eq!(adapter.create_count(), 1);
    }

    #[tokio::test]
    async fn test_provisioning_inputs() {
        let adapter = Arc::new(FakeAdapter::new());
        let (manager, dir) = manager_with(adapter.clone());

        let session = manager.get_sandbox(SandboxType::Filesystem).await.unwrap();
        assert_eq!(session.state, SandboxState::Created);
        assert!(session.mount_dir.starts_with(dir.path()));
        assert!(session.mount_dir.ends_with(&session.session_id));
        assert!(session.mount_dir.is_dir());

        let specs = adapter.specs();
        let spec = &specs[0];
        assert_eq!(spec.name, format!("sandbox-filesystem-{}", session.session_id));
        // no built-in image for filesystem
        assert_eq!(spec.image, manager.config().default_image);
        assert_eq!(spec.ports, vec![PRIMARY_CONTAINER_PORT]);
        assert_eq!(spec.port_map[&PRIMARY_CONTAINER_PORT], 8003);
        assert_eq!(spec.volumes[0].container_path, "/workspace");
        assert!(!spec.volumes[0].readonly);
        assert_eq!(
            spec.env["SANDBOX_AUTH_TOKEN"],
            session.auth_token.expose_secret()
        );
    }

    #[tokio::test]
    async fn test_base_sandbox_scenario() {
        let adapter = Arc::new(FakeAdapter::with_ids(&["abc123"]));
        let (manager, _dir) = manager_with(adapter.clone());

        let session = manager.get_sandbox(SandboxType::Base).await.unwrap();
        assert_eq!(session.container_id, "abc123");
        assert_eq!(session.base_url(), "http://localhost:8003/fastapi");

        manager.start_sandbox(SandboxType::Base).await.unwrap();
        assert!(adapter.calls().contains(&"start abc123".to_string()));
        assert_eq!(manager.get_sandbox_status(SandboxType::Base).await, "running");

        let cached = manager.peek_sandbox(SandboxType::Base).await.unwrap();
        assert_eq!(cached.state, SandboxState::Running);
    }

    #[tokio::test]
    async fn test_concurrent_first_requests_create_once() {
        let adapter = Arc::new(FakeAdapter::new().with_create_delay(Duration::from_millis(50)));
        let (manager, _dir) = manager_with(adapter.clone());
        let manager = Arc::new(manager);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let manager = manager.clone();
                tokio::spawn(async move { manager.get_sandbox(SandboxType::Node).await })
            })
            .collect();

        let mut ids = Vec::new();
        for handle in handles {
            ids.push(handle.await.unwrap().unwrap().session_id);
        }

        assert_eq!(adapter.create_count(), 1);
        assert!(ids.windows(2).all(|w| w[0] == w[1]));
    }

    #[tokio::test]
    async fn test_types_are_independent() {
        let adapter = Arc::new(FakeAdapter::new());
        let (manager, _dir) = manager_with(adapter.clone());

        let base = manager.get_sandbox(SandboxType::Base).await.unwrap();
        let java = manager.get_sandbox(SandboxType::Java).await.unwrap();

        assert_ne!(base.session_id, java.session_id);
        assert_eq!(adapter.create_count(), 2);
        assert_eq!(manager.get_all_sandboxes().await.len(), 2);
    }

    #[tokio::test]
    async fn test_remove_then_get_reprovisions() {
        let adapter = Arc::new(FakeAdapter::new());
        let (manager, _dir) = manager_with(adapter.clone());

        let first = manager.get_sandbox(SandboxType::Base).await.unwrap();
        manager.remove_sandbox(SandboxType::Base).await.unwrap();
        assert!(manager.peek_sandbox(SandboxType::Base).await.is_none());
        assert_eq!(manager.get_sandbox_status(SandboxType::Base).await, "not_found");

        let second = manager.get_sandbox(SandboxType::Base).await.unwrap();
        assert_ne!(first.session_id, second.session_id);
        assert_ne!(first.container_id, second.container_id);
        assert_eq!(adapter.create_count(), 2);
    }

    #[tokio::test]
    async fn test_status_never_provisioned() {
        let adapter = Arc::new(FakeAdapter::new());
        let (manager, _dir) = manager_with(adapter.clone());

        assert_eq!(manager.get_sandbox_status(SandboxType::Browser).await, "not_found");
        assert_eq!(adapter.create_count(), 0);
    }

    #[tokio::test]
    async fn test_status_is_raw_adapter_text() {
        let adapter = Arc::new(FakeAdapter::new());
        let (manager, _dir) = manager_with(adapter.clone());

        let session = manager.get_sandbox(SandboxType::Base).await.unwrap();
        assert_eq!(manager.get_sandbox_status(SandboxType::Base).await, "created");

        adapter.set_status(&session.container_id, "paused");
        assert_eq!(manager.get_sandbox_status(SandboxType::Base).await, "paused");
    }

    #[tokio::test]
    async fn test_status_when_runtime_errors() {
        let adapter = Arc::new(FakeAdapter::new());
        let (manager, _dir) = manager_with(adapter.clone());

        manager.get_sandbox(SandboxType::Base).await.unwrap();
        adapter.fail_status.store(true, Ordering::SeqCst);
        assert_eq!(manager.get_sandbox_status(SandboxType::Base).await, STATUS_UNKNOWN);

        // nothing cached: no runtime call at all
        assert_eq!(
            manager.get_sandbox_status(SandboxType::Java).await,
            STATUS_NOT_FOUND
        );
    }

    #[tokio::test]
    async fn test_abandoned_get_still_caches() {
        let adapter = Arc::new(FakeAdapter::new().with_create_delay(Duration::from_millis(200)));
        let (manager, dir) = manager_with(adapter.clone());

        let abandoned =
            tokio::time::timeout(Duration::from_millis(50), manager.get_sandbox(SandboxType::Base))
                .await;
        assert!(abandoned.is_err());

        let session = manager.get_sandbox(SandboxType::Base).await.unwrap();
        assert_eq!(adapter.create_count(), 1);
        assert_eq!(adapter.containers(), vec![session.container_id.clone()]);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn test_failed_create_caches_nothing() {
        let adapter = Arc::new(FakeAdapter::new());
        adapter.fail_create.store(true, Ordering::SeqCst);
        let (manager, dir) = manager_with(adapter.clone());

        let err = manager.get_sandbox(SandboxType::Python).await.unwrap_err();
        assert!(err.is_provisioning());
        assert!(err.to_string().contains("image pull failed"));
        assert!(manager.get_all_sandboxes().await.is_empty());
        // empty mount dir was cleaned up
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);

        adapter.fail_create.store(false, Ordering::SeqCst);
        assert_ok!(manager.get_sandbox(SandboxType::Python).await);
    }

    #[tokio::test]
    async fn test_port_exhaustion_is_provisioning_error() {
        let adapter = Arc::new(FakeAdapter::new());
        let (manager, _dir) = manager_with(adapter.clone());
        let manager = manager.with_port_allocator(Arc::new(FixedPortAllocator(vec![])));

        let err = manager.get_sandbox(SandboxType::Base).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Provisioning { ref source, .. } if matches!(**source, Error::NoFreePort { .. })
        ));
        assert_eq!(adapter.create_count(), 0);
    }

    #[tokio::test]
    async fn test_failed_stop_keeps_session() {
        let adapter = Arc::new(FakeAdapter::new());
        let (manager, _dir) = manager_with(adapter.clone());

        manager.get_sandbox(SandboxType::Base).await.unwrap();
        manager.start_sandbox(SandboxType::Base).await.unwrap();

        adapter.fail_lifecycle.store(true, Ordering::SeqCst);
        let err = manager.stop_sandbox(SandboxType::Base).await.unwrap_err();
        assert!(err.is_lifecycle());
        assert_err!(manager.remove_sandbox(SandboxType::Base).await);
        assert_err!(manager.stop_and_remove_sandbox(SandboxType::Base).await);

        let session = manager.peek_sandbox(SandboxType::Base).await.unwrap();
        assert_eq!(session.state, SandboxState::Running);
        assert_eq!(manager.get_sandbox_status(SandboxType::Base).await, "running");
    }

    #[tokio::test]
    async fn test_stop_start_cycle() {
        let adapter = Arc::new(FakeAdapter::new());
        let (manager, _dir) = manager_with(adapter.clone());

        manager.get_sandbox(SandboxType::Python).await.unwrap();
        for _ in 0..2 {
            manager.start_sandbox(SandboxType::Python).await.unwrap();
            manager.stop_sandbox(SandboxType::Python).await.unwrap();
            let session = manager.peek_sandbox(SandboxType::Python).await.unwrap();
            assert_eq!(session.state, SandboxState::Stopped);
        }
        assert_eq!(manager.get_sandbox_status(SandboxType::Python).await, "exited");
    }

    #[tokio::test]
    async fn test_lifecycle_without_session_is_noop() {
        let adapter = Arc::new(FakeAdapter::new());
        let (manager, _dir) = manager_with(adapter.clone());

        assert_ok!(manager.start_sandbox(SandboxType::Java).await);
        assert_ok!(manager.stop_sandbox(SandboxType::Java).await);
        assert_ok!(manager.remove_sandbox(SandboxType::Java).await);
        assert_ok!(manager.stop_and_remove_sandbox(SandboxType::Java).await);
        assert!(adapter.calls().is_empty());
    }

    #[tokio::test]
    async fn test_stop_and_remove_order() {
        let adapter = Arc::new(FakeAdapter::with_ids(&["c1"]));
        let (manager, _dir) = manager_with(adapter.clone());

        manager.get_sandbox(SandboxType::Base).await.unwrap();
        manager.start_sandbox(SandboxType::Base).await.unwrap();
        manager.stop_and_remove_sandbox(SandboxType::Base).await.unwrap();

        let calls = adapter.calls();
        assert_eq!(&calls[1..], ["start c1", "stop c1", "remove c1"]);
        assert!(manager.get_all_sandboxes().await.is_empty());
    }

    #[tokio::test]
    async fn test_all_sandboxes_is_a_copy() {
        let adapter = Arc::new(FakeAdapter::new());
        let (manager, _dir) = manager_with(adapter.clone());
        manager.get_sandbox(SandboxType::Base).await.unwrap();

        let mut copy = manager.get_all_sandboxes().await;
        copy.clear();
        assert_eq!(manager.get_all_sandboxes().await.len(), 1);
    }

    #[tokio::test]
    async fn test_release_all() {
        let adapter = Arc::new(FakeAdapter::new());
        let (manager, _dir) = manager_with(adapter.clone());
        manager.get_sandbox(SandboxType::Base).await.unwrap();
        manager.get_sandbox(SandboxType::Browser).await.unwrap();

        manager.release_all().await.unwrap();
        assert!(manager.get_all_sandboxes().await.is_empty());
    }
}
