//! In-memory adapter and port allocator for tests

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use super::adapter::{ContainerAdapter, ContainerSpec, STATUS_RUNNING};
use super::ports::PortAllocator;
use crate::error::{Error, Result};

/// Records every call and keeps container status in a map
#[derive(Default)]
pub(crate) struct FakeAdapter {
    ids: Mutex<VecDeque<String>>,
    created: AtomicUsize,
    create_delay: Duration,
    pub fail_create: AtomicBool,
    pub fail_lifecycle: AtomicBool,
    pub fail_status: AtomicBool,
    /// Status calls that still report "restarting" after a start
    pub start_lag: AtomicUsize,
    statuses: Mutex<HashMap<String, String>>,
    calls: Mutex<Vec<String>>,
    specs: Mutex<Vec<ContainerSpec>>,
}

impl FakeAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hand out these ids first
    pub fn with_ids(ids: &[&str]) -> Self {
        let adapter = Self::default();
        adapter
            .ids
            .lock()
            .unwrap()
            .extend(ids.iter().map(|s| s.to_string()));
        adapter
    }

    /// Sleep inside every create, to widen race windows
    pub fn with_create_delay(mut self, delay: Duration) -> Self {
        self.create_delay = delay;
        self
    }

    pub fn create_count(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn specs(&self) -> Vec<ContainerSpec> {
        self.specs.lock().unwrap().clone()
    }

    /// Ids of containers the runtime still holds
    pub fn containers(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.statuses.lock().unwrap().keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn set_status(&self, container_id: &str, status: &str) {
        self.statuses
            .lock()
            .unwrap()
            .insert(container_id.to_string(), status.to_string());
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn lifecycle(&self, op: &str, container_id: &str, status: Option<&str>) -> Result<()> {
        self.record(format!("{} {}", op, container_id));
        if self.fail_lifecycle.load(Ordering::SeqCst) {
            return Err(Error::Container(format!("{} refused by runtime", op)));
        }
        let mut statuses = self.statuses.lock().unwrap();
        if !statuses.contains_key(container_id) {
            return Err(Error::Container(format!("No such container: {}", container_id)));
        }
        match status {
            Some(s) => statuses.insert(container_id.to_string(), s.to_string()),
            None => statuses.remove(container_id),
        };
        Ok(())
    }
}

#[async_trait]
impl ContainerAdapter for FakeAdapter {
    fn name(&self) -> &str {
        "fake"
    }

    /// The container exists before the reply, like a runtime that is slow to answer
    async fn create(&self, spec: &ContainerSpec) -> Result<String> {
        let n = self.created.fetch_add(1, Ordering::SeqCst);
        self.record(format!("create {}", spec.name));
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(Error::Container("image pull failed".to_string()));
        }

        let id = self
            .ids
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| format!("container-{}", n));
        self.specs.lock().unwrap().push(spec.clone());
        self.set_status(&id, "created");

        if !self.create_delay.is_zero() {
            tokio::time::sleep(self.create_delay).await;
        }
        Ok(id)
    }

    async fn start(&self, container_id: &str) -> Result<()> {
        self.lifecycle("start", container_id, Some(STATUS_RUNNING))
    }

    async fn stop(&self, container_id: &str) -> Result<()> {
        self.lifecycle("stop", container_id, Some("exited"))
    }

    async fn remove(&self, container_id: &str) -> Result<()> {
        self.lifecycle("remove", container_id, None)
    }

    async fn status(&self, container_id: &str) -> Result<String> {
        if self.fail_status.load(Ordering::SeqCst) {
            return Err(Error::Container("daemon unreachable".to_string()));
        }

        let status = self
            .statuses
            .lock()
            .unwrap()
            .get(container_id)
            .cloned()
            .ok_or_else(|| Error::Container(format!("No such container: {}", container_id)))?;

        if status == STATUS_RUNNING
            && self
                .start_lag
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
        {
            return Ok("restarting".to_string());
        }
        Ok(status)
    }
}

/// Returns the same host ports for every request
pub(crate) struct FixedPortAllocator(pub Vec<u16>);

impl PortAllocator for FixedPortAllocator {
    fn allocate(&self, container_ports: &[u16]) -> Result<BTreeMap<u16, u16>> {
        if container_ports.len() > self.0.len() {
            return Err(Error::NoFreePort {
                start: self.0.first().copied().unwrap_or(0),
                attempts: self.0.len() as u16,
            });
        }
        Ok(container_ports
            .iter()
            .copied()
            .zip(self.0.iter().copied())
            .collect())
    }
}
