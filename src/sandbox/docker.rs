//! Docker-backed container adapter
//!
//! Talks to the local Docker daemon through bollard. Sandboxes are long-lived
//! containers: created once, then started and stopped on demand.

use async_trait::async_trait;
use bollard::container::{
    Config, CreateContainerOptions, InspectContainerOptions, RemoveContainerOptions,
    StartContainerOptions, StopContainerOptions,
};
use bollard::errors::Error as BollardError;
use bollard::image::CreateImageOptions;
use bollard::service::{HostConfig, PortBinding};
use bollard::Docker;
use futures::StreamExt;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info};

use super::adapter::{ContainerAdapter, ContainerSpec};
use crate::config::SandboxConfig;
use crate::error::{Error, Result};

/// Label prefix on every container this adapter creates
const LABEL_PREFIX: &str = "sandpool";

/// Docker container adapter
pub struct DockerAdapter {
    /// Docker client
    docker: Docker,
    /// Pull missing images before create
    pull_images: bool,
    /// Upper bound for one image pull
    pull_timeout: Duration,
    /// Grace period before the daemon kills on stop
    stop_timeout_secs: u64,
}

impl DockerAdapter {
    /// Connect to the local Docker daemon and verify it answers
    pub async fn connect(config: &SandboxConfig) -> Result<Self> {
        let docker = Docker::connect_with_local_defaults()
            .map_err(|e| Error::Container(format!("Failed to connect to Docker: {}", e)))?;

        docker
            .ping()
            .await
            .map_err(|e| Error::Container(format!("Docker ping failed: {}", e)))?;

        info!("Container adapter connected to Docker");

        Ok(Self::with_client(docker, config))
    }

    /// Wrap an existing client
    pub fn with_client(docker: Docker, config: &SandboxConfig) -> Self {
        DockerAdapter {
            docker,
            pull_images: config.pull_images,
            pull_timeout: config.pull_timeout,
            stop_timeout_secs: config.stop_timeout_secs,
        }
    }

    /// Ensure the image is present locally, pulling it if needed
    async fn ensure_image(&self, image: &str) -> Result<()> {
        match self.docker.inspect_image(image).await {
            Ok(_) => return Ok(()),
            Err(e) if is_status(&e, 404) => {}
            Err(e) => return Err(Error::Container(format!("Failed to inspect image: {}", e))),
        }

        if !self.pull_images {
            return Err(Error::Container(format!(
                "Image {} is not present and pulling is disabled",
                image
            )));
        }

        info!("Pulling Docker image: {}", image);

        let options = CreateImageOptions {
            from_image: image.to_string(),
            ..Default::default()
        };

        let pull = async {
            let mut stream = self.docker.create_image(Some(options), None, None);
            while let Some(result) = stream.next().await {
                match result {
                    Ok(info) => {
                        if let Some(status) = info.status {
                            debug!("Pull status: {}", status);
                        }
                    }
                    Err(e) => {
                        return Err(Error::Container(format!("Failed to pull image: {}", e)));
                    }
                }
            }
            Ok(())
        };

        tokio::time::timeout(self.pull_timeout, pull)
            .await
            .map_err(|_| {
                Error::Timeout(format!(
                    "Pulling {} took longer than {:?}",
                    image, self.pull_timeout
                ))
            })??;

        info!("Image pulled successfully");
        Ok(())
    }
}

/// Whether a bollard error is a daemon response with the given status code
fn is_status(err: &BollardError, code: u16) -> bool {
    matches!(err, BollardError::DockerResponseServerError { status_code, .. } if *status_code == code)
}

/// Translate a spec into bollard's create config
fn to_bollard_config(spec: &ContainerSpec) -> Config<String> {
    let mut exposed_ports = HashMap::new();
    let mut port_bindings = HashMap::new();

    for port in &spec.ports {
        let container_port = format!("{}/tcp", port);
        exposed_ports.insert(container_port.clone(), HashMap::new());

        if let Some(host_port) = spec.port_map.get(port) {
            let binding = vec![PortBinding {
                host_ip: Some("0.0.0.0".to_string()),
                host_port: Some(host_port.to_string()),
            }];
            port_bindings.insert(container_port, Some(binding));
        }
    }

    let binds: Vec<String> = spec.volumes.iter().map(|v| v.to_bind()).collect();

    let env: Vec<String> = spec
        .env
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect();

    let labels = HashMap::from([
        (format!("{}.managed", LABEL_PREFIX), "true".to_string()),
        (
            format!("{}.type", LABEL_PREFIX),
            spec.sandbox_type.to_string(),
        ),
    ]);

    Config {
        image: Some(spec.image.clone()),
        env: Some(env),
        labels: Some(labels),
        exposed_ports: Some(exposed_ports),
        host_config: Some(HostConfig {
            binds: Some(binds),
            port_bindings: Some(port_bindings),
            runtime: spec.runtime.runtime_name().map(str::to_string),
            ..Default::default()
        }),
        ..Default::default()
    }
}

#[async_trait]
impl ContainerAdapter for DockerAdapter {
    fn name(&self) -> &str {
        "docker"
    }

    async fn create(&self, spec: &ContainerSpec) -> Result<String> {
        self.ensure_image(&spec.image).await?;

        let options = CreateContainerOptions {
            name: spec.name.clone(),
            platform: None,
        };

        let response = self
            .docker
            .create_container(Some(options), to_bollard_config(spec))
            .await
            .map_err(|e| Error::Container(format!("Failed to create container: {}", e)))?;

        for warning in &response.warnings {
            debug!("Create warning for {}: {}", spec.name, warning);
        }
        debug!("Created container: {} ({})", spec.name, response.id);

        Ok(response.id)
    }

    async fn start(&self, container_id: &str) -> Result<()> {
        match self
            .docker
            .start_container(container_id, None::<StartContainerOptions<String>>)
            .await
        {
            Ok(()) => Ok(()),
            // 304: already running
            Err(e) if is_status(&e, 304) => Ok(()),
            Err(e) => Err(Error::Container(format!("Failed to start container: {}", e))),
        }
    }

    async fn stop(&self, container_id: &str) -> Result<()> {
        let options = StopContainerOptions {
            t: self.stop_timeout_secs as i64,
        };

        match self.docker.stop_container(container_id, Some(options)).await {
            Ok(()) => Ok(()),
            // 304: already stopped
            Err(e) if is_status(&e, 304) => Ok(()),
            Err(e) => Err(Error::Container(format!("Failed to stop container: {}", e))),
        }
    }

    async fn remove(&self, container_id: &str) -> Result<()> {
        let options = RemoveContainerOptions {
            force: true,
            ..Default::default()
        };

        self.docker
            .remove_container(container_id, Some(options))
            .await
            .map_err(|e| Error::Container(format!("Failed to remove container: {}", e)))?;

        debug!("Removed container: {}", container_id);
        Ok(())
    }

    async fn status(&self, container_id: &str) -> Result<String> {
        let inspect = self
            .docker
            .inspect_container(container_id, None::<InspectContainerOptions>)
            .await
            .map_err(|e| Error::Container(format!("Failed to inspect container: {}", e)))?;

        Ok(inspect
            .state
            .and_then(|state| state.status)
            .map(|status| status.to_string())
            .unwrap_or_else(|| "unknown".to_string()))
    }
}
