// nexus-fabric-core/src/runtime/docker.rs - Docker-backed container runtime

use async_trait::async_trait;
use bollard::container::{
    Config, CreateContainerOptions, ListContainersOptions, LogOutput, LogsOptions,
    RemoveContainerOptions, StopContainerOptions,
};
use bollard::image::CreateImageOptions;
use bollard::models::{
    ContainerStateStatusEnum, HostConfig, PortBinding, RestartPolicy, RestartPolicyNameEnum,
};
use bollard::Docker;
use futures::StreamExt;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info};

use super::{
    ContainerInfo, ContainerRuntime, ContainerSpec, ContainerState, ContainerStatus,
    RuntimeError, RuntimeResult, LABEL_MANAGED_BY,
};

pub struct DockerRuntime {
    docker: Docker,
    managed_label: String,
}

impl DockerRuntime {
    /// Connects over the platform default socket.
    pub fn connect(managed_label: &str) -> RuntimeResult<Self> {
        let docker = Docker::connect_with_local_defaults()
            .map_err(|err| RuntimeError::Backend(err.to_string()))?;
        Ok(Self {
            docker,
            managed_label: managed_label.to_string(),
        })
    }

    fn backend(err: bollard::errors::Error) -> RuntimeError {
        match err {
            bollard::errors::Error::DockerResponseServerError {
                status_code: 404,
                message,
            } => RuntimeError::NotFound(message),
            other => RuntimeError::Backend(other.to_string()),
        }
    }

    fn status_from_str(state: &str) -> ContainerStatus {
        match state {
            "created" => ContainerStatus::Created,
            "running" | "restarting" | "paused" => ContainerStatus::Running,
            "exited" => ContainerStatus::Exited,
            "dead" => ContainerStatus::Dead,
            _ => ContainerStatus::Unknown,
        }
    }

    fn status_from_enum(status: ContainerStateStatusEnum) -> ContainerStatus {
        match status {
            ContainerStateStatusEnum::CREATED => ContainerStatus::Created,
            ContainerStateStatusEnum::RUNNING
            | ContainerStateStatusEnum::RESTARTING
            | ContainerStateStatusEnum::PAUSED => ContainerStatus::Running,
            ContainerStateStatusEnum::EXITED => ContainerStatus::Exited,
            ContainerStateStatusEnum::DEAD => ContainerStatus::Dead,
            _ => ContainerStatus::Unknown,
        }
    }

    fn port_bindings(
        spec: &ContainerSpec,
    ) -> RuntimeResult<Option<HashMap<String, Option<Vec<PortBinding>>>>> {
        if spec.ports.is_empty() {
            return Ok(None);
        }
        let mut bindings = HashMap::new();
        for pair in &spec.ports {
            let (host, container) = pair
                .split_once(':')
                .ok_or_else(|| RuntimeError::InvalidSpec(format!("bad port mapping: {pair}")))?;
            let key = if container.contains('/') {
                container.to_string()
            } else {
                format!("{container}/tcp")
            };
            bindings.insert(
                key,
                Some(vec![PortBinding {
                    host_ip: None,
                    host_port: Some(host.to_string()),
                }]),
            );
        }
        Ok(Some(bindings))
    }

    fn restart_policy(spec: &ContainerSpec) -> Option<RestartPolicy> {
        spec.restart_policy.as_deref().map(|policy| RestartPolicy {
            name: Some(match policy {
                "always" => RestartPolicyNameEnum::ALWAYS,
                "unless-stopped" => RestartPolicyNameEnum::UNLESS_STOPPED,
                "on-failure" => RestartPolicyNameEnum::ON_FAILURE,
                _ => RestartPolicyNameEnum::NO,
            }),
            maximum_retry_count: None,
        })
    }
}

#[async_trait]
impl ContainerRuntime for DockerRuntime {
    async fn pull_image(&self, reference: &str) -> RuntimeResult<()> {
        info!(image = reference, "pulling image");
        let options = CreateImageOptions {
            from_image: reference.to_string(),
            ..Default::default()
        };
        let mut stream = self.docker.create_image(Some(options), None, None);
        while let Some(progress) = stream.next().await {
            progress.map_err(|err| RuntimeError::Pull(err.to_string()))?;
        }
        Ok(())
    }

    async fn create_container(&self, spec: &ContainerSpec) -> RuntimeResult<String> {
        if spec.image.is_empty() {
            return Err(RuntimeError::InvalidSpec("missing image".to_string()));
        }
        let mut labels = spec.labels.clone();
        labels.insert(LABEL_MANAGED_BY.to_string(), self.managed_label.clone());
        let host_config = HostConfig {
            memory: spec.memory_mb.map(|mb| mb * 1024 * 1024),
            cpu_shares: spec.cpu_shares,
            binds: if spec.volumes.is_empty() {
                None
            } else {
                Some(spec.volumes.clone())
            },
            port_bindings: Self::port_bindings(spec)?,
            restart_policy: Self::restart_policy(spec),
            ..Default::default()
        };
        let config = Config {
            image: Some(spec.image.clone()),
            env: if spec.env.is_empty() {
                None
            } else {
                Some(spec.env.clone())
            },
            labels: Some(labels),
            host_config: Some(host_config),
            ..Default::default()
        };
        let options = CreateContainerOptions {
            name: spec.name.clone(),
            platform: None,
        };
        let created = self
            .docker
            .create_container(Some(options), config)
            .await
            .map_err(Self::backend)?;
        debug!(container = %created.id, name = %spec.name, "container created");
        Ok(created.id)
    }

    async fn start_container(&self, id: &str) -> RuntimeResult<()> {
        self.docker
            .start_container::<String>(id, None)
            .await
            .map_err(Self::backend)
    }

    async fn stop_container(&self, id: &str, grace: Duration) -> RuntimeResult<()> {
        let options = StopContainerOptions {
            t: grace.as_secs() as i64,
        };
        self.docker
            .stop_container(id, Some(options))
            .await
            .map_err(Self::backend)
    }

    async fn remove_container(&self, id: &str) -> RuntimeResult<()> {
        let options = RemoveContainerOptions {
            force: true,
            ..Default::default()
        };
        self.docker
            .remove_container(id, Some(options))
            .await
            .map_err(Self::backend)
    }

    async fn inspect_container(&self, id: &str) -> RuntimeResult<ContainerState> {
        let inspected = self
            .docker
            .inspect_container(id, None)
            .await
            .map_err(Self::backend)?;
        let (status, exit_code) = inspected
            .state
            .as_ref()
            .map(|state| {
                let status = state
                    .status
                    .map(Self::status_from_enum)
                    .unwrap_or(ContainerStatus::Unknown);
                (status, state.exit_code)
            })
            .unwrap_or((ContainerStatus::Unknown, None));
        let config = inspected.config.unwrap_or_default();
        Ok(ContainerState {
            id: inspected.id.unwrap_or_else(|| id.to_string()),
            status,
            exit_code,
            image: config.image.unwrap_or_default(),
            env: config.env.unwrap_or_default(),
            labels: config.labels.unwrap_or_default(),
        })
    }

    async fn read_logs(&self, id: &str, tail: usize) -> RuntimeResult<String> {
        let options = LogsOptions::<String> {
            stdout: true,
            stderr: true,
            tail: tail.to_string(),
            ..Default::default()
        };
        let mut stream = self.docker.logs(id, Some(options));
        let mut output = String::new();
        while let Some(chunk) = stream.next().await {
            match chunk.map_err(Self::backend)? {
                LogOutput::StdOut { message } | LogOutput::StdErr { message } => {
                    output.push_str(&String::from_utf8_lossy(&message));
                }
                _ => {}
            }
        }
        Ok(output)
    }

    async fn list_managed(&self) -> RuntimeResult<Vec<ContainerInfo>> {
        let mut filters = HashMap::new();
        filters.insert(
            "label".to_string(),
            vec![format!("{}={}", LABEL_MANAGED_BY, self.managed_label)],
        );
        let options = ListContainersOptions::<String> {
            all: true,
            filters,
            ..Default::default()
        };
        let summaries = self
            .docker
            .list_containers(Some(options))
            .await
            .map_err(Self::backend)?;
        Ok(summaries
            .into_iter()
            .map(|summary| ContainerInfo {
                id: summary.id.unwrap_or_default(),
                name: summary
                    .names
                    .unwrap_or_default()
                    .first()
                    .map(|name| name.trim_start_matches('/').to_string())
                    .unwrap_or_default(),
                status: summary
                    .state
                    .as_deref()
                    .map(Self::status_from_str)
                    .unwrap_or(ContainerStatus::Unknown),
                labels: summary.labels.unwrap_or_default(),
            })
            .collect())
    }
}
