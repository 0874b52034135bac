// nexus-fabric-core/src/proxy/executor.rs - Maps fabric commands onto the container runtime

use chrono::Utc;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tonic::transport::Channel;
use tonic::Request;
use tracing::{debug, info, warn};

use crate::fabric_proto::fabric::fabric_service_client::FabricServiceClient;
use crate::fabric_proto::fabric::{
    CommandKind, CommandResultReport, FabricCommand, StatusTarget, UpdateStatusRequest,
};
use crate::runtime::{
    ContainerInfo, ContainerRuntime, ContainerSpec, ContainerStatus, RuntimeError,
    RuntimeResult, LABEL_AGENT_ID, LABEL_AGENT_KIND,
};

const DEFAULT_STOP_GRACE_SECONDS: u64 = 30;

/// Executes one command at a time against the local runtime and reports the
/// terminal result back to the Nexus, keyed by command id.
pub struct CommandExecutor {
    runtime: Arc<dyn ContainerRuntime>,
    client: FabricServiceClient<Channel>,
    managed_label: String,
    /// Last deployed spec per agent, so RESTART_AGENT can re-create with the
    /// prior configuration.
    deployed: Mutex<HashMap<String, ContainerSpec>>,
}

impl CommandExecutor {
    pub fn new(
        runtime: Arc<dyn ContainerRuntime>,
        client: FabricServiceClient<Channel>,
        managed_label: String,
    ) -> Self {
        Self {
            runtime,
            client,
            managed_label,
            deployed: Mutex::new(HashMap::new()),
        }
    }

    pub async fn execute(&self, command: FabricCommand) {
        info!(
            command_id = %command.command_id,
            kind = command.kind().as_str_name(),
            "executing command"
        );
        let outcome = match command.kind() {
            // A migration arriving here is its deployment half; the dispatcher
            // already stopped the agent on the source node.
            CommandKind::DeployAgent | CommandKind::MigrateAgent => self.deploy(&command).await,
            CommandKind::StopAgent => self.stop(&command).await,
            CommandKind::RestartAgent => self.restart(&command).await,
            CommandKind::RebootNode => Err(RuntimeError::NotSupported("REBOOT_NODE".to_string())),
            CommandKind::SetPriority => {
                Err(RuntimeError::NotSupported("SET_PRIORITY".to_string()))
            }
            CommandKind::Scale => Err(RuntimeError::NotSupported("SCALE".to_string())),
            CommandKind::Unspecified => {
                Err(RuntimeError::NotSupported("unspecified command kind".to_string()))
            }
        };
        match outcome {
            Ok(details) => {
                self.report(&command.command_id, true, String::new(), details)
                    .await;
            }
            Err(err) => {
                warn!(command_id = %command.command_id, error = %err, "command failed");
                let mut details = HashMap::new();
                details.insert("detail".to_string(), err.to_string());
                self.report(&command.command_id, false, err.code().to_string(), details)
                    .await;
            }
        }
    }

    fn spec_from_parameters(
        &self,
        agent_id: &str,
        parameters: &HashMap<String, String>,
    ) -> RuntimeResult<ContainerSpec> {
        let image = parameters
            .get("image")
            .cloned()
            .ok_or_else(|| RuntimeError::InvalidSpec("missing image parameter".to_string()))?;
        let mut labels = HashMap::new();
        labels.insert(LABEL_AGENT_ID.to_string(), agent_id.to_string());
        labels.insert(
            LABEL_AGENT_KIND.to_string(),
            parameters.get("agent_kind").cloned().unwrap_or_default(),
        );
        if let Some(extra) = parameters.get("labels") {
            for pair in extra.split(',') {
                if let Some((key, value)) = pair.split_once('=') {
                    labels.insert(key.trim().to_string(), value.trim().to_string());
                }
            }
        }
        Ok(ContainerSpec {
            name: format!("{}-{}", self.managed_label, agent_id),
            image,
            env: split_list(parameters.get("env")),
            ports: split_list(parameters.get("ports")),
            volumes: split_list(parameters.get("volumes")),
            memory_mb: parameters.get("memory_mb").and_then(|raw| raw.parse().ok()),
            cpu_shares: parameters.get("cpu_shares").and_then(|raw| raw.parse().ok()),
            restart_policy: parameters.get("restart_policy").cloned(),
            labels,
        })
    }

    async fn find_container(&self, agent_id: &str) -> RuntimeResult<Option<ContainerInfo>> {
        Ok(self
            .runtime
            .list_managed()
            .await?
            .into_iter()
            .find(|info| info.labels.get(LABEL_AGENT_ID).map(String::as_str) == Some(agent_id)))
    }

    async fn deploy(&self, command: &FabricCommand) -> RuntimeResult<HashMap<String, String>> {
        let agent_id = command.target_id.clone();
        let spec = self.spec_from_parameters(&agent_id, &command.parameters)?;
        self.runtime.pull_image(&spec.image).await?;
        if let Some(existing) = self.find_container(&agent_id).await? {
            debug!(%agent_id, container = %existing.id, "replacing existing container");
            let _ = self
                .runtime
                .stop_container(&existing.id, Duration::from_secs(5))
                .await;
            self.runtime.remove_container(&existing.id).await?;
        }
        let container_id = self.start_fresh(&spec).await?;
        self.deployed.lock().insert(agent_id.clone(), spec);
        self.update_agent(&agent_id, "RUNNING").await;
        let mut details = HashMap::new();
        details.insert("container_id".to_string(), container_id);
        Ok(details)
    }

    async fn stop(&self, command: &FabricCommand) -> RuntimeResult<HashMap<String, String>> {
        let agent_id = command.target_id.as_str();
        let grace = command
            .parameters
            .get("grace_seconds")
            .and_then(|raw| raw.parse().ok())
            .unwrap_or(DEFAULT_STOP_GRACE_SECONDS);
        let container = self
            .find_container(agent_id)
            .await?
            .ok_or_else(|| RuntimeError::NotFound(agent_id.to_string()))?;
        self.runtime
            .stop_container(&container.id, Duration::from_secs(grace))
            .await?;
        self.update_agent(agent_id, "TERMINATED").await;
        let mut details = HashMap::new();
        details.insert("container_id".to_string(), container.id);
        Ok(details)
    }

    async fn restart(&self, command: &FabricCommand) -> RuntimeResult<HashMap<String, String>> {
        let agent_id = command.target_id.clone();
        let prior = self.deployed.lock().get(&agent_id).cloned();
        let existing = self.find_container(&agent_id).await?;
        let spec = match prior {
            Some(spec) => spec,
            None => {
                // Rebuild what we can from the labelled container itself.
                let container = existing
                    .as_ref()
                    .ok_or_else(|| RuntimeError::NotFound(agent_id.clone()))?;
                let state = self.runtime.inspect_container(&container.id).await?;
                ContainerSpec {
                    name: container.name.clone(),
                    image: state.image,
                    env: state.env,
                    labels: state.labels,
                    ..ContainerSpec::default()
                }
            }
        };
        if let Some(container) = existing {
            let _ = self
                .runtime
                .stop_container(&container.id, Duration::from_secs(10))
                .await;
            self.runtime.remove_container(&container.id).await?;
        }
        let container_id = self.start_fresh(&spec).await?;
        self.deployed.lock().insert(agent_id.clone(), spec);
        self.update_agent(&agent_id, "RUNNING").await;
        let mut details = HashMap::new();
        details.insert("container_id".to_string(), container_id);
        Ok(details)
    }

    async fn start_fresh(&self, spec: &ContainerSpec) -> RuntimeResult<String> {
        let container_id = self.runtime.create_container(spec).await?;
        self.runtime.start_container(&container_id).await?;
        let state = self.runtime.inspect_container(&container_id).await?;
        if state.status != ContainerStatus::Running {
            return Err(RuntimeError::Backend(format!(
                "container {container_id} did not reach running state"
            )));
        }
        Ok(container_id)
    }

    async fn update_agent(&self, agent_id: &str, status: &str) {
        let mut client = self.client.clone();
        let request = UpdateStatusRequest {
            id: agent_id.to_string(),
            target: StatusTarget::Agent as i32,
            status_value: status.to_string(),
            telemetry: None,
            current_task: None,
            task_progress: None,
            timestamp: Utc::now().to_rfc3339(),
        };
        if let Err(err) = client.update_status(Request::new(request)).await {
            warn!(agent_id, error = %err, "agent status report failed");
        }
    }

    async fn report(
        &self,
        command_id: &str,
        success: bool,
        error: String,
        details: HashMap<String, String>,
    ) {
        let mut client = self.client.clone();
        let report = CommandResultReport {
            command_id: command_id.to_string(),
            success,
            error,
            details,
        };
        if let Err(err) = client.report_command_result(Request::new(report)).await {
            warn!(command_id, error = %err, "command result report failed");
        }
    }
}

fn split_list(raw: Option<&String>) -> Vec<String> {
    raw.map(|value| {
        value
            .split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(str::to_string)
            .collect()
    })
    .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::MemoryRuntime;
    use tonic::transport::Endpoint;

    fn executor(runtime: Arc<MemoryRuntime>) -> CommandExecutor {
        // Reports go nowhere in unit tests; the channel is lazy and failures
        // are logged, not raised.
        let channel = Endpoint::from_static("http://127.0.0.1:59999").connect_lazy();
        CommandExecutor::new(
            runtime,
            FabricServiceClient::new(channel),
            "test-fabric".to_string(),
        )
    }

    fn deploy_command(agent_id: &str, image: &str) -> FabricCommand {
        let mut parameters = HashMap::new();
        parameters.insert("image".to_string(), image.to_string());
        parameters.insert("agent_kind".to_string(), "vision".to_string());
        parameters.insert("env".to_string(), "MODE=prod,THREADS=4".to_string());
        FabricCommand {
            command_id: format!("cmd-{agent_id}"),
            target_id: agent_id.to_string(),
            kind: CommandKind::DeployAgent as i32,
            parameters,
            issued_at: Utc::now().to_rfc3339(),
        }
    }

    #[tokio::test]
    async fn deploy_creates_a_labelled_running_container() {
        let runtime = Arc::new(MemoryRuntime::new("test-fabric"));
        let executor = executor(Arc::clone(&runtime));
        executor
            .deploy(&deploy_command("a1", "registry.local/vision:1"))
            .await
            .unwrap();
        let managed = runtime.list_managed().await.unwrap();
        assert_eq!(managed.len(), 1);
        assert_eq!(managed[0].status, ContainerStatus::Running);
        assert_eq!(managed[0].labels[LABEL_AGENT_ID], "a1");
        assert_eq!(managed[0].labels[LABEL_AGENT_KIND], "vision");
    }

    #[tokio::test]
    async fn redeploy_replaces_the_previous_container() {
        let runtime = Arc::new(MemoryRuntime::new("test-fabric"));
        let executor = executor(Arc::clone(&runtime));
        executor
            .deploy(&deploy_command("a1", "registry.local/vision:1"))
            .await
            .unwrap();
        executor
            .deploy(&deploy_command("a1", "registry.local/vision:2"))
            .await
            .unwrap();
        let managed = runtime.list_managed().await.unwrap();
        assert_eq!(managed.len(), 1);
        let state = runtime.inspect_container(&managed[0].id).await.unwrap();
        assert_eq!(state.image, "registry.local/vision:2");
    }

    #[tokio::test]
    async fn deploy_without_image_is_an_invalid_spec() {
        let runtime = Arc::new(MemoryRuntime::new("test-fabric"));
        let executor = executor(runtime);
        let mut command = deploy_command("a1", "registry.local/vision:1");
        command.parameters.remove("image");
        let err = executor.deploy(&command).await.unwrap_err();
        assert!(matches!(err, RuntimeError::InvalidSpec(_)));
    }

    #[tokio::test]
    async fn failed_pull_surfaces_as_pull_error() {
        let runtime = Arc::new(MemoryRuntime::new("test-fabric"));
        runtime.fail_pull("registry.local/vision:1");
        let executor = executor(runtime);
        let err = executor
            .deploy(&deploy_command("a1", "registry.local/vision:1"))
            .await
            .unwrap_err();
        assert!(matches!(err, RuntimeError::Pull(_)));
    }

    #[tokio::test]
    async fn stop_terminates_the_agent_container() {
        let runtime = Arc::new(MemoryRuntime::new("test-fabric"));
        let executor = executor(Arc::clone(&runtime));
        executor
            .deploy(&deploy_command("a1", "registry.local/vision:1"))
            .await
            .unwrap();
        let stop = FabricCommand {
            command_id: "cmd-stop".to_string(),
            target_id: "a1".to_string(),
            kind: CommandKind::StopAgent as i32,
            parameters: HashMap::new(),
            issued_at: Utc::now().to_rfc3339(),
        };
        executor.stop(&stop).await.unwrap();
        let managed = runtime.list_managed().await.unwrap();
        assert_eq!(managed[0].status, ContainerStatus::Exited);
    }

    #[tokio::test]
    async fn restart_reuses_the_prior_spec() {
        let runtime = Arc::new(MemoryRuntime::new("test-fabric"));
        let executor = executor(Arc::clone(&runtime));
        executor
            .deploy(&deploy_command("a1", "registry.local/vision:1"))
            .await
            .unwrap();
        let restart = FabricCommand {
            command_id: "cmd-restart".to_string(),
            target_id: "a1".to_string(),
            kind: CommandKind::RestartAgent as i32,
            parameters: HashMap::new(),
            issued_at: Utc::now().to_rfc3339(),
        };
        executor.restart(&restart).await.unwrap();
        let managed = runtime.list_managed().await.unwrap();
        assert_eq!(managed.len(), 1);
        assert_eq!(managed[0].status, ContainerStatus::Running);
        let state = runtime.inspect_container(&managed[0].id).await.unwrap();
        assert_eq!(state.image, "registry.local/vision:1");
        assert!(state.env.contains(&"MODE=prod".to_string()));
    }

    #[tokio::test]
    async fn reboot_node_is_not_supported() {
        let runtime = Arc::new(MemoryRuntime::new("test-fabric"));
        let executor = executor(runtime);
        // execute() swallows the error into a failure report; the mapping
        // itself is what matters here.
        let command = FabricCommand {
            command_id: "cmd-reboot".to_string(),
            target_id: "node-1".to_string(),
            kind: CommandKind::RebootNode as i32,
            parameters: HashMap::new(),
            issued_at: Utc::now().to_rfc3339(),
        };
        executor.execute(command).await;
    }
}
