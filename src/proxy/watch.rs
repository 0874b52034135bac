// nexus-fabric-core/src/proxy/watch.rs - Reconciles managed containers to agent status updates

use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tonic::transport::Channel;
use tonic::Request;
use tracing::{debug, info, warn};

use crate::fabric_proto::fabric::fabric_service_client::FabricServiceClient;
use crate::fabric_proto::fabric::{StatusTarget, UpdateStatusRequest};
use crate::runtime::{ContainerRuntime, ContainerStatus, LABEL_AGENT_ID};

/// Polls the runtime for state changes in managed containers and mirrors
/// them to the Nexus as agent status updates. Only transitions are reported.
pub async fn run_agent_watch(
    runtime: Arc<dyn ContainerRuntime>,
    client: FabricServiceClient<Channel>,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    info!(?interval, "agent watch loop started");
    let mut known: HashMap<String, &'static str> = HashMap::new();
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                sweep(&runtime, &client, &mut known).await;
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }
    }
    info!("agent watch loop stopped");
}

async fn sweep(
    runtime: &Arc<dyn ContainerRuntime>,
    client: &FabricServiceClient<Channel>,
    known: &mut HashMap<String, &'static str>,
) {
    let managed = match runtime.list_managed().await {
        Ok(managed) => managed,
        Err(err) => {
            warn!(error = %err, "could not list managed containers");
            return;
        }
    };
    for info in managed {
        let Some(agent_id) = info.labels.get(LABEL_AGENT_ID).cloned() else {
            continue;
        };
        let exit_code = if info.status == ContainerStatus::Exited {
            match runtime.inspect_container(&info.id).await {
                Ok(state) => state.exit_code,
                Err(err) => {
                    debug!(container = %info.id, error = %err, "inspect failed during sweep");
                    continue;
                }
            }
        } else {
            None
        };
        let Some(status) = classify(info.status, exit_code) else {
            continue;
        };
        if known.get(agent_id.as_str()).copied() == Some(status) {
            continue;
        }
        let request = UpdateStatusRequest {
            id: agent_id.clone(),
            target: StatusTarget::Agent as i32,
            status_value: status.to_string(),
            telemetry: None,
            current_task: None,
            task_progress: None,
            timestamp: Utc::now().to_rfc3339(),
        };
        let mut client = client.clone();
        match client.update_status(Request::new(request)).await {
            Ok(_) => {
                debug!(%agent_id, status, "agent transition reported");
                known.insert(agent_id, status);
            }
            Err(err) => warn!(%agent_id, error = %err, "agent status report failed"),
        }
    }
}

/// Container state to agent status, as seen from the runtime. A clean exit
/// is a terminated agent; anything else that stopped is an error.
fn classify(status: ContainerStatus, exit_code: Option<i64>) -> Option<&'static str> {
    match status {
        ContainerStatus::Created => Some("PENDING"),
        ContainerStatus::Running => Some("RUNNING"),
        ContainerStatus::Dead => Some("ERROR"),
        ContainerStatus::Exited => match exit_code {
            Some(0) => Some("TERMINATED"),
            _ => Some("ERROR"),
        },
        ContainerStatus::Unknown => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::{ContainerSpec, MemoryRuntime};
    use tonic::transport::Endpoint;

    #[test]
    fn classification_matches_the_agent_state_machine() {
        assert_eq!(classify(ContainerStatus::Created, None), Some("PENDING"));
        assert_eq!(classify(ContainerStatus::Running, None), Some("RUNNING"));
        assert_eq!(classify(ContainerStatus::Exited, Some(0)), Some("TERMINATED"));
        assert_eq!(classify(ContainerStatus::Exited, Some(137)), Some("ERROR"));
        assert_eq!(classify(ContainerStatus::Exited, None), Some("ERROR"));
        assert_eq!(classify(ContainerStatus::Dead, None), Some("ERROR"));
        assert_eq!(classify(ContainerStatus::Unknown, None), None);
    }

    async fn deploy(runtime: &MemoryRuntime, agent_id: &str) -> String {
        let mut labels = HashMap::new();
        labels.insert(LABEL_AGENT_ID.to_string(), agent_id.to_string());
        let id = runtime
            .create_container(&ContainerSpec {
                name: agent_id.to_string(),
                image: "registry.local/agent:1".to_string(),
                labels,
                ..ContainerSpec::default()
            })
            .await
            .unwrap();
        runtime.start_container(&id).await.unwrap();
        id
    }

    #[tokio::test]
    async fn sweep_reports_transitions_once() {
        let runtime: Arc<MemoryRuntime> = Arc::new(MemoryRuntime::new("test-fabric"));
        let dyn_runtime: Arc<dyn ContainerRuntime> = Arc::clone(&runtime) as _;
        let client =
            FabricServiceClient::new(Endpoint::from_static("http://127.0.0.1:59999").connect_lazy());
        let mut known = HashMap::new();
        let container = deploy(&runtime, "a1").await;

        // The report itself fails (no Nexus behind the lazy channel), so the
        // transition must not be recorded as delivered.
        sweep(&dyn_runtime, &client, &mut known).await;
        assert!(known.is_empty());

        // Simulate a crash; the sweep classifies a non-zero exit as ERROR.
        runtime.set_exited(&container, 137);
        sweep(&dyn_runtime, &client, &mut known).await;
        assert!(known.is_empty());
    }
}
