// nexus-fabric-core/src/runtime/memory.rs - In-memory container runtime for tests and dev

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::time::Duration;

use super::{
    ContainerInfo, ContainerRuntime, ContainerSpec, ContainerState, ContainerStatus,
    RuntimeError, RuntimeResult, LABEL_MANAGED_BY,
};

#[derive(Debug, Clone)]
struct FakeContainer {
    id: String,
    name: String,
    spec: ContainerSpec,
    status: ContainerStatus,
    exit_code: Option<i64>,
    logs: String,
}

#[derive(Default)]
struct MemoryInner {
    images: HashSet<String>,
    containers: HashMap<String, FakeContainer>,
    fail_pulls: HashSet<String>,
    next_id: u64,
}

/// Pure in-memory stand-in for a container runtime. Supports the failure
/// injection the executor and watch-loop tests need.
pub struct MemoryRuntime {
    managed_label: String,
    inner: Mutex<MemoryInner>,
}

impl MemoryRuntime {
    pub fn new(managed_label: &str) -> Self {
        Self {
            managed_label: managed_label.to_string(),
            inner: Mutex::new(MemoryInner::default()),
        }
    }

    /// The next pull of this reference fails.
    pub fn fail_pull(&self, reference: &str) {
        self.inner.lock().fail_pulls.insert(reference.to_string());
    }

    /// Simulates a container exiting on its own.
    pub fn set_exited(&self, id: &str, exit_code: i64) {
        let mut inner = self.inner.lock();
        if let Some(container) = inner.containers.get_mut(id) {
            container.status = ContainerStatus::Exited;
            container.exit_code = Some(exit_code);
        }
    }

    pub fn append_logs(&self, id: &str, line: &str) {
        let mut inner = self.inner.lock();
        if let Some(container) = inner.containers.get_mut(id) {
            container.logs.push_str(line);
            container.logs.push('\n');
        }
    }

    pub fn container_count(&self) -> usize {
        self.inner.lock().containers.len()
    }
}

#[async_trait]
impl ContainerRuntime for MemoryRuntime {
    async fn pull_image(&self, reference: &str) -> RuntimeResult<()> {
        let mut inner = self.inner.lock();
        if inner.fail_pulls.remove(reference) {
            return Err(RuntimeError::Pull(format!("injected failure for {reference}")));
        }
        inner.images.insert(reference.to_string());
        Ok(())
    }

    async fn create_container(&self, spec: &ContainerSpec) -> RuntimeResult<String> {
        if spec.image.is_empty() {
            return Err(RuntimeError::InvalidSpec("missing image".to_string()));
        }
        let mut inner = self.inner.lock();
        inner.next_id += 1;
        let id = format!("mem-{}", inner.next_id);
        let mut spec = spec.clone();
        spec.labels
            .insert(LABEL_MANAGED_BY.to_string(), self.managed_label.clone());
        inner.containers.insert(
            id.clone(),
            FakeContainer {
                id: id.clone(),
                name: spec.name.clone(),
                spec,
                status: ContainerStatus::Created,
                exit_code: None,
                logs: String::new(),
            },
        );
        Ok(id)
    }

    async fn start_container(&self, id: &str) -> RuntimeResult<()> {
        let mut inner = self.inner.lock();
        let container = inner
            .containers
            .get_mut(id)
            .ok_or_else(|| RuntimeError::NotFound(id.to_string()))?;
        container.status = ContainerStatus::Running;
        Ok(())
    }

    async fn stop_container(&self, id: &str, _grace: Duration) -> RuntimeResult<()> {
        let mut inner = self.inner.lock();
        let container = inner
            .containers
            .get_mut(id)
            .ok_or_else(|| RuntimeError::NotFound(id.to_string()))?;
        container.status = ContainerStatus::Exited;
        container.exit_code = Some(0);
        Ok(())
    }

    async fn remove_container(&self, id: &str) -> RuntimeResult<()> {
        let mut inner = self.inner.lock();
        inner
            .containers
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| RuntimeError::NotFound(id.to_string()))
    }

    async fn inspect_container(&self, id: &str) -> RuntimeResult<ContainerState> {
        let inner = self.inner.lock();
        let container = inner
            .containers
            .get(id)
            .ok_or_else(|| RuntimeError::NotFound(id.to_string()))?;
        Ok(ContainerState {
            id: container.id.clone(),
            status: container.status,
            exit_code: container.exit_code,
            image: container.spec.image.clone(),
            env: container.spec.env.clone(),
            labels: container.spec.labels.clone(),
        })
    }

    async fn read_logs(&self, id: &str, tail: usize) -> RuntimeResult<String> {
        let inner = self.inner.lock();
        let container = inner
            .containers
            .get(id)
            .ok_or_else(|| RuntimeError::NotFound(id.to_string()))?;
        let lines: Vec<&str> = container.logs.lines().collect();
        let start = lines.len().saturating_sub(tail);
        Ok(lines[start..].join("\n"))
    }

    async fn list_managed(&self) -> RuntimeResult<Vec<ContainerInfo>> {
        let inner = self.inner.lock();
        let mut managed: Vec<ContainerInfo> = inner
            .containers
            .values()
            .filter(|container| {
                container.spec.labels.get(LABEL_MANAGED_BY) == Some(&self.managed_label)
            })
            .map(|container| ContainerInfo {
                id: container.id.clone(),
                name: container.name.clone(),
                status: container.status,
                labels: container.spec.labels.clone(),
            })
            .collect();
        managed.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(managed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::LABEL_AGENT_ID;

    fn spec(name: &str) -> ContainerSpec {
        let mut labels = HashMap::new();
        labels.insert(LABEL_AGENT_ID.to_string(), name.to_string());
        ContainerSpec {
            name: name.to_string(),
            image: "registry.local/agent:1".to_string(),
            labels,
            ..ContainerSpec::default()
        }
    }

    #[tokio::test]
    async fn lifecycle_round_trip() {
        let runtime = MemoryRuntime::new("test-fabric");
        runtime.pull_image("registry.local/agent:1").await.unwrap();
        let id = runtime.create_container(&spec("a1")).await.unwrap();
        runtime.start_container(&id).await.unwrap();
        assert_eq!(
            runtime.inspect_container(&id).await.unwrap().status,
            ContainerStatus::Running
        );
        runtime
            .stop_container(&id, Duration::from_secs(1))
            .await
            .unwrap();
        let state = runtime.inspect_container(&id).await.unwrap();
        assert_eq!(state.status, ContainerStatus::Exited);
        assert_eq!(state.exit_code, Some(0));
        runtime.remove_container(&id).await.unwrap();
        assert!(matches!(
            runtime.inspect_container(&id).await,
            Err(RuntimeError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn injected_pull_failure_fires_once() {
        let runtime = MemoryRuntime::new("test-fabric");
        runtime.fail_pull("img");
        assert!(matches!(
            runtime.pull_image("img").await,
            Err(RuntimeError::Pull(_))
        ));
        runtime.pull_image("img").await.unwrap();
    }

    #[tokio::test]
    async fn list_managed_filters_by_label() {
        let runtime = MemoryRuntime::new("test-fabric");
        runtime.create_container(&spec("a1")).await.unwrap();
        runtime.create_container(&spec("a2")).await.unwrap();
        let managed = runtime.list_managed().await.unwrap();
        assert_eq!(managed.len(), 2);
        assert!(managed
            .iter()
            .all(|info| info.labels.contains_key(LABEL_AGENT_ID)));
    }

    #[tokio::test]
    async fn tail_limits_log_lines() {
        let runtime = MemoryRuntime::new("test-fabric");
        let id = runtime.create_container(&spec("a1")).await.unwrap();
        for n in 0..5 {
            runtime.append_logs(&id, &format!("line-{n}"));
        }
        let tail = runtime.read_logs(&id, 2).await.unwrap();
        assert_eq!(tail, "line-3\nline-4");
    }
}
