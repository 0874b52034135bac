// nexus-fabric-core/src/runtime/mod.rs - Container lifecycle abstraction

pub mod docker;
pub mod memory;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

pub use docker::DockerRuntime;
pub use memory::MemoryRuntime;

/// Labels stamped onto every managed container so list_managed() can recover
/// the proxy's view after a restart.
pub const LABEL_MANAGED_BY: &str = "managed_by";
pub const LABEL_AGENT_ID: &str = "agent_id";
pub const LABEL_AGENT_KIND: &str = "agent_kind";

pub type RuntimeResult<T> = Result<T, RuntimeError>;

#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error("image pull failed: {0}")]
    Pull(String),
    #[error("container not found: {0}")]
    NotFound(String),
    #[error("invalid container spec: {0}")]
    InvalidSpec(String),
    #[error("operation not supported: {0}")]
    NotSupported(String),
    #[error("runtime backend error: {0}")]
    Backend(String),
}

impl RuntimeError {
    /// Short code carried back to the Nexus in command failure reports.
    pub fn code(&self) -> &'static str {
        match self {
            RuntimeError::Pull(_) => "PULL_FAILED",
            RuntimeError::NotFound(_) => "NOT_FOUND",
            RuntimeError::InvalidSpec(_) => "INVALID_SPEC",
            RuntimeError::NotSupported(_) => "NOT_SUPPORTED",
            RuntimeError::Backend(_) => "RUNTIME_ERROR",
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContainerSpec {
    pub name: String,
    pub image: String,
    /// KEY=VALUE pairs.
    pub env: Vec<String>,
    /// host:container port pairs.
    pub ports: Vec<String>,
    /// host:container bind mounts.
    pub volumes: Vec<String>,
    pub memory_mb: Option<i64>,
    pub cpu_shares: Option<i64>,
    pub restart_policy: Option<String>,
    pub labels: HashMap<String, String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContainerStatus {
    Created,
    Running,
    Exited,
    Dead,
    Unknown,
}

#[derive(Debug, Clone)]
pub struct ContainerState {
    pub id: String,
    pub status: ContainerStatus,
    pub exit_code: Option<i64>,
    pub image: String,
    pub env: Vec<String>,
    pub labels: HashMap<String, String>,
}

#[derive(Debug, Clone)]
pub struct ContainerInfo {
    pub id: String,
    pub name: String,
    pub status: ContainerStatus,
    pub labels: HashMap<String, String>,
}

/// The proxy's only door into a container runtime. Implementations must not
/// assume the caller serializes operations.
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    async fn pull_image(&self, reference: &str) -> RuntimeResult<()>;
    async fn create_container(&self, spec: &ContainerSpec) -> RuntimeResult<String>;
    async fn start_container(&self, id: &str) -> RuntimeResult<()>;
    /// SIGTERM, escalating to SIGKILL after the grace period.
    async fn stop_container(&self, id: &str, grace: Duration) -> RuntimeResult<()>;
    async fn remove_container(&self, id: &str) -> RuntimeResult<()>;
    async fn inspect_container(&self, id: &str) -> RuntimeResult<ContainerState>;
    async fn read_logs(&self, id: &str, tail: usize) -> RuntimeResult<String>;
    /// Containers carrying this fabric's managed_by label.
    async fn list_managed(&self) -> RuntimeResult<Vec<ContainerInfo>>;
}
