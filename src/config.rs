// nexus-fabric-core/src/config.rs - Configuration management for the Nexus and node proxies

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::Duration;

use crate::error::{FabricError, FabricResult};

/// Nexus-side configuration. Every key can be overridden by an environment
/// variable with the upper-cased name, or by a config file with identical keys.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NexusConfig {
    pub grpc_listen_addr: String,
    /// Per-subscriber event queue depth.
    pub stream_buffer: usize,
    /// Per-proxy command backlog.
    pub command_queue_depth: usize,
    pub command_deadline_seconds: u64,
    /// How long a proxy may take to ack ExecuteCommand.
    pub proxy_ack_timeout_seconds: u64,
    pub stale_after_node_seconds: u64,
    pub stale_after_agent_seconds: u64,
    pub retain_terminated_seconds: u64,
    pub prune_interval_seconds: u64,
    pub snapshot_prelude_on_subscribe: bool,
}

impl Default for NexusConfig {
    fn default() -> Self {
        Self {
            grpc_listen_addr: ":50053".to_string(),
            stream_buffer: 256,
            command_queue_depth: 64,
            command_deadline_seconds: 60,
            proxy_ack_timeout_seconds: 30,
            stale_after_node_seconds: 300,
            stale_after_agent_seconds: 600,
            retain_terminated_seconds: 3600,
            prune_interval_seconds: 60,
            snapshot_prelude_on_subscribe: false,
        }
    }
}

impl NexusConfig {
    pub fn load(path: Option<&str>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path));
        }
        let cfg = builder.add_source(config::Environment::default()).build()?;
        cfg.try_deserialize()
    }

    /// Bind address; a bare `:port` form binds all interfaces.
    pub fn listen_addr(&self) -> FabricResult<SocketAddr> {
        let raw = if self.grpc_listen_addr.starts_with(':') {
            format!("0.0.0.0{}", self.grpc_listen_addr)
        } else {
            self.grpc_listen_addr.clone()
        };
        raw.parse()
            .map_err(|_| FabricError::Validation(format!("bad grpc_listen_addr: {raw}")))
    }

    pub fn command_deadline(&self) -> Duration {
        Duration::from_secs(self.command_deadline_seconds)
    }

    pub fn proxy_ack_timeout(&self) -> Duration {
        Duration::from_secs(self.proxy_ack_timeout_seconds)
    }

    pub fn prune_interval(&self) -> Duration {
        Duration::from_secs(self.prune_interval_seconds)
    }

    pub fn stale_after_node(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.stale_after_node_seconds as i64)
    }

    pub fn stale_after_agent(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.stale_after_agent_seconds as i64)
    }

    pub fn retain_terminated(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.retain_terminated_seconds as i64)
    }
}

/// Proxy-side configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    /// Nexus gRPC endpoint, e.g. `http://127.0.0.1:50053`.
    pub nexus_addr: String,
    /// Bind address for the local NodeProxyService.
    pub proxy_listen_addr: String,
    /// Address advertised to the Nexus; defaults to proxy_listen_addr.
    pub advertise_addr: String,
    /// One of HEAVY_HOST, LIGHT_HOST, AGENT_PROXY.
    pub node_kind: String,
    /// Self-reported capability string; filled from the host when empty.
    pub capabilities: String,
    pub telemetry_interval_seconds: u64,
    pub agent_poll_interval_seconds: u64,
    /// Fabric name stamped into the managed_by container label.
    pub managed_label: String,
    /// Depth of the local executor queue.
    pub executor_queue_depth: usize,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            nexus_addr: "http://127.0.0.1:50053".to_string(),
            proxy_listen_addr: "0.0.0.0:50071".to_string(),
            advertise_addr: String::new(),
            node_kind: "HEAVY_HOST".to_string(),
            capabilities: String::new(),
            telemetry_interval_seconds: 10,
            agent_poll_interval_seconds: 15,
            managed_label: "nexus-fabric".to_string(),
            executor_queue_depth: 64,
        }
    }
}

impl ProxyConfig {
    pub fn load(path: Option<&str>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path));
        }
        let cfg = builder.add_source(config::Environment::default()).build()?;
        cfg.try_deserialize()
    }

    pub fn advertised_addr(&self) -> String {
        if self.advertise_addr.is_empty() {
            self.proxy_listen_addr.clone()
        } else {
            self.advertise_addr.clone()
        }
    }

    pub fn telemetry_interval(&self) -> Duration {
        Duration::from_secs(self.telemetry_interval_seconds)
    }

    pub fn agent_poll_interval(&self) -> Duration {
        Duration::from_secs(self.agent_poll_interval_seconds)
    }

    pub fn listen_addr(&self) -> FabricResult<SocketAddr> {
        self.proxy_listen_addr
            .parse()
            .map_err(|_| FabricError::Validation(format!("bad proxy_listen_addr: {}", self.proxy_listen_addr)))
    }
}
