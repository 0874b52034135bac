// nexus-fabric-core/src/proxy/mod.rs - Node-side lifecycle controller

pub mod executor;
pub mod service;
pub mod telemetry;
pub mod watch;

use anyhow::Context;
use std::sync::Arc;
use std::time::Duration;
use sysinfo::System;
use tokio::sync::{mpsc, watch as watch_channel};
use tonic::transport::{Channel, Server};
use tonic::Request;
use tracing::{error, info, warn};

use crate::config::ProxyConfig;
use crate::fabric_proto::fabric::fabric_service_client::FabricServiceClient;
use crate::fabric_proto::fabric::node_proxy_service_server::NodeProxyServiceServer;
use crate::fabric_proto::fabric::{FabricCommand, NodeKind as WireNodeKind, RegisterNodeRequest};
use crate::runtime::ContainerRuntime;
use crate::state::NodeKind;

use executor::CommandExecutor;
use service::NodeProxyServiceImpl;

/// Owns the local agent containers for one host: registers with the Nexus,
/// then runs the telemetry heartbeat, the command executor behind the local
/// NodeProxyService, and the agent watch loop until shutdown.
pub struct NodeProxy {
    config: ProxyConfig,
    runtime: Arc<dyn ContainerRuntime>,
}

impl NodeProxy {
    pub fn new(config: ProxyConfig, runtime: Arc<dyn ContainerRuntime>) -> Self {
        Self { config, runtime }
    }

    pub async fn run(self, mut shutdown: watch_channel::Receiver<bool>) -> anyhow::Result<()> {
        let listen = self.config.listen_addr()?;
        let mut client = connect_with_retry(&self.config.nexus_addr).await?;

        let capabilities = if self.config.capabilities.is_empty() {
            host_capabilities()
        } else {
            self.config.capabilities.clone()
        };
        let kind: WireNodeKind = NodeKind::parse(&self.config.node_kind).into();
        let registration = client
            .register_node(Request::new(RegisterNodeRequest {
                kind: kind as i32,
                address: self.config.advertised_addr(),
                capabilities,
                proxy_addr: self.config.advertised_addr(),
            }))
            .await
            .context("node registration failed")?
            .into_inner();
        let node_id = registration.node_id;
        info!(%node_id, "registered with nexus");

        // A restarted proxy rediscovers its containers through the labels.
        match self.runtime.list_managed().await {
            Ok(managed) => info!(count = managed.len(), "managed containers recovered"),
            Err(err) => warn!(error = %err, "could not list managed containers"),
        }

        let (command_tx, mut command_rx) =
            mpsc::channel::<FabricCommand>(self.config.executor_queue_depth);
        let executor = Arc::new(CommandExecutor::new(
            Arc::clone(&self.runtime),
            client.clone(),
            self.config.managed_label.clone(),
        ));

        let command_service = NodeProxyServiceImpl::new(command_tx);
        let mut server_shutdown = shutdown.clone();
        let server = tokio::spawn(async move {
            let result = Server::builder()
                .add_service(NodeProxyServiceServer::new(command_service))
                .serve_with_shutdown(listen, async move {
                    while server_shutdown.changed().await.is_ok() {
                        if *server_shutdown.borrow() {
                            break;
                        }
                    }
                })
                .await;
            if let Err(err) = result {
                error!(error = %err, "proxy command server failed");
            }
        });

        let heartbeat = tokio::spawn(telemetry::run_heartbeat(
            client.clone(),
            node_id.clone(),
            self.config.telemetry_interval(),
            shutdown.clone(),
        ));

        let agent_watch = tokio::spawn(watch::run_agent_watch(
            Arc::clone(&self.runtime),
            client.clone(),
            self.config.agent_poll_interval(),
            shutdown.clone(),
        ));

        let mut executor_shutdown = shutdown.clone();
        let executor_loop = tokio::spawn(async move {
            loop {
                tokio::select! {
                    command = command_rx.recv() => match command {
                        Some(command) => executor.execute(command).await,
                        None => break,
                    },
                    changed = executor_shutdown.changed() => {
                        if changed.is_err() || *executor_shutdown.borrow() {
                            break;
                        }
                    }
                }
            }
        });

        info!(%listen, "proxy ready; waiting for commands");
        loop {
            if shutdown.changed().await.is_err() || *shutdown.borrow() {
                break;
            }
        }
        info!("proxy shutting down");
        let _ = tokio::join!(server, heartbeat, agent_watch, executor_loop);
        Ok(())
    }
}

async fn connect_with_retry(addr: &str) -> anyhow::Result<FabricServiceClient<Channel>> {
    let mut delay = Duration::from_millis(500);
    for attempt in 1..=8u32 {
        match FabricServiceClient::connect(addr.to_string()).await {
            Ok(client) => return Ok(client),
            Err(err) => {
                warn!(attempt, error = %err, "nexus not reachable; backing off");
                tokio::time::sleep(delay).await;
                delay = (delay * 2).min(Duration::from_secs(10));
            }
        }
    }
    anyhow::bail!("could not reach nexus at {addr}")
}

/// Default self-reported capability string when none is configured.
fn host_capabilities() -> String {
    let mut system = System::new_all();
    system.refresh_all();
    let host = hostname::get()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|_| "unknown".to_string());
    serde_json::json!({
        "host": host,
        "os": System::name().unwrap_or_default(),
        "cpu": system.cpus().len(),
        "ram_gb": system.total_memory() / (1024 * 1024 * 1024),
    })
    .to_string()
}
