// nexus-fabric-core/src/bin/fabric_proxy.rs - Node-side proxy binary

use anyhow::Context;
use clap::Parser;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::info;

use nexus_fabric_core::proxy::NodeProxy;
use nexus_fabric_core::runtime::{ContainerRuntime, DockerRuntime, MemoryRuntime};
use nexus_fabric_core::ProxyConfig;

#[derive(Parser, Debug)]
#[command(name = "fabric-proxy", about = "Node-side fabric proxy")]
struct Cli {
    /// Override config file path (TOML; keys match the documented options)
    #[arg(long)]
    config: Option<String>,

    /// Container backend: docker or memory
    #[arg(long, default_value = "docker")]
    runtime: String,

    /// Enable verbose debug logging
    #[arg(long, short = 'v')]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new(format!(
                    "fabric_proxy={log_level},nexus_fabric_core={log_level},info"
                ))
            }),
        )
        .init();

    let config =
        ProxyConfig::load(cli.config.as_deref()).context("failed to load configuration")?;
    info!(
        nexus = %config.nexus_addr,
        listen = %config.proxy_listen_addr,
        kind = %config.node_kind,
        "fabric proxy starting"
    );

    let runtime: Arc<dyn ContainerRuntime> = match cli.runtime.as_str() {
        "memory" => Arc::new(MemoryRuntime::new(&config.managed_label)),
        _ => Arc::new(DockerRuntime::connect(&config.managed_label)?),
    };

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let proxy = NodeProxy::new(config, runtime);
    let run = tokio::spawn(proxy.run(shutdown_rx));

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;
    info!("shutdown signal received");
    let _ = shutdown_tx.send(true);
    run.await??;
    info!("fabric proxy stopped");
    Ok(())
}
