// nexus-fabric-core/src/main.rs - The Nexus orchestrator binary

use anyhow::Context;
use clap::Parser;
use tokio::sync::{oneshot, watch};
use tracing::{error, info};

use nexus_fabric_core::manager::FabricManager;
use nexus_fabric_core::{pruner, server, NexusConfig};

#[derive(Parser, Debug)]
#[command(name = "nexus-fabric-core", about = "Fabric coordination nexus")]
struct Cli {
    /// Override config file path (TOML; keys match the documented options)
    #[arg(long)]
    config: Option<String>,

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
                tracing_subscriber::EnvFilter::new(format!("nexus_fabric_core={log_level},info"))
            }),
        )
        .init();

    let config =
        NexusConfig::load(cli.config.as_deref()).context("failed to load configuration")?;
    info!(addr = %config.grpc_listen_addr, "nexus fabric core starting");

    let manager = FabricManager::new(config.clone());

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let pruner_handle = tokio::spawn(pruner::run(
        manager.clone(),
        config.prune_interval(),
        shutdown_rx.clone(),
    ));
    let sweeper_handle =
        tokio::spawn(manager.dispatcher().clone().run_deadline_sweeper(shutdown_rx));

    let (server_stop_tx, server_stop_rx) = oneshot::channel();
    let server_manager = manager.clone();
    let server_handle = tokio::spawn(async move {
        server::spawn_server_with_shutdown(server_manager, Some(server_stop_rx)).await
    });

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;
    info!("shutdown signal received");
    let _ = shutdown_tx.send(true);
    let _ = server_stop_tx.send(());

    match server_handle.await {
        Ok(Ok(())) => {}
        Ok(Err(err)) => error!(error = %err, "server exited with error"),
        Err(err) => error!(error = %err, "server task failed"),
    }
    let _ = tokio::join!(pruner_handle, sweeper_handle);
    info!("nexus fabric core stopped");
    Ok(())
}
