// nexus-fabric-core/src/proxy/telemetry.rs - Host telemetry collection and heartbeat

use chrono::Utc;
use std::time::Duration;
use sysinfo::{Disks, Networks, System};
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tonic::transport::Channel;
use tonic::Request;
use tracing::{debug, info, warn};

use crate::fabric_proto::fabric::fabric_service_client::FabricServiceClient;
use crate::fabric_proto::fabric::{StatusTarget, Telemetry, UpdateStatusRequest};

/// Samples CPU, memory, network, and disk utilization between heartbeats.
pub struct TelemetryCollector {
    system: System,
    networks: Networks,
    disks: Disks,
    interval: Duration,
}

impl TelemetryCollector {
    pub fn new(interval: Duration) -> Self {
        let mut system = System::new_all();
        system.refresh_all();
        Self {
            system,
            networks: Networks::new_with_refreshed_list(),
            disks: Disks::new_with_refreshed_list(),
            interval,
        }
    }

    pub fn sample(&mut self) -> Telemetry {
        self.system.refresh_cpu();
        self.system.refresh_memory();
        self.networks.refresh();
        self.disks.refresh();

        let cpu_fraction =
            (self.system.global_cpu_info().cpu_usage() as f64 / 100.0).clamp(0.0, 1.0);
        let memory_fraction = if self.system.total_memory() > 0 {
            self.system.used_memory() as f64 / self.system.total_memory() as f64
        } else {
            0.0
        };
        // received()/transmitted() are deltas since the previous refresh, so
        // one heartbeat interval's worth of bytes.
        let (bytes_in, bytes_out) = self.networks.iter().fold((0u64, 0u64), |acc, (_, data)| {
            (acc.0 + data.received(), acc.1 + data.transmitted())
        });
        let elapsed = self.interval.as_secs_f64().max(1.0);
        let disk_used_bytes = self
            .disks
            .iter()
            .map(|disk| disk.total_space().saturating_sub(disk.available_space()))
            .sum();

        Telemetry {
            cpu_fraction,
            memory_fraction,
            net_in_bps: (bytes_in as f64 * 8.0 / elapsed) as u64,
            net_out_bps: (bytes_out as f64 * 8.0 / elapsed) as u64,
            disk_used_bytes,
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

/// Heartbeat loop: report ONLINE with a fresh telemetry snapshot every
/// interval until shutdown.
pub async fn run_heartbeat(
    client: FabricServiceClient<Channel>,
    node_id: String,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    info!(%node_id, ?interval, "telemetry heartbeat started");
    let mut collector = TelemetryCollector::new(interval);
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let telemetry = collector.sample();
                let request = UpdateStatusRequest {
                    id: node_id.clone(),
                    target: StatusTarget::Node as i32,
                    status_value: "ONLINE".to_string(),
                    telemetry: Some(telemetry),
                    current_task: None,
                    task_progress: None,
                    timestamp: Utc::now().to_rfc3339(),
                };
                let mut client = client.clone();
                match client.update_status(Request::new(request)).await {
                    Ok(_) => debug!(%node_id, "heartbeat delivered"),
                    Err(err) => warn!(%node_id, error = %err, "heartbeat failed"),
                }
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }
    }
    info!(%node_id, "telemetry heartbeat stopped");
}
