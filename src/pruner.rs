// nexus-fabric-core/src/pruner.rs - Periodic stale-entity sweep

use chrono::Utc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::info;

use crate::manager::FabricManager;

/// Runs until the shutdown channel flips. Each tick is a single bounded sweep
/// through a state snapshot; a slow tick is skipped rather than bursted so a
/// long sweep never stacks the next one behind it.
pub async fn run(manager: FabricManager, interval: Duration, mut shutdown: watch::Receiver<bool>) {
    info!(?interval, "stale-entity pruner started");
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    // The first tick of a tokio interval fires immediately; swallow it so a
    // freshly started Nexus does not sweep an empty map at once.
    ticker.tick().await;
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                manager.prune_stale_entities(Utc::now());
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }
    }
    info!("stale-entity pruner stopped");
}
