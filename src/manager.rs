// nexus-fabric-core/src/manager.rs - Composition of state, bus, and dispatcher

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

use crate::bus::{EventBus, Subscription};
use crate::config::NexusConfig;
use crate::dispatch::{CommandDispatcher, DispatcherConfig};
use crate::error::{FabricError, FabricResult};
use crate::events::{self, InternalEvent};
use crate::fabric_proto::fabric::{CommandKind, FabricEvent, UpdateOutcome};
use crate::state::{
    Agent, AgentStatus, FabricSnapshot, FabricState, Node, NodeSpec, NodeStatus,
    TelemetrySnapshot,
};

/// Owns the authoritative store, the event bus, and the dispatcher, and
/// exposes the operation-level API the RPC server and the pruner drive.
/// Mutations commit to the store first; the returned event is published after
/// the change is visible, so no subscriber can observe an event ahead of the
/// state it describes.
#[derive(Clone)]
pub struct FabricManager {
    state: Arc<FabricState>,
    bus: EventBus,
    dispatcher: CommandDispatcher,
    config: NexusConfig,
}

impl FabricManager {
    pub fn new(config: NexusConfig) -> Self {
        let state = Arc::new(FabricState::new());
        let bus = EventBus::new(config.stream_buffer);
        let dispatcher = CommandDispatcher::new(
            Arc::clone(&state),
            bus.clone(),
            DispatcherConfig {
                queue_depth: config.command_queue_depth,
                command_deadline: config.command_deadline(),
                ack_timeout: config.proxy_ack_timeout(),
                ..DispatcherConfig::default()
            },
        );
        Self {
            state,
            bus,
            dispatcher,
            config,
        }
    }

    pub fn config(&self) -> &NexusConfig {
        &self.config
    }

    pub fn state(&self) -> &FabricState {
        &self.state
    }

    pub fn dispatcher(&self) -> &CommandDispatcher {
        &self.dispatcher
    }

    pub fn register_node(&self, spec: NodeSpec) -> Node {
        let proxy_addr = spec.proxy_addr.clone();
        let (node, event) = self.state.register_node(spec, Utc::now());
        info!(node_id = %node.id, kind = node.kind.as_str(), "node registered");
        self.bus.publish(event.into_wire(events::SOURCE_NEXUS));
        if let Some(addr) = proxy_addr {
            self.dispatcher.register_proxy(&node.id, &addr);
        }
        node
    }

    pub fn update_node_status(
        &self,
        id: &str,
        status: NodeStatus,
        telemetry: Option<TelemetrySnapshot>,
        observed_at: DateTime<Utc>,
    ) -> FabricResult<Node> {
        let (node, event) = self
            .state
            .apply_node_status(id, status, telemetry, observed_at)?;
        self.bus.publish(event.into_wire(events::SOURCE_NEXUS));
        Ok(node)
    }

    pub fn update_agent_status(
        &self,
        id: &str,
        status: AgentStatus,
        current_task: Option<String>,
        task_progress: Option<f32>,
        observed_at: DateTime<Utc>,
    ) -> FabricResult<Agent> {
        let (agent, event) =
            self.state
                .apply_agent_status(id, status, current_task, task_progress, observed_at)?;
        self.bus.publish(event.into_wire(events::SOURCE_NEXUS));
        Ok(agent)
    }

    /// Maps a status-update result onto the wire outcome. Stale updates are
    /// acknowledged without an event; the remaining soft failures surface as
    /// typed outcomes rather than transport errors.
    pub fn outcome_for(err: &FabricError) -> Option<UpdateOutcome> {
        match err {
            FabricError::Stale(_) => Some(UpdateOutcome::Stale),
            FabricError::UnknownTarget(_) => Some(UpdateOutcome::UnknownTarget),
            FabricError::TerminalLocked(_) => Some(UpdateOutcome::TerminalLocked),
            _ => None,
        }
    }

    pub fn submit_command(
        &self,
        target_id: &str,
        kind: CommandKind,
        parameters: HashMap<String, String>,
    ) -> FabricResult<String> {
        self.dispatcher.submit(target_id, kind, parameters)
    }

    pub fn report_command_result(
        &self,
        command_id: &str,
        success: bool,
        error: String,
        details: HashMap<String, String>,
    ) {
        self.dispatcher
            .report_result(command_id, success, error, details);
    }

    /// Live subscription plus, when requested, a synthetic snapshot prelude
    /// (SNAPSHOT_BEGIN, one registration per entity, SNAPSHOT_END).
    pub fn subscribe(&self, include_snapshot: bool) -> (Subscription, Option<Vec<FabricEvent>>) {
        let subscription = self.bus.subscribe();
        if !include_snapshot {
            return (subscription, None);
        }
        let snapshot = self.state.snapshot();
        let mut prelude = Vec::with_capacity(2 + snapshot.nodes.len() + snapshot.agents.len());
        prelude.push(events::snapshot_begin(
            snapshot.nodes.len(),
            snapshot.agents.len(),
        ));
        for node in snapshot.nodes {
            prelude.push(InternalEvent::NodeRegistered(node).into_wire(events::SOURCE_NEXUS));
        }
        for agent in snapshot.agents {
            prelude.push(InternalEvent::AgentRegistered(agent).into_wire(events::SOURCE_NEXUS));
        }
        prelude.push(events::snapshot_end());
        (subscription, Some(prelude))
    }

    pub fn snapshot(&self) -> FabricSnapshot {
        self.state.snapshot()
    }

    /// One pruner sweep against an injected clock. Stale nodes are removed
    /// and their agents flipped to ERROR; agents go by their own last_seen,
    /// and TERMINATED agents are collected once their retention lapses.
    pub fn prune_stale_entities(&self, now: DateTime<Utc>) {
        let stale_node = self.config.stale_after_node();
        let stale_agent = self.config.stale_after_agent();
        let retain_terminated = self.config.retain_terminated();
        let snapshot = self.state.snapshot();

        for node in &snapshot.nodes {
            if now - node.last_seen <= stale_node {
                continue;
            }
            if let Some((node, event)) = self.state.remove_node(&node.id) {
                warn!(node_id = %node.id, "pruning stale node");
                self.dispatcher.deregister_proxy(&node.id);
                self.bus.publish(event.into_wire(events::SOURCE_PRUNER));
                for (_, event) in self.state.mark_node_lost(&node.id, now) {
                    self.bus.publish(event.into_wire(events::SOURCE_PRUNER));
                }
            }
        }

        for agent in &snapshot.agents {
            let stale = now - agent.last_seen > stale_agent;
            let expired_terminal = agent
                .terminated_at
                .map(|at| now - at > retain_terminated)
                .unwrap_or(false);
            if !stale && !expired_terminal {
                continue;
            }
            if let Some((agent, event)) = self.state.remove_agent(&agent.id) {
                warn!(agent_id = %agent.id, "pruning stale agent");
                self.bus.publish(event.into_wire(events::SOURCE_PRUNER));
            }
        }
    }

    /// Releases background resources; pending subscriptions observe
    /// end-of-stream.
    pub fn shutdown(&self) {
        self.dispatcher.shutdown();
        self.bus.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fabric_proto::fabric::EventKind;
    use crate::state::{AgentSpec, NodeKind};
    use chrono::Duration;

    fn manager() -> FabricManager {
        FabricManager::new(NexusConfig::default())
    }

    fn heavy_node_spec() -> NodeSpec {
        NodeSpec {
            kind: NodeKind::HeavyHost,
            address: "10.0.0.7".to_string(),
            capabilities: "cpu=16;ram=64G".to_string(),
            proxy_addr: None,
        }
    }

    #[tokio::test]
    async fn register_then_update_streams_in_order() {
        let manager = manager();
        let (mut sub, prelude) = manager.subscribe(false);
        assert!(prelude.is_none());
        let node = manager.register_node(heavy_node_spec());
        manager
            .update_node_status(
                &node.id,
                NodeStatus::Online,
                Some(TelemetrySnapshot {
                    cpu_fraction: 0.12,
                    memory_fraction: 0.34,
                    net_in_bps: 1000,
                    net_out_bps: 2000,
                    disk_used_bytes: 0,
                    timestamp: Utc::now(),
                }),
                Utc::now() + Duration::seconds(1),
            )
            .unwrap();
        let registered = sub.next().await.unwrap();
        assert_eq!(registered.kind(), EventKind::NodeRegistered);
        assert_eq!(registered.attributes["node_id"], node.id);
        assert_eq!(registered.attributes["kind"], "HEAVY_HOST");
        let updated = sub.next().await.unwrap();
        assert_eq!(updated.kind(), EventKind::NodeStatusUpdated);
        assert_eq!(updated.attributes["new_status"], "ONLINE");
        let telemetry = updated.telemetry.unwrap();
        assert!((telemetry.cpu_fraction - 0.12).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn stale_update_leaves_no_event() {
        let manager = manager();
        let node = manager.register_node(heavy_node_spec());
        let later = Utc::now() + Duration::seconds(5);
        manager
            .update_node_status(&node.id, NodeStatus::Online, None, later)
            .unwrap();
        let (mut sub, _) = manager.subscribe(false);
        let err = manager
            .update_node_status(&node.id, NodeStatus::Degraded, None, later - Duration::seconds(10))
            .unwrap_err();
        assert_eq!(FabricManager::outcome_for(&err), Some(UpdateOutcome::Stale));
        let extra = tokio::time::timeout(std::time::Duration::from_millis(100), sub.next()).await;
        assert!(extra.is_err());
        assert_eq!(
            manager.state().get_node(&node.id).unwrap().status,
            NodeStatus::Online
        );
    }

    #[tokio::test]
    async fn snapshot_prelude_counts_entities() {
        let manager = manager();
        manager.register_node(heavy_node_spec());
        manager.register_node(heavy_node_spec());
        manager
            .state()
            .register_agent(AgentSpec::default(), Utc::now())
            .unwrap();
        let (_sub, prelude) = manager.subscribe(true);
        let prelude = prelude.unwrap();
        // SNAPSHOT_BEGIN + two nodes + one agent + SNAPSHOT_END
        assert_eq!(prelude.len(), 5);
        assert_eq!(prelude[0].kind(), EventKind::SnapshotBegin);
        assert_eq!(prelude[0].attributes["node_count"], "2");
        assert_eq!(prelude[0].attributes["agent_count"], "1");
        assert_eq!(prelude.last().unwrap().kind(), EventKind::SnapshotEnd);
    }

    #[tokio::test]
    async fn pruning_cascade_emits_node_lost_then_collects_the_agent() {
        let config = NexusConfig::default();
        let manager = FabricManager::new(config.clone());
        let start = Utc::now();
        let node = manager.register_node(heavy_node_spec());
        let (agent, _) = manager
            .state()
            .register_agent(
                AgentSpec {
                    assigned_node_id: Some(node.id.clone()),
                    ..AgentSpec::default()
                },
                start,
            )
            .unwrap();
        let (mut sub, _) = manager.subscribe(false);

        let after_node_stale =
            start + Duration::seconds(config.stale_after_node_seconds as i64 + 1);
        manager.prune_stale_entities(after_node_stale);

        let pruned = sub.next().await.unwrap();
        assert_eq!(pruned.kind(), EventKind::NodePruned);
        assert_eq!(pruned.attributes["node_id"], node.id);
        let lost = sub.next().await.unwrap();
        assert_eq!(lost.kind(), EventKind::AgentStatusUpdated);
        assert_eq!(lost.attributes["agent_id"], agent.id);
        assert_eq!(lost.attributes["new_status"], "ERROR");
        assert_eq!(lost.attributes["reason"], "NODE_LOST");

        // The agent survives on its own clock until stale_after_agent lapses.
        let after_agent_stale =
            after_node_stale + Duration::seconds(config.stale_after_agent_seconds as i64 + 1);
        manager.prune_stale_entities(after_agent_stale);
        let collected = sub.next().await.unwrap();
        assert_eq!(collected.kind(), EventKind::AgentPruned);
        assert_eq!(collected.attributes["agent_id"], agent.id);
    }

    #[tokio::test]
    async fn terminated_agents_expire_on_retention_not_last_seen() {
        let config = NexusConfig::default();
        let manager = FabricManager::new(config.clone());
        let start = Utc::now();
        let (agent, _) = manager
            .state()
            .register_agent(AgentSpec::default(), start)
            .unwrap();
        manager
            .update_agent_status(&agent.id, AgentStatus::Terminated, None, None, start)
            .unwrap();
        // Within retention nothing happens even with the status long quiet.
        manager.prune_stale_entities(start + Duration::seconds(30));
        assert!(manager.state().get_agent(&agent.id).is_some());
        manager.prune_stale_entities(
            start + Duration::seconds(config.retain_terminated_seconds as i64 + 1),
        );
        assert!(manager.state().get_agent(&agent.id).is_none());
    }
}
