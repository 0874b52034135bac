// nexus-fabric-core/src/events.rs - Internal state-change events and their wire form

use chrono::Utc;
use std::collections::HashMap;
use uuid::Uuid;

use crate::fabric_proto::fabric::{CommandKind, EventKind, FabricEvent, Telemetry};
use crate::state::{Agent, AgentStatus, Node, NodeStatus, TelemetrySnapshot};

pub const SOURCE_NEXUS: &str = "nexus";
pub const SOURCE_PRUNER: &str = "pruner";
pub const SOURCE_DISPATCHER: &str = "dispatcher";
pub const SOURCE_BUS: &str = "event-bus";

/// State-change notification produced by the store or the dispatcher. The
/// producer of the mutation hands these to the event bus after the change has
/// been committed.
#[derive(Debug, Clone)]
pub enum InternalEvent {
    NodeRegistered(Node),
    NodeStatusUpdated {
        node: Node,
        old_status: NodeStatus,
    },
    NodePruned {
        node_id: String,
    },
    AgentRegistered(Agent),
    AgentStatusUpdated {
        agent: Agent,
        old_status: AgentStatus,
        reason: Option<String>,
    },
    AgentPruned {
        agent_id: String,
    },
    CommandSubmitted {
        command_id: String,
        target_id: String,
        kind: CommandKind,
    },
    CommandDelivered {
        command_id: String,
        target_id: String,
        node_id: String,
        scheduled: bool,
    },
    CommandCompleted {
        command_id: String,
        details: HashMap<String, String>,
    },
    CommandFailed {
        command_id: String,
        reason: String,
        detail: String,
    },
}

fn envelope(kind: EventKind, source: &str, message: String) -> FabricEvent {
    FabricEvent {
        event_id: Uuid::new_v4().to_string(),
        timestamp: Utc::now().to_rfc3339(),
        kind: kind as i32,
        source: source.to_string(),
        message,
        attributes: HashMap::new(),
        telemetry: None,
    }
}

fn wire_telemetry(snapshot: &TelemetrySnapshot) -> Telemetry {
    Telemetry {
        cpu_fraction: snapshot.cpu_fraction,
        memory_fraction: snapshot.memory_fraction,
        net_in_bps: snapshot.net_in_bps,
        net_out_bps: snapshot.net_out_bps,
        disk_used_bytes: snapshot.disk_used_bytes,
        timestamp: snapshot.timestamp.to_rfc3339(),
    }
}

impl InternalEvent {
    pub fn into_wire(self, source: &str) -> FabricEvent {
        match self {
            InternalEvent::NodeRegistered(node) => {
                let mut event = envelope(
                    EventKind::NodeRegistered,
                    source,
                    format!("Node registered: {}", node.id),
                );
                event.attributes.insert("node_id".to_string(), node.id);
                event
                    .attributes
                    .insert("kind".to_string(), node.kind.as_str().to_string());
                event.attributes.insert("address".to_string(), node.address);
                event
                    .attributes
                    .insert("capabilities".to_string(), node.capabilities);
                event
            }
            InternalEvent::NodeStatusUpdated { node, old_status } => {
                let mut event = envelope(
                    EventKind::NodeStatusUpdated,
                    source,
                    format!("Node {} status updated: {}", node.id, node.status.as_str()),
                );
                event.attributes.insert("node_id".to_string(), node.id);
                event
                    .attributes
                    .insert("old_status".to_string(), old_status.as_str().to_string());
                event
                    .attributes
                    .insert("new_status".to_string(), node.status.as_str().to_string());
                event.telemetry = node.latest_telemetry.as_ref().map(wire_telemetry);
                event
            }
            InternalEvent::NodePruned { node_id } => {
                let mut event = envelope(
                    EventKind::NodePruned,
                    source,
                    format!("Node pruned: {node_id}"),
                );
                event.attributes.insert("node_id".to_string(), node_id);
                event
            }
            InternalEvent::AgentRegistered(agent) => {
                let mut event = envelope(
                    EventKind::AgentRegistered,
                    source,
                    format!("Agent registered: {}", agent.id),
                );
                event.attributes.insert("agent_id".to_string(), agent.id);
                event
                    .attributes
                    .insert("agent_kind".to_string(), agent.kind);
                event
                    .attributes
                    .insert("display_name".to_string(), agent.display_name);
                if let Some(node_id) = agent.assigned_node_id {
                    event.attributes.insert("assigned_node_id".to_string(), node_id);
                }
                event
            }
            InternalEvent::AgentStatusUpdated {
                agent,
                old_status,
                reason,
            } => {
                let mut event = envelope(
                    EventKind::AgentStatusUpdated,
                    source,
                    format!("Agent {} status updated: {}", agent.id, agent.status.as_str()),
                );
                event.attributes.insert("agent_id".to_string(), agent.id);
                event
                    .attributes
                    .insert("old_status".to_string(), old_status.as_str().to_string());
                event
                    .attributes
                    .insert("new_status".to_string(), agent.status.as_str().to_string());
                if let Some(task) = agent.current_task {
                    event.attributes.insert("current_task".to_string(), task);
                }
                if let Some(progress) = agent.task_progress {
                    event
                        .attributes
                        .insert("task_progress".to_string(), progress.to_string());
                }
                if let Some(reason) = reason {
                    event.attributes.insert("reason".to_string(), reason);
                }
                event
            }
            InternalEvent::AgentPruned { agent_id } => {
                let mut event = envelope(
                    EventKind::AgentPruned,
                    source,
                    format!("Agent pruned: {agent_id}"),
                );
                event.attributes.insert("agent_id".to_string(), agent_id);
                event
            }
            InternalEvent::CommandSubmitted {
                command_id,
                target_id,
                kind,
            } => {
                let mut event = envelope(
                    EventKind::CommandSubmitted,
                    source,
                    format!("Command {} submitted: {}", command_id, kind.as_str_name()),
                );
                event.attributes.insert("command_id".to_string(), command_id);
                event.attributes.insert("target_id".to_string(), target_id);
                event
                    .attributes
                    .insert("kind".to_string(), kind.as_str_name().to_string());
                event
            }
            InternalEvent::CommandDelivered {
                command_id,
                target_id,
                node_id,
                scheduled,
            } => {
                let mut event = envelope(
                    EventKind::CommandDelivered,
                    source,
                    format!("Command {command_id} delivered to {node_id}"),
                );
                event.attributes.insert("command_id".to_string(), command_id);
                event.attributes.insert("target_id".to_string(), target_id);
                event.attributes.insert("node_id".to_string(), node_id.clone());
                if scheduled {
                    event.attributes.insert("scheduled_node".to_string(), node_id);
                }
                event
            }
            InternalEvent::CommandCompleted {
                command_id,
                details,
            } => {
                let mut event = envelope(
                    EventKind::CommandCompleted,
                    source,
                    format!("Command {command_id} completed"),
                );
                event.attributes.insert("command_id".to_string(), command_id);
                event.attributes.extend(details);
                event
            }
            InternalEvent::CommandFailed {
                command_id,
                reason,
                detail,
            } => {
                let mut event = envelope(
                    EventKind::CommandFailed,
                    source,
                    format!("Command {command_id} failed: {reason}"),
                );
                event.attributes.insert("command_id".to_string(), command_id);
                event.attributes.insert("reason".to_string(), reason);
                if !detail.is_empty() {
                    event.attributes.insert("detail".to_string(), detail);
                }
                event
            }
        }
    }
}

/// Lag marker synthesized by the bus when a subscriber queue overflows.
pub fn stream_lagged(dropped: u64) -> FabricEvent {
    let mut event = envelope(
        EventKind::StreamLagged,
        SOURCE_BUS,
        format!("Subscriber lagged; {dropped} events dropped"),
    );
    event
        .attributes
        .insert("dropped".to_string(), dropped.to_string());
    event
}

pub fn snapshot_begin(node_count: usize, agent_count: usize) -> FabricEvent {
    let mut event = envelope(
        EventKind::SnapshotBegin,
        SOURCE_NEXUS,
        "Snapshot prelude start".to_string(),
    );
    event
        .attributes
        .insert("node_count".to_string(), node_count.to_string());
    event
        .attributes
        .insert("agent_count".to_string(), agent_count.to_string());
    event
}

pub fn snapshot_end() -> FabricEvent {
    envelope(
        EventKind::SnapshotEnd,
        SOURCE_NEXUS,
        "Snapshot prelude end".to_string(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::NodeKind;
    use chrono::Utc;

    #[test]
    fn node_status_event_carries_delta_and_telemetry() {
        let node = Node {
            id: "node-1".to_string(),
            kind: NodeKind::HeavyHost,
            address: "10.0.0.7".to_string(),
            capabilities: "cpu=16".to_string(),
            status: NodeStatus::Degraded,
            last_seen: Utc::now(),
            latest_telemetry: Some(TelemetrySnapshot {
                cpu_fraction: 0.12,
                memory_fraction: 0.34,
                net_in_bps: 1000,
                net_out_bps: 2000,
                disk_used_bytes: 0,
                timestamp: Utc::now(),
            }),
            proxy_addr: None,
        };
        let event = InternalEvent::NodeStatusUpdated {
            node,
            old_status: NodeStatus::Online,
        }
        .into_wire(SOURCE_NEXUS);
        assert_eq!(event.kind(), EventKind::NodeStatusUpdated);
        assert_eq!(event.attributes["node_id"], "node-1");
        assert_eq!(event.attributes["old_status"], "ONLINE");
        assert_eq!(event.attributes["new_status"], "DEGRADED");
        let telemetry = event.telemetry.expect("telemetry attached");
        assert!((telemetry.cpu_fraction - 0.12).abs() < f64::EPSILON);
    }

    #[test]
    fn lag_marker_reports_drop_count() {
        let event = stream_lagged(6);
        assert_eq!(event.kind(), EventKind::StreamLagged);
        assert_eq!(event.attributes["dropped"], "6");
    }
}
