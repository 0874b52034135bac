// nexus-fabric-core/src/state.rs - Authoritative in-memory fabric state

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use crate::error::{FabricError, FabricResult};
use crate::events::InternalEvent;
use crate::fabric_proto::fabric;

// --- Domain enums ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeKind {
    HeavyHost,
    LightHost,
    AgentProxy,
    Unknown,
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::HeavyHost => "HEAVY_HOST",
            NodeKind::LightHost => "LIGHT_HOST",
            NodeKind::AgentProxy => "AGENT_PROXY",
            NodeKind::Unknown => "UNKNOWN",
        }
    }

    pub fn parse(value: &str) -> Self {
        match value.to_ascii_uppercase().as_str() {
            "HEAVY_HOST" => NodeKind::HeavyHost,
            "LIGHT_HOST" => NodeKind::LightHost,
            "AGENT_PROXY" => NodeKind::AgentProxy,
            _ => NodeKind::Unknown,
        }
    }
}

impl Default for NodeKind {
    fn default() -> Self {
        NodeKind::Unknown
    }
}

impl From<fabric::NodeKind> for NodeKind {
    fn from(kind: fabric::NodeKind) -> Self {
        match kind {
            fabric::NodeKind::HeavyHost => NodeKind::HeavyHost,
            fabric::NodeKind::LightHost => NodeKind::LightHost,
            fabric::NodeKind::AgentProxy => NodeKind::AgentProxy,
            fabric::NodeKind::Unknown => NodeKind::Unknown,
        }
    }
}

impl From<NodeKind> for fabric::NodeKind {
    fn from(kind: NodeKind) -> Self {
        match kind {
            NodeKind::HeavyHost => fabric::NodeKind::HeavyHost,
            NodeKind::LightHost => fabric::NodeKind::LightHost,
            NodeKind::AgentProxy => fabric::NodeKind::AgentProxy,
            NodeKind::Unknown => fabric::NodeKind::Unknown,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeStatus {
    Online,
    Degraded,
    Offline,
}

impl NodeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeStatus::Online => "ONLINE",
            NodeStatus::Degraded => "DEGRADED",
            NodeStatus::Offline => "OFFLINE",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_uppercase().as_str() {
            "ONLINE" => Some(NodeStatus::Online),
            "DEGRADED" => Some(NodeStatus::Degraded),
            "OFFLINE" => Some(NodeStatus::Offline),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AgentStatus {
    Pending,
    Running,
    Idle,
    Error,
    Terminated,
}

impl AgentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentStatus::Pending => "PENDING",
            AgentStatus::Running => "RUNNING",
            AgentStatus::Idle => "IDLE",
            AgentStatus::Error => "ERROR",
            AgentStatus::Terminated => "TERMINATED",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_uppercase().as_str() {
            "PENDING" => Some(AgentStatus::Pending),
            "RUNNING" => Some(AgentStatus::Running),
            "IDLE" => Some(AgentStatus::Idle),
            "ERROR" => Some(AgentStatus::Error),
            "TERMINATED" => Some(AgentStatus::Terminated),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, AgentStatus::Terminated)
    }
}

// --- Entities ---

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetrySnapshot {
    pub cpu_fraction: f64,
    pub memory_fraction: f64,
    pub net_in_bps: u64,
    pub net_out_bps: u64,
    pub disk_used_bytes: u64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    pub kind: NodeKind,
    pub address: String,
    pub capabilities: String,
    pub status: NodeStatus,
    pub last_seen: DateTime<Utc>,
    pub latest_telemetry: Option<TelemetrySnapshot>,
    /// Where the node's NodeProxyService listens, if it accepts commands.
    pub proxy_addr: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agent {
    pub id: String,
    pub display_name: String,
    pub kind: String,
    pub assigned_node_id: Option<String>,
    pub status: AgentStatus,
    pub current_task: Option<String>,
    pub task_progress: Option<f32>,
    pub last_seen: DateTime<Utc>,
    pub terminated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default)]
pub struct NodeSpec {
    pub kind: NodeKind,
    pub address: String,
    pub capabilities: String,
    pub proxy_addr: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct AgentSpec {
    /// Externally-chosen id (e.g. the target of a DEPLOY_AGENT command);
    /// a fresh one is generated when absent.
    pub id: Option<String>,
    pub display_name: String,
    pub kind: String,
    pub assigned_node_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FabricSnapshot {
    pub nodes: Vec<Node>,
    pub agents: Vec<Agent>,
    pub taken_at: DateTime<Utc>,
}

/// Which map an id resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetKind {
    Node,
    Agent,
}

// --- Store ---

#[derive(Default)]
struct StateInner {
    nodes: HashMap<String, Node>,
    agents: HashMap<String, Agent>,
}

/// Process-local authoritative store. Many concurrent readers, serialized
/// writers; mutations return the post-image plus the event to publish so the
/// store itself never touches the bus or any I/O.
#[derive(Default)]
pub struct FabricState {
    inner: RwLock<StateInner>,
}

impl FabricState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_node(&self, spec: NodeSpec, now: DateTime<Utc>) -> (Node, InternalEvent) {
        let mut inner = self.inner.write();
        let id = loop {
            let candidate = format!("node-{}", Uuid::new_v4());
            if !inner.nodes.contains_key(&candidate) && !inner.agents.contains_key(&candidate) {
                break candidate;
            }
        };
        let node = Node {
            id: id.clone(),
            kind: spec.kind,
            address: spec.address,
            capabilities: spec.capabilities,
            status: NodeStatus::Online,
            last_seen: now,
            latest_telemetry: None,
            proxy_addr: spec.proxy_addr,
        };
        inner.nodes.insert(id, node.clone());
        let event = InternalEvent::NodeRegistered(node.clone());
        (node, event)
    }

    pub fn apply_node_status(
        &self,
        id: &str,
        status: NodeStatus,
        telemetry: Option<TelemetrySnapshot>,
        observed_at: DateTime<Utc>,
    ) -> FabricResult<(Node, InternalEvent)> {
        let mut inner = self.inner.write();
        let node = inner
            .nodes
            .get_mut(id)
            .ok_or_else(|| FabricError::UnknownTarget(id.to_string()))?;
        if observed_at < node.last_seen {
            return Err(FabricError::Stale(id.to_string()));
        }
        let old_status = node.status;
        node.status = status;
        node.last_seen = observed_at;
        if telemetry.is_some() {
            node.latest_telemetry = telemetry;
        }
        let node = node.clone();
        let event = InternalEvent::NodeStatusUpdated {
            node: node.clone(),
            old_status,
        };
        Ok((node, event))
    }

    pub fn register_agent(
        &self,
        spec: AgentSpec,
        now: DateTime<Utc>,
    ) -> FabricResult<(Agent, InternalEvent)> {
        let mut inner = self.inner.write();
        let id = match spec.id {
            Some(id) => {
                if id.is_empty() {
                    return Err(FabricError::Validation("empty agent id".to_string()));
                }
                if inner.agents.contains_key(&id) || inner.nodes.contains_key(&id) {
                    return Err(FabricError::Validation(format!("id already in use: {id}")));
                }
                id
            }
            None => loop {
                let candidate = format!("agent-{}", Uuid::new_v4());
                if !inner.agents.contains_key(&candidate) && !inner.nodes.contains_key(&candidate)
                {
                    break candidate;
                }
            },
        };
        if let Some(node_id) = &spec.assigned_node_id {
            if !inner.nodes.contains_key(node_id) {
                return Err(FabricError::UnknownTarget(node_id.clone()));
            }
        }
        let agent = Agent {
            id: id.clone(),
            display_name: spec.display_name,
            kind: spec.kind,
            assigned_node_id: spec.assigned_node_id,
            status: AgentStatus::Pending,
            current_task: None,
            task_progress: None,
            last_seen: now,
            terminated_at: None,
        };
        inner.agents.insert(id, agent.clone());
        let event = InternalEvent::AgentRegistered(agent.clone());
        Ok((agent, event))
    }

    pub fn apply_agent_status(
        &self,
        id: &str,
        status: AgentStatus,
        current_task: Option<String>,
        task_progress: Option<f32>,
        observed_at: DateTime<Utc>,
    ) -> FabricResult<(Agent, InternalEvent)> {
        if let Some(progress) = task_progress {
            if !progress.is_finite() {
                return Err(FabricError::Validation("non-finite task_progress".to_string()));
            }
        }
        let mut inner = self.inner.write();
        let agent = inner
            .agents
            .get_mut(id)
            .ok_or_else(|| FabricError::UnknownTarget(id.to_string()))?;
        if agent.status.is_terminal() {
            return Err(FabricError::TerminalLocked(id.to_string()));
        }
        if observed_at < agent.last_seen {
            return Err(FabricError::Stale(id.to_string()));
        }
        let old_status = agent.status;
        agent.status = status;
        agent.last_seen = observed_at;
        if let Some(task) = current_task {
            agent.current_task = Some(task);
        }
        if let Some(progress) = task_progress {
            agent.task_progress = Some(progress.clamp(0.0, 1.0));
        }
        if status.is_terminal() {
            agent.current_task = None;
            agent.terminated_at = Some(observed_at);
        }
        let agent = agent.clone();
        let event = InternalEvent::AgentStatusUpdated {
            agent: agent.clone(),
            old_status,
            reason: None,
        };
        Ok((agent, event))
    }

    /// Binds an agent to a node after a scheduling decision. The node must
    /// currently exist; the decision itself is recorded by the caller in the
    /// command event rather than as a state event.
    pub fn assign_agent(&self, agent_id: &str, node_id: &str) -> FabricResult<Agent> {
        let mut inner = self.inner.write();
        if !inner.nodes.contains_key(node_id) {
            return Err(FabricError::UnknownTarget(node_id.to_string()));
        }
        let agent = inner
            .agents
            .get_mut(agent_id)
            .ok_or_else(|| FabricError::UnknownTarget(agent_id.to_string()))?;
        if agent.status.is_terminal() {
            return Err(FabricError::TerminalLocked(agent_id.to_string()));
        }
        agent.assigned_node_id = Some(node_id.to_string());
        Ok(agent.clone())
    }

    /// Flips every non-terminal agent assigned to a vanished node into ERROR.
    pub fn mark_node_lost(
        &self,
        node_id: &str,
        now: DateTime<Utc>,
    ) -> Vec<(Agent, InternalEvent)> {
        let mut inner = self.inner.write();
        let mut out = Vec::new();
        for agent in inner.agents.values_mut() {
            if agent.assigned_node_id.as_deref() != Some(node_id) || agent.status.is_terminal() {
                continue;
            }
            let old_status = agent.status;
            agent.status = AgentStatus::Error;
            agent.last_seen = now;
            let snapshot = agent.clone();
            out.push((
                snapshot.clone(),
                InternalEvent::AgentStatusUpdated {
                    agent: snapshot,
                    old_status,
                    reason: Some("NODE_LOST".to_string()),
                },
            ));
        }
        out
    }

    pub fn remove_node(&self, id: &str) -> Option<(Node, InternalEvent)> {
        let mut inner = self.inner.write();
        let node = inner.nodes.remove(id)?;
        let event = InternalEvent::NodePruned {
            node_id: node.id.clone(),
        };
        Some((node, event))
    }

    pub fn remove_agent(&self, id: &str) -> Option<(Agent, InternalEvent)> {
        let mut inner = self.inner.write();
        let agent = inner.agents.remove(id)?;
        let event = InternalEvent::AgentPruned {
            agent_id: agent.id.clone(),
        };
        Some((agent, event))
    }

    pub fn get_node(&self, id: &str) -> Option<Node> {
        self.inner.read().nodes.get(id).cloned()
    }

    pub fn get_agent(&self, id: &str) -> Option<Agent> {
        self.inner.read().agents.get(id).cloned()
    }

    pub fn resolve(&self, id: &str) -> Option<TargetKind> {
        let inner = self.inner.read();
        if inner.nodes.contains_key(id) {
            Some(TargetKind::Node)
        } else if inner.agents.contains_key(id) {
            Some(TargetKind::Agent)
        } else {
            None
        }
    }

    /// Point-in-time copy; readers never block writers for longer than the clone.
    pub fn snapshot(&self) -> FabricSnapshot {
        let inner = self.inner.read();
        let mut nodes: Vec<Node> = inner.nodes.values().cloned().collect();
        let mut agents: Vec<Agent> = inner.agents.values().cloned().collect();
        nodes.sort_by(|a, b| a.id.cmp(&b.id));
        agents.sort_by(|a, b| a.id.cmp(&b.id));
        FabricSnapshot {
            nodes,
            agents,
            taken_at: Utc::now(),
        }
    }

    pub fn node_count(&self) -> usize {
        self.inner.read().nodes.len()
    }

    pub fn agent_count(&self) -> usize {
        self.inner.read().agents.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node_spec() -> NodeSpec {
        NodeSpec {
            kind: NodeKind::HeavyHost,
            address: "10.0.0.7".to_string(),
            capabilities: "cpu=16;ram=64G".to_string(),
            proxy_addr: None,
        }
    }

    #[test]
    fn register_node_twice_yields_distinct_ids() {
        let state = FabricState::new();
        let now = Utc::now();
        let (a, _) = state.register_node(node_spec(), now);
        let (b, _) = state.register_node(node_spec(), now);
        assert_ne!(a.id, b.id);
        assert_eq!(state.node_count(), 2);
    }

    #[test]
    fn ids_are_unique_across_maps() {
        let state = FabricState::new();
        let now = Utc::now();
        let (node, _) = state.register_node(node_spec(), now);
        let err = state
            .register_agent(
                AgentSpec {
                    id: Some(node.id.clone()),
                    ..AgentSpec::default()
                },
                now,
            )
            .unwrap_err();
        assert!(matches!(err, FabricError::Validation(_)));
    }

    #[test]
    fn stale_node_update_is_rejected_without_mutation() {
        let state = FabricState::new();
        let now = Utc::now();
        let (node, _) = state.register_node(node_spec(), now);
        let later = now + chrono::Duration::seconds(10);
        state
            .apply_node_status(&node.id, NodeStatus::Online, None, later)
            .unwrap();
        let err = state
            .apply_node_status(&node.id, NodeStatus::Degraded, None, now)
            .unwrap_err();
        assert!(matches!(err, FabricError::Stale(_)));
        let stored = state.get_node(&node.id).unwrap();
        assert_eq!(stored.status, NodeStatus::Online);
        assert_eq!(stored.last_seen, later);
    }

    #[test]
    fn same_timestamp_update_is_not_stale() {
        let state = FabricState::new();
        let now = Utc::now();
        let (node, _) = state.register_node(node_spec(), now);
        state
            .apply_node_status(&node.id, NodeStatus::Degraded, None, now)
            .unwrap();
        assert_eq!(state.get_node(&node.id).unwrap().status, NodeStatus::Degraded);
    }

    #[test]
    fn unknown_target_fails_fast() {
        let state = FabricState::new();
        let err = state
            .apply_agent_status("does-not-exist", AgentStatus::Running, None, None, Utc::now())
            .unwrap_err();
        assert!(matches!(err, FabricError::UnknownTarget(_)));
    }

    #[test]
    fn task_progress_is_clamped_to_unit_interval() {
        let state = FabricState::new();
        let now = Utc::now();
        let (agent, _) = state.register_agent(AgentSpec::default(), now).unwrap();
        let (agent, _) = state
            .apply_agent_status(&agent.id, AgentStatus::Running, None, Some(-0.5), now)
            .unwrap();
        assert_eq!(agent.task_progress, Some(0.0));
        let (agent, _) = state
            .apply_agent_status(&agent.id, AgentStatus::Running, None, Some(1.7), now)
            .unwrap();
        assert_eq!(agent.task_progress, Some(1.0));
    }

    #[test]
    fn terminated_is_terminal() {
        let state = FabricState::new();
        let now = Utc::now();
        let (agent, _) = state.register_agent(AgentSpec::default(), now).unwrap();
        let (agent, _) = state
            .apply_agent_status(
                &agent.id,
                AgentStatus::Terminated,
                Some("wrap-up".to_string()),
                None,
                now,
            )
            .unwrap();
        // current_task is cleared on the terminal transition
        assert_eq!(agent.current_task, None);
        assert!(agent.terminated_at.is_some());
        let err = state
            .apply_agent_status(&agent.id, AgentStatus::Running, None, None, now)
            .unwrap_err();
        assert!(matches!(err, FabricError::TerminalLocked(_)));
        assert_eq!(
            state.get_agent(&agent.id).unwrap().status,
            AgentStatus::Terminated
        );
    }

    #[test]
    fn snapshot_reflects_only_the_applied_change() {
        let state = FabricState::new();
        let now = Utc::now();
        let (node, _) = state.register_node(node_spec(), now);
        let before = state.snapshot();
        let later = now + chrono::Duration::seconds(1);
        state
            .apply_node_status(&node.id, NodeStatus::Degraded, None, later)
            .unwrap();
        let after = state.snapshot();
        assert_eq!(before.nodes.len(), after.nodes.len());
        assert_eq!(before.agents.len(), after.agents.len());
        let prev = &before.nodes[0];
        let next = &after.nodes[0];
        assert_eq!(prev.id, next.id);
        assert_eq!(prev.capabilities, next.capabilities);
        assert_eq!(prev.address, next.address);
        assert_ne!(prev.status, next.status);
        assert_ne!(prev.last_seen, next.last_seen);
    }

    #[test]
    fn assignment_requires_a_live_node() {
        let state = FabricState::new();
        let now = Utc::now();
        let (agent, _) = state.register_agent(AgentSpec::default(), now).unwrap();
        let err = state.assign_agent(&agent.id, "node-missing").unwrap_err();
        assert!(matches!(err, FabricError::UnknownTarget(_)));
        let (node, _) = state.register_node(node_spec(), now);
        let agent = state.assign_agent(&agent.id, &node.id).unwrap();
        assert_eq!(agent.assigned_node_id.as_deref(), Some(node.id.as_str()));
    }

    #[test]
    fn node_loss_cascades_error_onto_assigned_agents() {
        let state = FabricState::new();
        let now = Utc::now();
        let (node, _) = state.register_node(node_spec(), now);
        let (agent, _) = state
            .register_agent(
                AgentSpec {
                    assigned_node_id: Some(node.id.clone()),
                    ..AgentSpec::default()
                },
                now,
            )
            .unwrap();
        state.remove_node(&node.id).unwrap();
        let marked = state.mark_node_lost(&node.id, now);
        assert_eq!(marked.len(), 1);
        assert_eq!(state.get_agent(&agent.id).unwrap().status, AgentStatus::Error);
    }
}
