// nexus-fabric-core/src/dispatch.rs - Command routing, scheduling, and delivery tracking

use chrono::Utc;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::{timeout, Instant};
use tonic::transport::Endpoint;
use tonic::Request;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::bus::EventBus;
use crate::error::{FabricError, FabricResult};
use crate::events::{self, InternalEvent};
use crate::fabric_proto::fabric::node_proxy_service_client::NodeProxyServiceClient;
use crate::fabric_proto::fabric::{CommandKind, FabricCommand};
use crate::state::{AgentSpec, FabricState, NodeStatus, TargetKind};

/// Sentinel target that fans a command out to every known proxy.
pub const FABRIC_GLOBAL: &str = "FABRIC_GLOBAL";

#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Per-proxy outbound backlog.
    pub queue_depth: usize,
    /// Time allowed from submission to the terminal event.
    pub command_deadline: Duration,
    /// How long a proxy may take to ack ExecuteCommand.
    pub ack_timeout: Duration,
    /// Base pause before the single transport retry.
    pub retry_backoff: Duration,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            queue_depth: 64,
            command_deadline: Duration::from_secs(60),
            ack_timeout: Duration::from_secs(30),
            retry_backoff: Duration::from_millis(200),
        }
    }
}

struct ProxyChannel {
    tx: mpsc::Sender<FabricCommand>,
    worker: tokio::task::JoinHandle<()>,
}

struct PendingCommand {
    command: FabricCommand,
    deadline: Instant,
}

struct OutstandingCommand {
    target_id: String,
    scheduled: bool,
    deadline: Instant,
}

#[derive(Default)]
struct DispatchInner {
    proxies: HashMap<String, ProxyChannel>,
    /// Commands awaiting a schedulable node, re-evaluated on registration.
    pending: Vec<PendingCommand>,
    /// Routed commands awaiting their terminal report.
    outstanding: HashMap<String, OutstandingCommand>,
}

/// Accepts commands, schedules unassigned agents, and delivers over each
/// proxy's bounded queue. Every accepted command terminates in exactly one
/// COMMAND_COMPLETED or COMMAND_FAILED event, keyed by command id.
#[derive(Clone)]
pub struct CommandDispatcher {
    state: Arc<FabricState>,
    bus: EventBus,
    config: DispatcherConfig,
    inner: Arc<Mutex<DispatchInner>>,
}

impl CommandDispatcher {
    pub fn new(state: Arc<FabricState>, bus: EventBus, config: DispatcherConfig) -> Self {
        Self {
            state,
            bus,
            config,
            inner: Arc::new(Mutex::new(DispatchInner::default())),
        }
    }

    fn publish(&self, event: InternalEvent) {
        self.bus.publish(event.into_wire(events::SOURCE_DISPATCHER));
    }

    /// Attaches a delivery worker for a registered proxy. Replaces any prior
    /// channel for the same node, then re-evaluates held commands against the
    /// new capacity.
    pub fn register_proxy(&self, node_id: &str, proxy_addr: &str) {
        let (tx, rx) = mpsc::channel(self.config.queue_depth);
        let worker = tokio::spawn(deliver_loop(
            self.clone(),
            node_id.to_string(),
            proxy_addr.to_string(),
            rx,
        ));
        let replaced = {
            let mut inner = self.inner.lock();
            inner
                .proxies
                .insert(node_id.to_string(), ProxyChannel { tx, worker })
        };
        if let Some(old) = replaced {
            old.worker.abort();
        }
        info!(node_id, proxy_addr, "proxy delivery channel attached");
        self.reschedule_pending();
    }

    pub fn deregister_proxy(&self, node_id: &str) {
        let removed = {
            let mut inner = self.inner.lock();
            inner.proxies.remove(node_id)
        };
        if let Some(channel) = removed {
            channel.worker.abort();
            debug!(node_id, "proxy delivery channel detached");
        }
    }

    /// Validates and enqueues a command. Returns the assigned command id; the
    /// execution outcome surfaces later as a terminal event.
    pub fn submit(
        &self,
        target_id: &str,
        kind: CommandKind,
        parameters: HashMap<String, String>,
    ) -> FabricResult<String> {
        if target_id.is_empty() {
            return Err(FabricError::Validation("empty target_id".to_string()));
        }
        if kind == CommandKind::Unspecified {
            return Err(FabricError::Validation("unspecified command kind".to_string()));
        }
        let command = FabricCommand {
            command_id: format!("cmd-{}", Uuid::new_v4()),
            target_id: target_id.to_string(),
            kind: kind as i32,
            parameters,
            issued_at: Utc::now().to_rfc3339(),
        };
        let command_id = command.command_id.clone();

        let routed: FabricResult<()> = if target_id == FABRIC_GLOBAL {
            self.publish_submitted(&command);
            self.fan_out(command)
        } else {
            match self.state.resolve(target_id) {
                Some(TargetKind::Node) => {
                    self.publish_submitted(&command);
                    self.route_to_proxy(target_id, command, false)
                }
                Some(TargetKind::Agent) => {
                    self.publish_submitted(&command);
                    self.route_for_agent(command)
                }
                None if kind == CommandKind::DeployAgent => {
                    // Deployment is how agents enter the fabric: an unknown
                    // target id names the agent being created.
                    let spec = AgentSpec {
                        id: Some(target_id.to_string()),
                        display_name: command
                            .parameters
                            .get("name")
                            .cloned()
                            .unwrap_or_else(|| target_id.to_string()),
                        kind: command
                            .parameters
                            .get("agent_kind")
                            .cloned()
                            .unwrap_or_default(),
                        assigned_node_id: None,
                    };
                    match self.state.register_agent(spec, Utc::now()) {
                        Ok((_, event)) => {
                            self.bus.publish(event.into_wire(events::SOURCE_NEXUS));
                            self.publish_submitted(&command);
                            self.route_for_agent(command)
                        }
                        Err(err) => Err(err),
                    }
                }
                None => Err(FabricError::UnknownTarget(target_id.to_string())),
            }
        };
        match routed {
            Ok(()) => Ok(command_id),
            Err(err) => {
                // Whatever went wrong, the command ends here with its one
                // terminal event.
                self.publish(InternalEvent::CommandFailed {
                    command_id,
                    reason: err.code().to_string(),
                    detail: err.to_string(),
                });
                Err(err)
            }
        }
    }

    fn publish_submitted(&self, command: &FabricCommand) {
        self.publish(InternalEvent::CommandSubmitted {
            command_id: command.command_id.clone(),
            target_id: command.target_id.clone(),
            kind: command.kind(),
        });
    }

    fn fan_out(&self, command: FabricCommand) -> FabricResult<()> {
        let targets: Vec<(String, mpsc::Sender<FabricCommand>)> = {
            let inner = self.inner.lock();
            inner
                .proxies
                .iter()
                .map(|(id, ch)| (id.clone(), ch.tx.clone()))
                .collect()
        };
        if targets.is_empty() {
            return Err(FabricError::NoCapacity);
        }
        self.track(&command, false);
        for (node_id, tx) in targets {
            if tx.try_send(command.clone()).is_err() {
                warn!(%node_id, command_id = %command.command_id, "proxy queue full during fan-out");
            }
        }
        Ok(())
    }

    fn route_for_agent(&self, command: FabricCommand) -> FabricResult<()> {
        let agent_id = command.target_id.clone();
        let agent = self
            .state
            .get_agent(&agent_id)
            .ok_or_else(|| FabricError::UnknownTarget(agent_id.clone()))?;

        if command.kind() == CommandKind::MigrateAgent {
            return self.route_migration(command, agent.assigned_node_id);
        }

        match agent.assigned_node_id {
            Some(node_id) => self.route_to_proxy(&node_id, command, false),
            None => self.schedule_or_hold(command),
        }
    }

    /// Cross-proxy migration: a silent stop to the source, reassignment, and
    /// the original command carried to the destination, where it executes as
    /// a fresh deployment.
    fn route_migration(
        &self,
        command: FabricCommand,
        source_node: Option<String>,
    ) -> FabricResult<()> {
        let agent_id = command.target_id.clone();
        let dest = command
            .parameters
            .get("target_node_id")
            .cloned()
            .ok_or_else(|| FabricError::Validation("migration without target_node_id".to_string()))?;
        if self.state.get_node(&dest).is_none() {
            return Err(FabricError::UnknownTarget(dest));
        }
        if let Some(source) = source_node.filter(|source| *source != dest) {
            let stop = FabricCommand {
                command_id: format!("{}::stop", command.command_id),
                target_id: agent_id.clone(),
                kind: CommandKind::StopAgent as i32,
                parameters: HashMap::new(),
                issued_at: command.issued_at.clone(),
            };
            // Untracked sub-command; the terminal event belongs to the
            // migration itself.
            if let Err(err) = self.enqueue(&source, stop) {
                warn!(%agent_id, %source, error = %err, "failed to stop agent on source node");
            }
        }
        self.state.assign_agent(&agent_id, &dest)?;
        self.route_to_proxy(&dest, command, true)
    }

    fn schedule_or_hold(&self, command: FabricCommand) -> FabricResult<()> {
        match self.pick_node(&command) {
            Some(node_id) => {
                self.state.assign_agent(&command.target_id, &node_id)?;
                self.route_to_proxy(&node_id, command, true)
            }
            None => {
                let deadline = Instant::now() + self.config.command_deadline;
                self.inner.lock().pending.push(PendingCommand { command, deadline });
                Ok(())
            }
        }
    }

    /// First-fit by capability containment, tie-broken by lowest reported
    /// cpu_fraction, then lexicographic node id. Only ONLINE nodes with an
    /// attached delivery channel qualify.
    fn pick_node(&self, command: &FabricCommand) -> Option<String> {
        let requires: Vec<String> = command
            .parameters
            .get("requires")
            .map(|raw| {
                raw.split([';', ','])
                    .map(str::trim)
                    .filter(|token| !token.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        let snapshot = self.state.snapshot();
        let inner = self.inner.lock();
        snapshot
            .nodes
            .iter()
            .filter(|node| node.status == NodeStatus::Online)
            .filter(|node| inner.proxies.contains_key(&node.id))
            .filter(|node| requires.iter().all(|token| node.capabilities.contains(token.as_str())))
            .min_by(|a, b| {
                let cpu_a = a
                    .latest_telemetry
                    .as_ref()
                    .map(|t| t.cpu_fraction)
                    .unwrap_or(0.0);
                let cpu_b = b
                    .latest_telemetry
                    .as_ref()
                    .map(|t| t.cpu_fraction)
                    .unwrap_or(0.0);
                cpu_a.total_cmp(&cpu_b).then_with(|| a.id.cmp(&b.id))
            })
            .map(|node| node.id.clone())
    }

    /// Retries held commands; called whenever a new proxy attaches.
    fn reschedule_pending(&self) {
        let held: Vec<PendingCommand> = {
            let mut inner = self.inner.lock();
            std::mem::take(&mut inner.pending)
        };
        for entry in held {
            match self.pick_node(&entry.command) {
                Some(node_id) => {
                    let command_id = entry.command.command_id.clone();
                    if let Err(err) = self
                        .state
                        .assign_agent(&entry.command.target_id, &node_id)
                        .map(|_| ())
                        .and_then(|()| self.route_to_proxy(&node_id, entry.command, true))
                    {
                        warn!(%command_id, error = %err, "held command failed on reschedule");
                        self.publish(InternalEvent::CommandFailed {
                            command_id,
                            reason: err.code().to_string(),
                            detail: err.to_string(),
                        });
                    }
                }
                None => self.inner.lock().pending.push(entry),
            }
        }
    }

    fn route_to_proxy(
        &self,
        node_id: &str,
        command: FabricCommand,
        scheduled: bool,
    ) -> FabricResult<()> {
        self.track(&command, scheduled);
        match self.enqueue(node_id, command.clone()) {
            Ok(()) => Ok(()),
            Err(err) => {
                self.inner.lock().outstanding.remove(&command.command_id);
                Err(err)
            }
        }
    }

    fn enqueue(&self, node_id: &str, command: FabricCommand) -> FabricResult<()> {
        let tx = {
            let inner = self.inner.lock();
            inner
                .proxies
                .get(node_id)
                .map(|channel| channel.tx.clone())
                .ok_or_else(|| FabricError::UnknownTarget(node_id.to_string()))?
        };
        tx.try_send(command)
            .map_err(|_| FabricError::Congested(node_id.to_string()))
    }

    fn track(&self, command: &FabricCommand, scheduled: bool) {
        let mut inner = self.inner.lock();
        inner.outstanding.insert(
            command.command_id.clone(),
            OutstandingCommand {
                target_id: command.target_id.clone(),
                scheduled,
                deadline: Instant::now() + self.config.command_deadline,
            },
        );
    }

    /// Ack arrived from a proxy; emits COMMAND_DELIVERED for tracked commands.
    fn mark_delivered(&self, command_id: &str, node_id: &str) {
        let info = {
            let inner = self.inner.lock();
            inner
                .outstanding
                .get(command_id)
                .map(|entry| (entry.target_id.clone(), entry.scheduled))
        };
        if let Some((target_id, scheduled)) = info {
            self.publish(InternalEvent::CommandDelivered {
                command_id: command_id.to_string(),
                target_id,
                node_id: node_id.to_string(),
                scheduled,
            });
        }
    }

    /// Terminal report from a proxy. Unknown ids (duplicates, untracked
    /// sub-commands) are ignored so each command ends exactly once.
    pub fn report_result(
        &self,
        command_id: &str,
        success: bool,
        error: String,
        details: HashMap<String, String>,
    ) {
        let tracked = self.inner.lock().outstanding.remove(command_id).is_some();
        if !tracked {
            debug!(command_id, "result for unknown or already-terminated command");
            return;
        }
        if success {
            self.publish(InternalEvent::CommandCompleted {
                command_id: command_id.to_string(),
                details,
            });
        } else {
            let reason = if error.is_empty() {
                "EXECUTION_FAILED".to_string()
            } else {
                error
            };
            let detail = details.get("detail").cloned().unwrap_or_default();
            self.publish(InternalEvent::CommandFailed {
                command_id: command_id.to_string(),
                reason,
                detail,
            });
        }
    }

    fn fail_terminal(&self, command_id: &str, reason: &str, detail: String) {
        let tracked = self.inner.lock().outstanding.remove(command_id).is_some();
        if tracked {
            self.publish(InternalEvent::CommandFailed {
                command_id: command_id.to_string(),
                reason: reason.to_string(),
                detail,
            });
        }
    }

    /// Expires held and routed commands past their deadline.
    pub fn expire_deadlines(&self) {
        let now = Instant::now();
        let (expired_pending, expired_outstanding) = {
            let mut inner = self.inner.lock();
            let mut expired_pending = Vec::new();
            inner.pending.retain(|entry| {
                if entry.deadline <= now {
                    expired_pending.push(entry.command.command_id.clone());
                    false
                } else {
                    true
                }
            });
            let expired_outstanding: Vec<String> = inner
                .outstanding
                .iter()
                .filter(|(_, entry)| entry.deadline <= now)
                .map(|(id, _)| id.clone())
                .collect();
            for id in &expired_outstanding {
                inner.outstanding.remove(id);
            }
            (expired_pending, expired_outstanding)
        };
        for command_id in expired_pending {
            self.publish(InternalEvent::CommandFailed {
                command_id,
                reason: "NO_CAPACITY".to_string(),
                detail: "no schedulable node before the deadline".to_string(),
            });
        }
        for command_id in expired_outstanding {
            self.publish(InternalEvent::CommandFailed {
                command_id,
                reason: "TIMEOUT".to_string(),
                detail: "no terminal report before the deadline".to_string(),
            });
        }
    }

    /// Background deadline enforcement; one task per Nexus.
    pub async fn run_deadline_sweeper(self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(Duration::from_millis(250));
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                _ = ticker.tick() => self.expire_deadlines(),
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        debug!("dispatcher deadline sweeper stopped");
    }

    pub fn shutdown(&self) {
        let mut inner = self.inner.lock();
        for (_, channel) in inner.proxies.drain() {
            channel.worker.abort();
        }
        inner.pending.clear();
        inner.outstanding.clear();
    }

    #[cfg(test)]
    fn pending_len(&self) -> usize {
        self.inner.lock().pending.len()
    }

    #[cfg(test)]
    fn outstanding_len(&self) -> usize {
        self.inner.lock().outstanding.len()
    }
}

/// Deterministic retry jitter derived from the command id.
fn jitter_ms(seed: &str) -> u64 {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};
    let mut hasher = DefaultHasher::new();
    seed.hash(&mut hasher);
    hasher.finish() % 250
}

/// One per attached proxy: drains the bounded queue and pushes commands over
/// the proxy's NodeProxyService, retrying once before giving up.
async fn deliver_loop(
    dispatcher: CommandDispatcher,
    node_id: String,
    proxy_addr: String,
    mut rx: mpsc::Receiver<FabricCommand>,
) {
    let endpoint = match Endpoint::from_shared(format!("http://{proxy_addr}")) {
        Ok(endpoint) => endpoint,
        Err(err) => {
            error!(%node_id, %proxy_addr, error = %err, "bad proxy address; failing deliveries");
            while let Some(command) = rx.recv().await {
                dispatcher.fail_terminal(
                    &command.command_id,
                    "TRANSPORT",
                    format!("unusable proxy address {proxy_addr}"),
                );
            }
            return;
        }
    };
    let channel = endpoint.connect_lazy();
    let mut client = NodeProxyServiceClient::new(channel);
    while let Some(command) = rx.recv().await {
        deliver_one(&dispatcher, &node_id, &mut client, command).await;
    }
    debug!(%node_id, "delivery worker drained");
}

async fn deliver_one(
    dispatcher: &CommandDispatcher,
    node_id: &str,
    client: &mut NodeProxyServiceClient<tonic::transport::Channel>,
    command: FabricCommand,
) {
    let command_id = command.command_id.clone();
    let mut last_error = String::new();
    for attempt in 0..2 {
        if attempt > 0 {
            let pause = dispatcher.config.retry_backoff
                + Duration::from_millis(jitter_ms(&command_id));
            debug!(%command_id, node_id, ?pause, "retrying delivery");
            tokio::time::sleep(pause).await;
        }
        let call = client.execute_command(Request::new(command.clone()));
        match timeout(dispatcher.config.ack_timeout, call).await {
            Ok(Ok(response)) => {
                let ack = response.into_inner();
                if ack.accepted {
                    dispatcher.mark_delivered(&command_id, node_id);
                } else {
                    dispatcher.fail_terminal(&command_id, "PROXY_REJECTED", ack.error);
                }
                return;
            }
            Ok(Err(status)) => {
                last_error = status.message().to_string();
                warn!(%command_id, node_id, error = %last_error, "delivery attempt failed");
            }
            Err(_) => {
                dispatcher.fail_terminal(
                    &command_id,
                    "TIMEOUT",
                    format!("proxy did not ack within {:?}", dispatcher.config.ack_timeout),
                );
                return;
            }
        }
    }
    dispatcher.fail_terminal(&command_id, "TRANSPORT", last_error);
}
