// nexus-fabric-core/src/server.rs - gRPC adapter over the fabric manager

use chrono::{DateTime, Utc};
use std::pin::Pin;
use tonic::transport::Server;
use tonic::{Request, Response, Status};
use tracing::{debug, info, warn};

use crate::error::FabricError;
use crate::fabric_proto::fabric::fabric_service_server::{FabricService, FabricServiceServer};
use crate::fabric_proto::fabric::{
    CommandAck, CommandResultReport, FabricEvent, RegisterNodeRequest, RegisterNodeResponse,
    StatusTarget, StreamEventsRequest, SubmitCommandRequest, SubmitCommandResponse, Telemetry,
    UpdateOutcome, UpdateStatusRequest, UpdateStatusResponse,
};
use crate::manager::FabricManager;
use crate::state::{AgentStatus, NodeSpec, NodeStatus, TelemetrySnapshot};

pub struct FabricServiceServerImpl {
    manager: FabricManager,
}

impl FabricServiceServerImpl {
    pub fn new(manager: FabricManager) -> Self {
        Self { manager }
    }
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, Status> {
    if raw.is_empty() {
        return Ok(Utc::now());
    }
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|_| Status::invalid_argument(format!("bad timestamp: {raw}")))
}

fn telemetry_from_wire(telemetry: Telemetry) -> Result<TelemetrySnapshot, Status> {
    Ok(TelemetrySnapshot {
        cpu_fraction: telemetry.cpu_fraction,
        memory_fraction: telemetry.memory_fraction,
        net_in_bps: telemetry.net_in_bps,
        net_out_bps: telemetry.net_out_bps,
        disk_used_bytes: telemetry.disk_used_bytes,
        timestamp: parse_timestamp(&telemetry.timestamp)?,
    })
}

#[tonic::async_trait]
impl FabricService for FabricServiceServerImpl {
    async fn register_node(
        &self,
        request: Request<RegisterNodeRequest>,
    ) -> Result<Response<RegisterNodeResponse>, Status> {
        let req = request.into_inner();
        debug!(kind = req.kind().as_str_name(), address = %req.address, "registration request");
        let spec = NodeSpec {
            kind: req.kind().into(),
            address: req.address,
            capabilities: req.capabilities,
            proxy_addr: if req.proxy_addr.is_empty() {
                None
            } else {
                Some(req.proxy_addr)
            },
        };
        let node = self.manager.register_node(spec);
        Ok(Response::new(RegisterNodeResponse {
            node_id: node.id,
            status: "REGISTERED".to_string(),
            message: "Successfully registered compute node.".to_string(),
        }))
    }

    async fn update_status(
        &self,
        request: Request<UpdateStatusRequest>,
    ) -> Result<Response<UpdateStatusResponse>, Status> {
        let req = request.into_inner();
        if req.id.is_empty() {
            return Err(Status::invalid_argument("target id cannot be empty"));
        }
        let observed_at = parse_timestamp(&req.timestamp)?;
        let result = match req.target() {
            StatusTarget::Node => {
                let status = NodeStatus::parse(&req.status_value).ok_or_else(|| {
                    Status::invalid_argument(format!("bad node status: {}", req.status_value))
                })?;
                let telemetry = req.telemetry.map(telemetry_from_wire).transpose()?;
                self.manager
                    .update_node_status(&req.id, status, telemetry, observed_at)
                    .map(|_| ())
            }
            StatusTarget::Agent => {
                let status = AgentStatus::parse(&req.status_value).ok_or_else(|| {
                    Status::invalid_argument(format!("bad agent status: {}", req.status_value))
                })?;
                self.manager
                    .update_agent_status(
                        &req.id,
                        status,
                        req.current_task,
                        req.task_progress,
                        observed_at,
                    )
                    .map(|_| ())
            }
            StatusTarget::Unspecified => {
                return Err(Status::invalid_argument("status target must be NODE or AGENT"));
            }
        };
        let response = match result {
            Ok(()) => UpdateStatusResponse {
                outcome: UpdateOutcome::Ok as i32,
                message: "Status update applied.".to_string(),
            },
            Err(err) => match FabricManager::outcome_for(&err) {
                Some(outcome) => {
                    warn!(id = %req.id, outcome = outcome.as_str_name(), "status update not applied");
                    UpdateStatusResponse {
                        outcome: outcome as i32,
                        message: err.to_string(),
                    }
                }
                None => return Err(err.into()),
            },
        };
        Ok(Response::new(response))
    }

    type StreamEventsStream =
        Pin<Box<dyn tokio_stream::Stream<Item = Result<FabricEvent, Status>> + Send + 'static>>;

    async fn stream_events(
        &self,
        request: Request<StreamEventsRequest>,
    ) -> Result<Response<Self::StreamEventsStream>, Status> {
        let req = request.into_inner();
        let include_snapshot =
            req.include_snapshot || self.manager.config().snapshot_prelude_on_subscribe;
        let (mut subscription, prelude) = self.manager.subscribe(include_snapshot);
        debug!(include_snapshot, "event stream subscriber connected");
        // The subscription lives inside the stream; dropping the stream on
        // disconnect releases it on every exit path.
        let output = async_stream::stream! {
            if let Some(prelude) = prelude {
                for event in prelude {
                    yield Ok(event);
                }
            }
            while let Some(event) = subscription.next().await {
                yield Ok(event);
            }
        };
        Ok(Response::new(Box::pin(output) as Self::StreamEventsStream))
    }

    async fn submit_command(
        &self,
        request: Request<SubmitCommandRequest>,
    ) -> Result<Response<SubmitCommandResponse>, Status> {
        let req = request.into_inner();
        let kind = req.kind();
        match self.manager.submit_command(&req.target_id, kind, req.parameters) {
            Ok(command_id) => Ok(Response::new(SubmitCommandResponse {
                command_id,
                accepted: true,
                reason: String::new(),
            })),
            Err(err @ FabricError::Validation(_)) => Err(err.into()),
            Err(err) => Ok(Response::new(SubmitCommandResponse {
                command_id: String::new(),
                accepted: false,
                reason: err.code().to_string(),
            })),
        }
    }

    async fn report_command_result(
        &self,
        request: Request<CommandResultReport>,
    ) -> Result<Response<CommandAck>, Status> {
        let req = request.into_inner();
        if req.command_id.is_empty() {
            return Err(Status::invalid_argument("command_id cannot be empty"));
        }
        self.manager
            .report_command_result(&req.command_id, req.success, req.error, req.details);
        Ok(Response::new(CommandAck {
            accepted: true,
            error: String::new(),
        }))
    }
}

/// Serves the fabric API until the optional shutdown channel fires, then
/// releases the manager's background resources.
pub async fn spawn_server_with_shutdown(
    manager: FabricManager,
    shutdown: Option<tokio::sync::oneshot::Receiver<()>>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let addr = manager.config().listen_addr()?;
    let service = FabricServiceServerImpl::new(manager.clone());
    let server = Server::builder().add_service(FabricServiceServer::new(service));
    info!(%addr, "starting fabric gRPC server");
    match shutdown {
        Some(rx) => {
            server
                .serve_with_shutdown(addr, async {
                    rx.await.ok();
                })
                .await?;
        }
        None => server.serve(addr).await?,
    }
    manager.shutdown();
    Ok(())
}

pub async fn spawn_server(manager: FabricManager) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    spawn_server_with_shutdown(manager, None).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NexusConfig;
    use crate::fabric_proto::fabric::{EventKind, NodeKind};
    use futures::StreamExt;

    fn service() -> FabricServiceServerImpl {
        FabricServiceServerImpl::new(FabricManager::new(NexusConfig::default()))
    }

    #[tokio::test]
    async fn update_for_unknown_agent_returns_unknown_target() {
        let service = service();
        let response = service
            .update_status(Request::new(UpdateStatusRequest {
                id: "does-not-exist".to_string(),
                target: StatusTarget::Agent as i32,
                status_value: "RUNNING".to_string(),
                telemetry: None,
                current_task: None,
                task_progress: None,
                timestamp: String::new(),
            }))
            .await
            .unwrap()
            .into_inner();
        assert_eq!(response.outcome(), UpdateOutcome::UnknownTarget);
    }

    #[tokio::test]
    async fn empty_id_is_a_validation_error() {
        let service = service();
        let err = service
            .update_status(Request::new(UpdateStatusRequest {
                id: String::new(),
                target: StatusTarget::Node as i32,
                status_value: "ONLINE".to_string(),
                telemetry: None,
                current_task: None,
                task_progress: None,
                timestamp: String::new(),
            }))
            .await
            .unwrap_err();
        assert_eq!(err.code(), tonic::Code::InvalidArgument);
    }

    #[tokio::test]
    async fn register_then_update_round_trip() {
        let service = service();
        let registered = service
            .register_node(Request::new(RegisterNodeRequest {
                kind: NodeKind::HeavyHost as i32,
                address: "10.0.0.7".to_string(),
                capabilities: "cpu=16;ram=64G".to_string(),
                proxy_addr: String::new(),
            }))
            .await
            .unwrap()
            .into_inner();
        assert!(!registered.node_id.is_empty());
        assert_eq!(registered.status, "REGISTERED");
        let response = service
            .update_status(Request::new(UpdateStatusRequest {
                id: registered.node_id,
                target: StatusTarget::Node as i32,
                status_value: "online".to_string(),
                telemetry: None,
                current_task: None,
                task_progress: None,
                timestamp: String::new(),
            }))
            .await
            .unwrap()
            .into_inner();
        assert_eq!(response.outcome(), UpdateOutcome::Ok);
    }

    #[tokio::test]
    async fn snapshot_prelude_brackets_existing_entities() {
        let service = service();
        service
            .register_node(Request::new(RegisterNodeRequest {
                kind: NodeKind::LightHost as i32,
                address: "10.0.0.8".to_string(),
                capabilities: String::new(),
                proxy_addr: String::new(),
            }))
            .await
            .unwrap();
        let mut stream = service
            .stream_events(Request::new(StreamEventsRequest {
                include_snapshot: true,
            }))
            .await
            .unwrap()
            .into_inner();
        let begin = stream.next().await.unwrap().unwrap();
        assert_eq!(begin.kind(), EventKind::SnapshotBegin);
        let node = stream.next().await.unwrap().unwrap();
        assert_eq!(node.kind(), EventKind::NodeRegistered);
        let end = stream.next().await.unwrap().unwrap();
        assert_eq!(end.kind(), EventKind::SnapshotEnd);
    }

    #[tokio::test]
    async fn unknown_command_target_is_not_accepted() {
        let service = service();
        let response = service
            .submit_command(Request::new(SubmitCommandRequest {
                target_id: "ghost".to_string(),
                kind: crate::fabric_proto::fabric::CommandKind::StopAgent as i32,
                parameters: Default::default(),
            }))
            .await
            .unwrap()
            .into_inner();
        assert!(!response.accepted);
        assert_eq!(response.reason, "UNKNOWN_TARGET");
    }
}
