// Integration tests for the fabric gRPC server

use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::oneshot;
use tokio::time::{sleep, timeout, Duration};
use tonic::transport::Server;
use tonic::{Request, Response, Status};

use nexus_fabric_core::fabric_proto::fabric::fabric_service_client::FabricServiceClient;
use nexus_fabric_core::fabric_proto::fabric::node_proxy_service_server::{
    NodeProxyService, NodeProxyServiceServer,
};
use nexus_fabric_core::fabric_proto::fabric::*;
use nexus_fabric_core::{spawn_server_with_shutdown, FabricManager, NexusConfig};

async fn start_nexus(listen: &str) -> (oneshot::Sender<()>, tokio::task::JoinHandle<()>) {
    let config = NexusConfig {
        grpc_listen_addr: listen.to_string(),
        ..NexusConfig::default()
    };
    let manager = FabricManager::new(config);
    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let handle = tokio::spawn(async move {
        spawn_server_with_shutdown(manager, Some(shutdown_rx))
            .await
            .unwrap();
    });
    sleep(Duration::from_millis(300)).await; // Wait for server to bind
    (shutdown_tx, handle)
}

async fn collect_kinds(
    stream: &mut tonic::codec::Streaming<FabricEvent>,
    want: usize,
) -> Vec<FabricEvent> {
    let mut events = Vec::new();
    for _ in 0..want {
        match timeout(Duration::from_secs(3), stream.message()).await {
            Ok(Ok(Some(event))) => events.push(event),
            _ => break,
        }
    }
    events
}

#[tokio::test]
async fn register_update_and_stream() {
    let (shutdown_tx, handle) = start_nexus("127.0.0.1:50061").await;
    let mut client = FabricServiceClient::connect("http://127.0.0.1:50061")
        .await
        .unwrap();

    // Live-only subscription, attached before any activity.
    let mut stream = client
        .stream_events(Request::new(StreamEventsRequest {
            include_snapshot: false,
        }))
        .await
        .unwrap()
        .into_inner();

    let registered = client
        .register_node(Request::new(RegisterNodeRequest {
            kind: NodeKind::HeavyHost as i32,
            address: "10.0.0.7".to_string(),
            capabilities: "cpu=16;ram=64G".to_string(),
            proxy_addr: String::new(),
        }))
        .await
        .unwrap()
        .into_inner();
    let node_id = registered.node_id;
    assert!(!node_id.is_empty());
    assert_eq!(registered.status, "REGISTERED");

    let update_time = Utc::now();
    let response = client
        .update_status(Request::new(UpdateStatusRequest {
            id: node_id.clone(),
            target: StatusTarget::Node as i32,
            status_value: "ONLINE".to_string(),
            telemetry: Some(Telemetry {
                cpu_fraction: 0.12,
                memory_fraction: 0.34,
                net_in_bps: 1000,
                net_out_bps: 2000,
                disk_used_bytes: 0,
                timestamp: update_time.to_rfc3339(),
            }),
            current_task: None,
            task_progress: None,
            timestamp: update_time.to_rfc3339(),
        }))
        .await
        .unwrap()
        .into_inner();
    assert_eq!(response.outcome(), UpdateOutcome::Ok);

    let events = collect_kinds(&mut stream, 2).await;
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].kind(), EventKind::NodeRegistered);
    assert_eq!(events[0].attributes["node_id"], node_id);
    assert_eq!(events[0].attributes["kind"], "HEAVY_HOST");
    assert_eq!(events[1].kind(), EventKind::NodeStatusUpdated);
    assert_eq!(events[1].attributes["new_status"], "ONLINE");
    let telemetry = events[1].telemetry.as_ref().unwrap();
    assert!((telemetry.cpu_fraction - 0.12).abs() < f64::EPSILON);

    // Older timestamp: acknowledged as STALE, state untouched, no event.
    let stale = client
        .update_status(Request::new(UpdateStatusRequest {
            id: node_id.clone(),
            target: StatusTarget::Node as i32,
            status_value: "DEGRADED".to_string(),
            telemetry: None,
            current_task: None,
            task_progress: None,
            timestamp: (update_time - chrono::Duration::seconds(60)).to_rfc3339(),
        }))
        .await
        .unwrap()
        .into_inner();
    assert_eq!(stale.outcome(), UpdateOutcome::Stale);

    // Unknown agent id: typed outcome, no transport error.
    let unknown = client
        .update_status(Request::new(UpdateStatusRequest {
            id: "does-not-exist".to_string(),
            target: StatusTarget::Agent as i32,
            status_value: "RUNNING".to_string(),
            telemetry: None,
            current_task: None,
            task_progress: None,
            timestamp: Utc::now().to_rfc3339(),
        }))
        .await
        .unwrap()
        .into_inner();
    assert_eq!(unknown.outcome(), UpdateOutcome::UnknownTarget);

    // Neither produced an event.
    let extra = timeout(Duration::from_millis(300), stream.message()).await;
    assert!(extra.is_err());

    // Commands against unknown non-agent targets are refused up front.
    let refused = client
        .submit_command(Request::new(SubmitCommandRequest {
            target_id: "ghost".to_string(),
            kind: CommandKind::StopAgent as i32,
            parameters: HashMap::new(),
        }))
        .await
        .unwrap()
        .into_inner();
    assert!(!refused.accepted);
    assert_eq!(refused.reason, "UNKNOWN_TARGET");

    drop(stream);
    let _ = shutdown_tx.send(());
    let _ = handle.await;
}

#[tokio::test]
async fn snapshot_prelude_is_opt_in() {
    let (shutdown_tx, handle) = start_nexus("127.0.0.1:50062").await;
    let mut client = FabricServiceClient::connect("http://127.0.0.1:50062")
        .await
        .unwrap();

    client
        .register_node(Request::new(RegisterNodeRequest {
            kind: NodeKind::LightHost as i32,
            address: "10.0.0.8".to_string(),
            capabilities: String::new(),
            proxy_addr: String::new(),
        }))
        .await
        .unwrap();

    let mut stream = client
        .stream_events(Request::new(StreamEventsRequest {
            include_snapshot: true,
        }))
        .await
        .unwrap()
        .into_inner();
    let events = collect_kinds(&mut stream, 3).await;
    assert_eq!(events.len(), 3);
    assert_eq!(events[0].kind(), EventKind::SnapshotBegin);
    assert_eq!(events[0].attributes["node_count"], "1");
    assert_eq!(events[1].kind(), EventKind::NodeRegistered);
    assert_eq!(events[2].kind(), EventKind::SnapshotEnd);

    drop(stream);
    let _ = shutdown_tx.send(());
    let _ = handle.await;
}

/// Stub proxy: acks every command and reports success back to the Nexus.
struct StubProxy {
    nexus_addr: String,
}

#[tonic::async_trait]
impl NodeProxyService for StubProxy {
    async fn execute_command(
        &self,
        request: Request<FabricCommand>,
    ) -> Result<Response<CommandAck>, Status> {
        let command = request.into_inner();
        let nexus_addr = self.nexus_addr.clone();
        tokio::spawn(async move {
            if let Ok(mut client) = FabricServiceClient::connect(nexus_addr).await {
                let mut details = HashMap::new();
                details.insert("container_id".to_string(), "stub-1".to_string());
                let _ = client
                    .report_command_result(Request::new(CommandResultReport {
                        command_id: command.command_id,
                        success: true,
                        error: String::new(),
                        details,
                    }))
                    .await;
            }
        });
        Ok(Response::new(CommandAck {
            accepted: true,
            error: String::new(),
        }))
    }
}

#[tokio::test]
async fn command_round_trip_through_a_proxy() {
    let (shutdown_tx, handle) = start_nexus("127.0.0.1:50063").await;

    // Stand up the stub proxy service the dispatcher will dial.
    let (proxy_stop_tx, proxy_stop_rx) = oneshot::channel::<()>();
    let proxy = tokio::spawn(async move {
        Server::builder()
            .add_service(NodeProxyServiceServer::new(StubProxy {
                nexus_addr: "http://127.0.0.1:50063".to_string(),
            }))
            .serve_with_shutdown("127.0.0.1:50073".parse().unwrap(), async {
                proxy_stop_rx.await.ok();
            })
            .await
            .unwrap();
    });
    sleep(Duration::from_millis(300)).await;

    let mut client = FabricServiceClient::connect("http://127.0.0.1:50063")
        .await
        .unwrap();
    let mut stream = client
        .stream_events(Request::new(StreamEventsRequest {
            include_snapshot: false,
        }))
        .await
        .unwrap()
        .into_inner();

    let registered = client
        .register_node(Request::new(RegisterNodeRequest {
            kind: NodeKind::HeavyHost as i32,
            address: "127.0.0.1".to_string(),
            capabilities: "cpu=8".to_string(),
            proxy_addr: "127.0.0.1:50073".to_string(),
        }))
        .await
        .unwrap()
        .into_inner();
    let node_id = registered.node_id;

    let submitted = client
        .submit_command(Request::new(SubmitCommandRequest {
            target_id: node_id.clone(),
            kind: CommandKind::RebootNode as i32,
            parameters: HashMap::new(),
        }))
        .await
        .unwrap()
        .into_inner();
    assert!(submitted.accepted);
    let command_id = submitted.command_id;

    // NODE_REGISTERED, then the command's submitted/delivered/completed arc.
    let mut saw = Vec::new();
    for _ in 0..8 {
        match timeout(Duration::from_secs(5), stream.message()).await {
            Ok(Ok(Some(event))) => {
                let kind = event.kind();
                if event
                    .attributes
                    .get("command_id")
                    .map(|id| id == &command_id)
                    .unwrap_or(false)
                {
                    saw.push(kind);
                }
                if kind == EventKind::CommandCompleted {
                    break;
                }
            }
            _ => break,
        }
    }
    assert_eq!(
        saw,
        vec![
            EventKind::CommandSubmitted,
            EventKind::CommandDelivered,
            EventKind::CommandCompleted
        ]
    );

    drop(stream);
    let _ = proxy_stop_tx.send(());
    let _ = shutdown_tx.send(());
    let _ = proxy.await;
    let _ = handle.await;
}
