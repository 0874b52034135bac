// nexus-fabric-core/src/proxy/service.rs - Command intake from the Nexus

use tokio::sync::mpsc;
use tonic::{Request, Response, Status};
use tracing::{info, warn};

use crate::fabric_proto::fabric::node_proxy_service_server::NodeProxyService;
use crate::fabric_proto::fabric::{CommandAck, FabricCommand};

/// Accepts dispatched commands and hands them to the local executor queue.
/// The ack only means "queued here"; execution results travel back through
/// ReportCommandResult.
pub struct NodeProxyServiceImpl {
    commands: mpsc::Sender<FabricCommand>,
}

impl NodeProxyServiceImpl {
    pub fn new(commands: mpsc::Sender<FabricCommand>) -> Self {
        Self { commands }
    }
}

#[tonic::async_trait]
impl NodeProxyService for NodeProxyServiceImpl {
    async fn execute_command(
        &self,
        request: Request<FabricCommand>,
    ) -> Result<Response<CommandAck>, Status> {
        let command = request.into_inner();
        info!(
            command_id = %command.command_id,
            kind = command.kind().as_str_name(),
            target = %command.target_id,
            "command received"
        );
        match self.commands.try_send(command) {
            Ok(()) => Ok(Response::new(CommandAck {
                accepted: true,
                error: String::new(),
            })),
            Err(err) => {
                warn!(error = %err, "executor queue full; rejecting command");
                Ok(Response::new(CommandAck {
                    accepted: false,
                    error: "executor queue full".to_string(),
                }))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fabric_proto::fabric::CommandKind;

    fn command(id: &str) -> FabricCommand {
        FabricCommand {
            command_id: id.to_string(),
            target_id: "agent-1".to_string(),
            kind: CommandKind::StopAgent as i32,
            parameters: Default::default(),
            issued_at: String::new(),
        }
    }

    #[tokio::test]
    async fn ack_reflects_queue_capacity() {
        let (tx, mut rx) = mpsc::channel(1);
        let service = NodeProxyServiceImpl::new(tx);
        let first = service
            .execute_command(Request::new(command("cmd-1")))
            .await
            .unwrap()
            .into_inner();
        assert!(first.accepted);
        let second = service
            .execute_command(Request::new(command("cmd-2")))
            .await
            .unwrap()
            .into_inner();
        assert!(!second.accepted);
        assert_eq!(rx.recv().await.unwrap().command_id, "cmd-1");
    }
}
