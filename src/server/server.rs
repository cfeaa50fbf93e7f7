use crate::grpc::grpc_replica_server::{GrpcReplica, GrpcReplicaServer};
use crate::grpc::{
    ProtoExecuteCommandReply, ProtoExecuteCommandReq, ProtoHeartbeatReply, ProtoHeartbeatReq, ProtoRequestVoteReply,
    ProtoRequestVoteReq,
};
use crate::membership::ReplicaAddress;
use crate::replica::{ExecuteCommandInput, Gateway, GatewayError, HeartbeatInput, RequestVoteInput, Term};
use bytes::Bytes;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tonic::transport::Server;
use tonic::{Request, Response, Status};

/// RpcServer is the type that implements the replica gRPC interface. It only converts between
/// wire and application types; the gateway does the work.
pub(crate) struct RpcServer {
    logger: slog::Logger,
    gateway: Arc<Gateway>,
}

impl RpcServer {
    pub(crate) fn new(logger: slog::Logger, gateway: Arc<Gateway>) -> Self {
        RpcServer { logger, gateway }
    }

    pub(crate) async fn run(self, socket_addr: SocketAddr, shutdown: CancellationToken) {
        let logger = self.logger.clone();
        slog::info!(logger, "Listening on '{:?}'", socket_addr);

        let result = Server::builder()
            .add_service(GrpcReplicaServer::new(self))
            .serve_with_shutdown(socket_addr, async move { shutdown.cancelled().await })
            .await;

        slog::info!(logger, "Server run() has exited: {:?}", result);
    }

    async fn handle_heartbeat(&self, rpc_request: ProtoHeartbeatReq) -> Result<ProtoHeartbeatReply, Status> {
        let app_input = HeartbeatInput {
            leader_term: Term::new(rpc_request.term),
            leader_address: ReplicaAddress::new(rpc_request.leader_address),
        };
        let app_output = self
            .gateway
            .handle_heartbeat(app_input)
            .await
            .map_err(gateway_error_to_status)?;

        Ok(ProtoHeartbeatReply { ok: app_output.ok })
    }

    async fn handle_request_vote(&self, rpc_request: ProtoRequestVoteReq) -> Result<ProtoRequestVoteReply, Status> {
        let app_input = RequestVoteInput {
            candidate_term: Term::new(rpc_request.term),
            candidate_address: ReplicaAddress::new(rpc_request.candidate_address),
        };
        let app_output = self
            .gateway
            .handle_request_vote(app_input)
            .await
            .map_err(gateway_error_to_status)?;

        Ok(ProtoRequestVoteReply {
            vote_granted: app_output.vote_granted,
        })
    }

    async fn handle_execute_command(
        &self,
        rpc_request: ProtoExecuteCommandReq,
    ) -> Result<ProtoExecuteCommandReply, Status> {
        let app_input = ExecuteCommandInput {
            name: rpc_request.name,
            payload: Bytes::from(rpc_request.payload),
        };
        self.gateway
            .handle_execute_command(app_input)
            .await
            .map_err(gateway_error_to_status)?;

        Ok(ProtoExecuteCommandReply {})
    }
}

pub(crate) fn gateway_error_to_status(err: GatewayError) -> Status {
    let message = err.to_string();
    match err {
        GatewayError::NotAcceptingHeartbeats | GatewayError::NotAcceptingElectionRequests => {
            Status::unavailable(message)
        }
        GatewayError::UnknownCommand(_) => Status::not_found(message),
        GatewayError::CommandFailed { .. } => Status::internal(message),
        GatewayError::MembershipUnavailable(_) => Status::unavailable(message),
        GatewayError::ShuttingDown => Status::cancelled(message),
    }
}

#[async_trait::async_trait]
impl GrpcReplica for RpcServer {
    async fn heartbeat(
        &self,
        rpc_request_wrapped: Request<ProtoHeartbeatReq>,
    ) -> Result<Response<ProtoHeartbeatReply>, Status> {
        let rpc_request = rpc_request_wrapped.into_inner();

        slog::debug!(self.logger, "ServerWire - {:?}", rpc_request);
        let rpc_result = self.handle_heartbeat(rpc_request).await;
        slog::debug!(self.logger, "ServerWire - {:?}", rpc_result);

        rpc_result.map(Response::new)
    }

    async fn request_vote(
        &self,
        rpc_request_wrapped: Request<ProtoRequestVoteReq>,
    ) -> Result<Response<ProtoRequestVoteReply>, Status> {
        let rpc_request = rpc_request_wrapped.into_inner();

        slog::debug!(self.logger, "ServerWire - {:?}", rpc_request);
        let rpc_result = self.handle_request_vote(rpc_request).await;
        slog::debug!(self.logger, "ServerWire - {:?}", rpc_result);

        rpc_result.map(Response::new)
    }

    async fn execute_command(
        &self,
        rpc_request_wrapped: Request<ProtoExecuteCommandReq>,
    ) -> Result<Response<ProtoExecuteCommandReply>, Status> {
        let rpc_request = rpc_request_wrapped.into_inner();

        slog::debug!(self.logger, "ServerWire - {:?}", rpc_request);
        let rpc_result = self.handle_execute_command(rpc_request).await;
        slog::debug!(self.logger, "ServerWire - {:?}", rpc_result);

        rpc_result.map(Response::new)
    }
}
