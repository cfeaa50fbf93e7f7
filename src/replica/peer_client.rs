use crate::grpc::grpc_replica_client::GrpcReplicaClient;
use crate::grpc::{ProtoExecuteCommandReq, ProtoHeartbeatReq, ProtoRequestVoteReq};
use crate::membership::ReplicaAddress;
use crate::replica::peers::{PeerCallError, PeerConnector};
use crate::replica::shared_state::Term;
use bytes::Bytes;
use std::future::Future;
use tokio::time::Duration;
use tokio_util::sync::CancellationToken;
use tonic::transport::{Channel, Endpoint};

/// PeerClient talks to other replicas over gRPC. Each call opens a fresh connection and closes
/// it when done, so no connection state is shared between calls.
pub(crate) struct PeerClient {
    logger: slog::Logger,
    connect_timeout: Duration,
    call_timeout: Duration,
    shutdown: CancellationToken,
}

impl PeerClient {
    pub(crate) fn new(
        logger: slog::Logger,
        connect_timeout: Duration,
        call_timeout: Duration,
        shutdown: CancellationToken,
    ) -> Self {
        PeerClient {
            logger,
            connect_timeout,
            call_timeout,
            shutdown,
        }
    }

    async fn connect(&self, peer: &ReplicaAddress) -> Result<GrpcReplicaClient<Channel>, PeerCallError> {
        let url = format!("http://{}", peer);
        let endpoint = Endpoint::from_shared(url).map_err(|e| PeerCallError::InvalidAddress {
            address: peer.clone(),
            reason: e.to_string(),
        })?;

        match tokio::time::timeout(self.connect_timeout, endpoint.connect()).await {
            Ok(Ok(channel)) => Ok(GrpcReplicaClient::new(channel)),
            Ok(Err(e)) => Err(PeerCallError::ConnectFailure {
                address: peer.clone(),
                reason: e.to_string(),
            }),
            Err(_) => Err(PeerCallError::ConnectTimeout(peer.clone(), self.connect_timeout)),
        }
    }

    async fn single_call<T, F, Fut>(&self, peer: &ReplicaAddress, call: F) -> Result<T, PeerCallError>
    where
        F: FnOnce(GrpcReplicaClient<Channel>) -> Fut,
        Fut: Future<Output = Result<tonic::Response<T>, tonic::Status>>,
    {
        if self.shutdown.is_cancelled() {
            return Err(PeerCallError::Cancelled);
        }

        let attempt = async {
            let client = self.connect(peer).await?;
            match tokio::time::timeout(self.call_timeout, call(client)).await {
                Ok(Ok(reply)) => Ok(reply.into_inner()),
                Ok(Err(status)) => Err(PeerCallError::Rpc {
                    address: peer.clone(),
                    status,
                }),
                Err(_) => Err(PeerCallError::CallTimeout(peer.clone(), self.call_timeout)),
            }
        };

        tokio::select! {
            result = attempt => result,
            _ = self.shutdown.cancelled() => Err(PeerCallError::Cancelled),
        }
    }
}

#[async_trait::async_trait]
impl PeerConnector for PeerClient {
    async fn heartbeat(
        &self,
        peer: &ReplicaAddress,
        term: Term,
        leader: &ReplicaAddress,
    ) -> Result<bool, PeerCallError> {
        let rpc_request = ProtoHeartbeatReq {
            term: term.as_u64(),
            leader_address: leader.to_string(),
        };

        slog::debug!(self.logger, "ClientWire - {} {:?}", peer, rpc_request);
        let rpc_reply = self
            .single_call(peer, |mut client| async move { client.heartbeat(rpc_request).await })
            .await;
        slog::debug!(self.logger, "ClientWire - {} {:?}", peer, rpc_reply);

        rpc_reply.map(|reply| reply.ok)
    }

    async fn request_vote(
        &self,
        peer: &ReplicaAddress,
        term: Term,
        candidate: &ReplicaAddress,
    ) -> Result<bool, PeerCallError> {
        let rpc_request = ProtoRequestVoteReq {
            term: term.as_u64(),
            candidate_address: candidate.to_string(),
        };

        slog::debug!(self.logger, "ClientWire - {} {:?}", peer, rpc_request);
        let rpc_reply = self
            .single_call(peer, |mut client| async move { client.request_vote(rpc_request).await })
            .await;
        slog::debug!(self.logger, "ClientWire - {} {:?}", peer, rpc_reply);

        rpc_reply.map(|reply| reply.vote_granted)
    }

    async fn execute_command(&self, peer: &ReplicaAddress, name: &str, payload: Bytes) -> Result<(), PeerCallError> {
        let rpc_request = ProtoExecuteCommandReq {
            name: name.to_string(),
            payload: payload.to_vec(),
        };

        slog::debug!(self.logger, "ClientWire - {} {:?}", peer, rpc_request);
        let rpc_reply = self
            .single_call(peer, |mut client| async move { client.execute_command(rpc_request).await })
            .await;
        slog::debug!(self.logger, "ClientWire - {} {:?}", peer, rpc_reply);

        rpc_reply.map(|_| ())
    }
}
