use crate::membership::ReplicaAddress;
use crate::replica::shared_state::Term;
use bytes::Bytes;
use tokio::time::Duration;

/// PeerConnector is how the driver and the broadcaster reach other replicas. Every call is a
/// single attempt; retrying is up to the caller.
#[async_trait::async_trait]
pub(crate) trait PeerConnector: Send + Sync {
    /// Returns whether the peer accepted us as leader for `term`.
    async fn heartbeat(&self, peer: &ReplicaAddress, term: Term, leader: &ReplicaAddress)
        -> Result<bool, PeerCallError>;

    /// Returns whether the peer granted its vote for `term`.
    async fn request_vote(
        &self,
        peer: &ReplicaAddress,
        term: Term,
        candidate: &ReplicaAddress,
    ) -> Result<bool, PeerCallError>;

    async fn execute_command(&self, peer: &ReplicaAddress, name: &str, payload: Bytes) -> Result<(), PeerCallError>;
}

#[derive(Debug, thiserror::Error)]
pub enum PeerCallError {
    #[error("Invalid peer address {address}: {reason}")]
    InvalidAddress { address: ReplicaAddress, reason: String },
    #[error("Failed to connect to {address}: {reason}")]
    ConnectFailure { address: ReplicaAddress, reason: String },
    #[error("Timed out after {1:?} connecting to {0}")]
    ConnectTimeout(ReplicaAddress, Duration),
    #[error("Timed out after {1:?} waiting for {0}")]
    CallTimeout(ReplicaAddress, Duration),
    #[error("{address} replied with {status}")]
    Rpc { address: ReplicaAddress, status: tonic::Status },
    #[error("Call cancelled by shutdown")]
    Cancelled,
}
