use crate::api::CommandError;
use crate::membership::{MembershipError, ReplicaAddress};
use crate::replica::shared_state::Term;
use bytes::Bytes;

#[derive(Debug)]
pub(crate) struct HeartbeatInput {
    pub(crate) leader_term: Term,
    pub(crate) leader_address: ReplicaAddress,
}

#[derive(Debug, Eq, PartialEq)]
pub(crate) struct HeartbeatOutput {
    pub(crate) ok: bool,
}

#[derive(Debug)]
pub(crate) struct RequestVoteInput {
    pub(crate) candidate_term: Term,
    pub(crate) candidate_address: ReplicaAddress,
}

#[derive(Debug, Eq, PartialEq)]
pub(crate) struct RequestVoteOutput {
    pub(crate) vote_granted: bool,
}

#[derive(Debug)]
pub(crate) struct ExecuteCommandInput {
    pub(crate) name: String,
    pub(crate) payload: Bytes,
}

#[derive(Debug, thiserror::Error)]
pub(crate) enum GatewayError {
    #[error("Replica not accepting heartbeats")]
    NotAcceptingHeartbeats,
    #[error("Replica not accepting election requests")]
    NotAcceptingElectionRequests,
    #[error("Unknown command {0:?}")]
    UnknownCommand(String),
    #[error("Error executing command {name:?}: {source}")]
    CommandFailed { name: String, source: CommandError },
    #[error("Error getting replicas: {0}")]
    MembershipUnavailable(#[from] MembershipError),
    #[error("Replica is shutting down")]
    ShuttingDown,
}
