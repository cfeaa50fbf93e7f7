use crate::api::CommandContext;
use crate::membership::{Membership, ReplicaAddress};
use crate::replica::commands::CommandRegistry;
use crate::replica::hand_off::{HandOffError, HandOffSender};
use crate::replica::replica_api::{
    ExecuteCommandInput, GatewayError, HeartbeatInput, HeartbeatOutput, RequestVoteInput, RequestVoteOutput,
};
use crate::replica::shared_state::SharedState;
use std::sync::Arc;
use tokio::time::Duration;
use tokio_util::sync::CancellationToken;

/// Gateway is the replica's externally reachable surface, independent of transport. It
/// validates terms, advances the shared term, and passes leadership input to the driver through
/// the hand-off channels.
pub(crate) struct Gateway {
    logger: slog::Logger,
    shared: Arc<SharedState>,
    membership: Arc<dyn Membership>,
    commands: Arc<CommandRegistry>,
    heartbeats: HandOffSender<ReplicaAddress>,
    election_requests: HandOffSender<ReplicaAddress>,
    hand_off_timeout: Duration,
    shutdown: CancellationToken,
}

pub(crate) struct GatewayConfig {
    pub(crate) logger: slog::Logger,
    pub(crate) shared: Arc<SharedState>,
    pub(crate) membership: Arc<dyn Membership>,
    pub(crate) commands: Arc<CommandRegistry>,
    pub(crate) heartbeats: HandOffSender<ReplicaAddress>,
    pub(crate) election_requests: HandOffSender<ReplicaAddress>,
    pub(crate) hand_off_timeout: Duration,
    pub(crate) shutdown: CancellationToken,
}

impl Gateway {
    pub(crate) fn new(config: GatewayConfig) -> Self {
        Gateway {
            logger: config.logger,
            shared: config.shared,
            membership: config.membership,
            commands: config.commands,
            heartbeats: config.heartbeats,
            election_requests: config.election_requests,
            hand_off_timeout: config.hand_off_timeout,
            shutdown: config.shutdown,
        }
    }

    pub(crate) async fn handle_heartbeat(&self, input: HeartbeatInput) -> Result<HeartbeatOutput, GatewayError> {
        let current_term = self.shared.current_term();
        if input.leader_term < current_term {
            slog::debug!(
                self.logger,
                "Rejecting heartbeat from stale leader {} (term {:?} < {:?})",
                input.leader_address,
                input.leader_term,
                current_term
            );
            return Ok(HeartbeatOutput { ok: false });
        }

        // Term advances even if the driver isn't listening.
        self.shared.observe_term(input.leader_term);

        match self.hand_off(&self.heartbeats, input.leader_address).await {
            Ok(_) => Ok(HeartbeatOutput { ok: true }),
            Err(HandOffError::NotAccepting(_)) => Err(GatewayError::NotAcceptingHeartbeats),
            Err(HandOffError::Closed) => Err(GatewayError::ShuttingDown),
        }
    }

    pub(crate) async fn handle_request_vote(
        &self,
        input: RequestVoteInput,
    ) -> Result<RequestVoteOutput, GatewayError> {
        // Strictly greater: at most one vote per term.
        if !self.shared.store_term_if_increased(input.candidate_term) {
            slog::debug!(
                self.logger,
                "Not granting vote to {}. Term {:?} is not newer than ours.",
                input.candidate_address,
                input.candidate_term
            );
            return Ok(RequestVoteOutput { vote_granted: false });
        }

        match self.hand_off(&self.election_requests, input.candidate_address.clone()).await {
            Ok(_) => {
                slog::info!(
                    self.logger,
                    "Voted for {} in term {:?}",
                    input.candidate_address,
                    input.candidate_term
                );
                Ok(RequestVoteOutput { vote_granted: true })
            }
            Err(HandOffError::NotAccepting(_)) => Err(GatewayError::NotAcceptingElectionRequests),
            Err(HandOffError::Closed) => Err(GatewayError::ShuttingDown),
        }
    }

    /// Runs the named command locally. No term or role gating; only a leader calls this.
    pub(crate) async fn handle_execute_command(&self, input: ExecuteCommandInput) -> Result<(), GatewayError> {
        let command = self
            .commands
            .get(&input.name)
            .ok_or_else(|| GatewayError::UnknownCommand(input.name.clone()))?;

        let replicas = self.membership.replicas().await?;

        let ctx = CommandContext {
            shutdown: self.shutdown.clone(),
            my_address: self.membership.my_address().clone(),
            my_role: self.shared.role(),
            replica_count: replicas.len(),
        };

        let name = input.name;
        command
            .execute(ctx, input.payload)
            .await
            .map_err(|source| GatewayError::CommandFailed { name, source })
    }

    async fn hand_off(
        &self,
        channel: &HandOffSender<ReplicaAddress>,
        address: ReplicaAddress,
    ) -> Result<(), HandOffError> {
        tokio::select! {
            result = channel.offer(address, self.hand_off_timeout) => result,
            _ = self.shutdown.cancelled() => Err(HandOffError::Closed),
        }
    }
}
