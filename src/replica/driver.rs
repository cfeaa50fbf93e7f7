use crate::membership::{Membership, ReplicaAddress};
use crate::replica::hand_off::HandOffReceiver;
use crate::replica::peers::PeerConnector;
use crate::replica::role::Role;
use crate::replica::shared_state::{SharedState, Term};
use crate::replica::timers::{ElectionTimer, HeartbeatTimer};
use std::sync::Arc;
use tokio::time::Duration;
use tokio_util::sync::CancellationToken;

/// Driver is the replica's single control loop. It owns the timers and is the only writer of
/// the role; the gateway reaches it through the two hand-off channels.
pub(crate) struct Driver {
    logger: slog::Logger,
    my_address: ReplicaAddress,
    shared: Arc<SharedState>,
    membership: Arc<dyn Membership>,
    peers: Arc<dyn PeerConnector>,
    heartbeats: HandOffReceiver<ReplicaAddress>,
    election_requests: HandOffReceiver<ReplicaAddress>,
    election_timer: ElectionTimer,
    heartbeat_timer: HeartbeatTimer,
    believed_leader: Option<ReplicaAddress>,
    shutdown: CancellationToken,
}

pub(crate) struct DriverConfig {
    pub(crate) logger: slog::Logger,
    pub(crate) shared: Arc<SharedState>,
    pub(crate) membership: Arc<dyn Membership>,
    pub(crate) peers: Arc<dyn PeerConnector>,
    pub(crate) heartbeats: HandOffReceiver<ReplicaAddress>,
    pub(crate) election_requests: HandOffReceiver<ReplicaAddress>,
    pub(crate) heartbeat_interval: Duration,
    pub(crate) election_min_timeout: Duration,
    pub(crate) election_max_timeout: Duration,
    pub(crate) shutdown: CancellationToken,
}

impl Driver {
    pub(crate) fn new(config: DriverConfig) -> Self {
        Driver {
            logger: config.logger,
            my_address: config.membership.my_address().clone(),
            shared: config.shared,
            membership: config.membership,
            peers: config.peers,
            heartbeats: config.heartbeats,
            election_requests: config.election_requests,
            election_timer: ElectionTimer::new(config.election_min_timeout, config.election_max_timeout),
            heartbeat_timer: HeartbeatTimer::new(config.heartbeat_interval),
            believed_leader: None,
            shutdown: config.shutdown,
        }
    }

    /// Runs until the shutdown token is cancelled.
    pub(crate) async fn run(mut self) {
        slog::info!(self.logger, "Starting as {} in term {:?}", self.shared.role(), self.shared.current_term());

        while !self.shutdown.is_cancelled() {
            match self.shared.role() {
                Role::Follower => self.follower_step().await,
                Role::Candidate => self.candidate_step().await,
                Role::Leader => self.leader_step().await,
            }
        }

        slog::info!(self.logger, "Driver has exited");
    }

    async fn follower_step(&mut self) {
        tokio::select! {
            Some(candidate) = self.election_requests.accept() => {
                slog::debug!(self.logger, "Accepted election request from {}", candidate);
                self.believed_leader = Some(candidate);
                self.election_timer.reset();
            }
            Some(leader) = self.heartbeats.accept() => {
                if self.believed_leader.as_ref() != Some(&leader) {
                    slog::info!(self.logger, "Following {} in term {:?}", leader, self.shared.current_term());
                }
                self.believed_leader = Some(leader);
                self.election_timer.reset();
            }
            _ = self.election_timer.elapsed() => {
                slog::info!(self.logger, "Election timeout. No word from {:?}", self.believed_leader);
                self.believed_leader = None;
                self.shared.set_role(Role::Candidate);
            }
            _ = self.shutdown.cancelled() => {}
        }
    }

    async fn candidate_step(&mut self) {
        let term = match self.shared.increment_term() {
            Some(term) => term,
            None => {
                slog::error!(
                    self.logger,
                    "Term exhausted at {:?}, not standing for election",
                    self.shared.current_term()
                );
                self.become_follower();
                return;
            }
        };
        slog::info!(self.logger, "Starting election for term {:?}", term);

        let replicas = match self.membership.replicas().await {
            Ok(replicas) => replicas,
            Err(e) => {
                slog::warn!(self.logger, "Can't run election for term {:?}: {}", term, e);
                self.become_follower();
                return;
            }
        };

        let calls: Vec<_> = replicas
            .peers_of(&self.my_address)
            .cloned()
            .map(|peer| {
                tokio::spawn(Self::call_peer_request_vote(
                    self.logger.clone(),
                    self.peers.clone(),
                    peer,
                    term,
                    self.my_address.clone(),
                ))
            })
            .collect();

        // Self vote.
        let votes = 1 + Self::count_granted(&self.logger, calls).await;
        if !has_quorum(votes, replicas.len()) {
            slog::info!(
                self.logger,
                "Lost election for term {:?} with {}/{} votes",
                term,
                votes,
                replicas.len()
            );
            self.become_follower();
            return;
        }

        slog::info!(
            self.logger,
            "Won election for term {:?} with {}/{} votes",
            term,
            votes,
            replicas.len();
            "Term" => term.as_u64()
        );
        self.shared.set_role(Role::Leader);
        self.believed_leader = Some(self.my_address.clone());
        self.heartbeat_timer.fire_now();
    }

    async fn leader_step(&mut self) {
        tokio::select! {
            _ = self.heartbeat_timer.elapsed() => self.heartbeat_round().await,
            _ = self.shutdown.cancelled() => {}
        }
    }

    async fn heartbeat_round(&mut self) {
        let replicas = match self.membership.replicas().await {
            Ok(replicas) => replicas,
            Err(e) => {
                slog::warn!(self.logger, "Stepping down, can't read replica set: {}", e);
                self.become_follower();
                return;
            }
        };

        let term = self.shared.current_term();
        let calls: Vec<_> = replicas
            .peers_of(&self.my_address)
            .cloned()
            .map(|peer| {
                tokio::spawn(Self::call_peer_heartbeat(
                    self.logger.clone(),
                    self.peers.clone(),
                    peer,
                    term,
                    self.my_address.clone(),
                ))
            })
            .collect();

        let acks = 1 + Self::count_granted(&self.logger, calls).await;
        if has_quorum(acks, replicas.len()) {
            self.heartbeat_timer.reschedule();
        } else {
            slog::info!(
                self.logger,
                "Stepping down in term {:?}, only {}/{} replicas acknowledged",
                term,
                acks,
                replicas.len()
            );
            self.become_follower();
        }
    }

    fn become_follower(&mut self) {
        self.shared.set_role(Role::Follower);
        self.believed_leader = None;
        self.election_timer.reset();
    }

    /// Waits for every call, no early exit on quorum.
    async fn count_granted(logger: &slog::Logger, calls: Vec<tokio::task::JoinHandle<bool>>) -> usize {
        let mut granted = 0;
        for call in calls {
            match call.await {
                Ok(true) => granted += 1,
                Ok(false) => {}
                Err(e) => slog::error!(logger, "Peer call task failed: {}", e),
            }
        }

        granted
    }

    async fn call_peer_request_vote(
        logger: slog::Logger,
        peers: Arc<dyn PeerConnector>,
        peer: ReplicaAddress,
        term: Term,
        me: ReplicaAddress,
    ) -> bool {
        match peers.request_vote(&peer, term, &me).await {
            Ok(granted) => granted,
            Err(e) => {
                slog::debug!(logger, "RequestVote to {} failed: {}", peer, e);
                false
            }
        }
    }

    async fn call_peer_heartbeat(
        logger: slog::Logger,
        peers: Arc<dyn PeerConnector>,
        peer: ReplicaAddress,
        term: Term,
        me: ReplicaAddress,
    ) -> bool {
        match peers.heartbeat(&peer, term, &me).await {
            Ok(ok) => ok,
            Err(e) => {
                slog::debug!(logger, "Heartbeat to {} failed: {}", peer, e);
                false
            }
        }
    }
}

/// Strict majority, self included.
fn has_quorum(count: usize, replica_count: usize) -> bool {
    count * 2 > replica_count
}
