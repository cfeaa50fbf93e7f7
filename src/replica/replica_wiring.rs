use crate::membership::{Membership, ReplicaAddress};
use crate::replica::broadcast::CommandBroadcaster;
use crate::replica::commands::CommandRegistry;
use crate::replica::driver::{Driver, DriverConfig};
use crate::replica::gateway::{Gateway, GatewayConfig};
use crate::replica::hand_off;
use crate::replica::peers::PeerConnector;
use crate::replica::replica::LocalReplica;
use crate::replica::shared_state::SharedState;
use std::sync::Arc;
use tokio::time::Duration;
use tokio_util::sync::CancellationToken;

pub(crate) struct ReplicaWiringConfig {
    pub(crate) logger: slog::Logger,
    pub(crate) membership: Arc<dyn Membership>,
    pub(crate) peers: Arc<dyn PeerConnector>,
    pub(crate) election: ElectionConfig,
    pub(crate) shutdown: CancellationToken,
}

#[derive(Clone, Copy, Debug)]
pub(crate) struct ElectionConfig {
    pub(crate) heartbeat_interval: Duration,
    pub(crate) election_min_timeout: Duration,
    pub(crate) election_max_timeout: Duration,
    pub(crate) hand_off_timeout: Duration,
}

/// The three pieces of a replica. The caller decides how to run the driver and how to expose
/// the gateway.
pub(crate) struct WiredReplica {
    pub(crate) driver: Driver,
    pub(crate) gateway: Arc<Gateway>,
    pub(crate) local: LocalReplica,
}

pub(crate) fn create_replica(config: ReplicaWiringConfig) -> WiredReplica {
    let my_address: ReplicaAddress = config.membership.my_address().clone();
    let logger = config.logger.new(slog::o!("Replica" => my_address.to_string()));

    let (shared, role_listener) = SharedState::new();
    let shared = Arc::new(shared);
    let commands = Arc::new(CommandRegistry::new());
    let (heartbeats_tx, heartbeats_rx) = hand_off::channel();
    let (election_requests_tx, election_requests_rx) = hand_off::channel();

    let gateway = Gateway::new(GatewayConfig {
        logger: logger.new(slog::o!("Task" => "Gateway")),
        shared: shared.clone(),
        membership: config.membership.clone(),
        commands: commands.clone(),
        heartbeats: heartbeats_tx,
        election_requests: election_requests_tx,
        hand_off_timeout: config.election.hand_off_timeout,
        shutdown: config.shutdown.clone(),
    });

    let driver = Driver::new(DriverConfig {
        logger: logger.new(slog::o!("Task" => "Driver")),
        shared: shared.clone(),
        membership: config.membership.clone(),
        peers: config.peers.clone(),
        heartbeats: heartbeats_rx,
        election_requests: election_requests_rx,
        heartbeat_interval: config.election.heartbeat_interval,
        election_min_timeout: config.election.election_min_timeout,
        election_max_timeout: config.election.election_max_timeout,
        shutdown: config.shutdown,
    });

    let broadcaster = CommandBroadcaster::new(
        logger.new(slog::o!("Task" => "Broadcast")),
        shared.clone(),
        config.membership,
        config.peers,
    );

    let local = LocalReplica::new(my_address, shared, commands, broadcaster, role_listener);

    WiredReplica {
        driver,
        gateway: Arc::new(gateway),
        local,
    }
}
