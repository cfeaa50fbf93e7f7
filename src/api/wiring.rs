use crate::api::client::Replica;
use crate::api::options::ReplicaOptionsValidated;
use crate::membership::Membership;
use crate::replica::{self, ElectionConfig, PeerClient, PeerConnector, ReplicaWiringConfig};
use crate::server::RpcServer;
use crate::ReplicaOptions;
use std::convert::TryFrom;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub struct ReplicaConfig {
    pub info_logger: slog::Logger,
    /// Source of the replica set. Its `my_address()` is what peers use to reach this replica, so
    /// it must route to `listen_address`.
    pub membership: Arc<dyn Membership>,
    pub listen_address: SocketAddr,
    pub options: ReplicaOptions,
    /// Cancelling this stops every background task of the replica.
    pub shutdown: CancellationToken,
}

#[derive(Debug, thiserror::Error)]
pub enum ReplicaCreationError {
    #[error("Illegal options for configuring replica: {0}")]
    IllegalOptions(String),
}

/// Validates options, then starts the membership refresh, the gRPC server and the driver as
/// background tasks. They run until `config.shutdown` is cancelled.
pub async fn try_create_replica(config: ReplicaConfig) -> Result<Replica, ReplicaCreationError> {
    let root_logger = config.info_logger;

    let options = ReplicaOptionsValidated::try_from(config.options)
        .map_err(|e| ReplicaCreationError::IllegalOptions(e.to_string()))?;

    let peer_client: Arc<dyn PeerConnector> = Arc::new(PeerClient::new(
        root_logger.new(slog::o!("Task" => "PeerClient")),
        options.connect_timeout,
        options.call_timeout,
        config.shutdown.clone(),
    ));

    let wired = replica::create_replica(ReplicaWiringConfig {
        logger: root_logger.clone(),
        membership: config.membership.clone(),
        peers: peer_client,
        election: ElectionConfig {
            heartbeat_interval: options.heartbeat_interval,
            election_min_timeout: options.election_min_timeout,
            election_max_timeout: options.election_max_timeout,
            hand_off_timeout: options.hand_off_timeout,
        },
        shutdown: config.shutdown.clone(),
    });

    let membership = config.membership;
    let refresh_shutdown = config.shutdown.clone();
    let refresh_task = tokio::spawn(async move { membership.run_refresh(refresh_shutdown).await });

    let rpc_server = RpcServer::new(root_logger.new(slog::o!("Task" => "RpcServer")), wired.gateway);
    let server_task = tokio::spawn(rpc_server.run(config.listen_address, config.shutdown));

    let driver_task = tokio::spawn(wired.driver.run());

    Ok(Replica::new(
        root_logger,
        wired.local,
        vec![refresh_task, server_task, driver_task],
    ))
}
