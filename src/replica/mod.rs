mod broadcast;
mod commands;
mod driver;
mod gateway;
mod hand_off;
mod peer_client;
mod peers;
mod replica;
mod replica_api;
mod replica_wiring;
mod role;
mod role_listener;
mod shared_state;
mod timers;

pub use broadcast::ExecuteCommandError;
pub use peers::PeerCallError;
pub use role::Role;
pub use role_listener::RoleListener;

pub(crate) use gateway::Gateway;
pub(crate) use peer_client::PeerClient;
pub(crate) use peers::PeerConnector;
pub(crate) use replica::LocalReplica;
pub(crate) use replica_api::{ExecuteCommandInput, GatewayError, HeartbeatInput, RequestVoteInput};
pub(crate) use replica_wiring::{create_replica, ElectionConfig, ReplicaWiringConfig};
#[cfg(test)]
pub(crate) use shared_state::SharedState;
pub(crate) use shared_state::Term;
