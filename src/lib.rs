mod api;
mod membership;
mod replica;
mod server;
mod shutdown;
#[cfg(test)]
mod test_utils;
mod grpc {
    include!("../generated/replica.rs");
}

pub use api::try_create_replica;
pub use api::Command;
pub use api::CommandContext;
pub use api::CommandError;
pub use api::Replica;
pub use api::ReplicaConfig;
pub use api::ReplicaCreationError;
pub use api::ReplicaOptions;
pub use membership::duration_until_next_interval;
pub use membership::FixedMembership;
pub use membership::InMemoryRegistry;
pub use membership::Membership;
pub use membership::MembershipError;
pub use membership::Registry;
pub use membership::RegistryDirectory;
pub use membership::RegistryDirectoryConfig;
pub use membership::RegistryDirectoryConfigError;
pub use membership::RegistryError;
pub use membership::ReplicaAddress;
pub use membership::ReplicaSet;
pub use replica::ExecuteCommandError;
pub use replica::PeerCallError;
pub use replica::Role;
pub use replica::RoleListener;
pub use shutdown::install_shutdown_handler;
