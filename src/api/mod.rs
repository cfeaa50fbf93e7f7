mod client;
mod command;
mod options;
mod wiring;

pub use client::Replica;
pub use command::Command;
pub use command::CommandContext;
pub use command::CommandError;
pub use options::ReplicaOptions;
pub use wiring::try_create_replica;
pub use wiring::ReplicaConfig;
pub use wiring::ReplicaCreationError;
