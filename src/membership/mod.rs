//! This mod is responsible for answering "who am I" and "who else is alive right now".
mod address;
mod directory;
mod fixed;
mod membership;
mod registry;

pub use address::ReplicaAddress;
pub use address::ReplicaSet;
pub use directory::duration_until_next_interval;
pub use directory::RegistryDirectory;
pub use directory::RegistryDirectoryConfig;
pub use directory::RegistryDirectoryConfigError;
pub use fixed::FixedMembership;
pub use membership::Membership;
pub use membership::MembershipError;
pub use registry::InMemoryRegistry;
pub use registry::Registry;
pub use registry::RegistryError;
