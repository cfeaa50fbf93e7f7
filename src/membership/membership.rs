use crate::membership::address::{ReplicaAddress, ReplicaSet};
use crate::membership::registry::RegistryError;
use tokio::time::Duration;
use tokio_util::sync::CancellationToken;

/// Membership resolves the local replica's identity and the current set of live replicas.
///
/// Callers must treat an `Err` from `replicas()` as "replica set unknown", never as "empty".
#[async_trait::async_trait]
pub trait Membership: Send + Sync {
    /// Constant for the lifetime of the process.
    fn my_address(&self) -> &ReplicaAddress;

    /// The live replica set, always including `my_address()`.
    async fn replicas(&self) -> Result<ReplicaSet, MembershipError>;

    /// Background duty that keeps this replica discoverable. Runs until `shutdown` fires.
    async fn run_refresh(&self, shutdown: CancellationToken) {
        shutdown.cancelled().await;
    }
}

#[derive(Debug, thiserror::Error)]
pub enum MembershipError {
    #[error("Registry unavailable: {0}")]
    RegistryUnavailable(#[from] RegistryError),
    #[error("Registry did not answer within {0:?}")]
    RegistryTimeout(Duration),
}
