use crate::membership::ReplicaAddress;
use crate::replica::Role;
use bytes::Bytes;
use std::error::Error;
use std::future::Future;
use tokio_util::sync::CancellationToken;

pub type CommandError = Box<dyn Error + Send + Sync>;

/// What a command handler knows about the replica it runs on, captured at invocation time.
#[derive(Clone, Debug)]
pub struct CommandContext {
    /// Fires when the process is shutting down. Long running handlers should watch it.
    pub shutdown: CancellationToken,
    pub my_address: ReplicaAddress,
    pub my_role: Role,
    /// Size of the live replica set, self included.
    pub replica_count: usize,
}

/// Command is a named action the leader can ask every replica to run.
///
/// Any `Fn(CommandContext, Bytes) -> impl Future<Output = Result<(), CommandError>>` is a Command.
#[async_trait::async_trait]
pub trait Command: Send + Sync {
    async fn execute(&self, ctx: CommandContext, payload: Bytes) -> Result<(), CommandError>;
}

#[async_trait::async_trait]
impl<F, Fut> Command for F
where
    F: Fn(CommandContext, Bytes) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), CommandError>> + Send + 'static,
{
    async fn execute(&self, ctx: CommandContext, payload: Bytes) -> Result<(), CommandError> {
        (self)(ctx, payload).await
    }
}
