use crate::api::Command;
use crate::membership::ReplicaAddress;
use crate::replica::{ExecuteCommandError, LocalReplica, Role, RoleListener};
use bytes::Bytes;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Replica is the application's handle on a running replica.
pub struct Replica {
    logger: slog::Logger,
    local: LocalReplica,
    tasks: Vec<JoinHandle<()>>,
}

impl Replica {
    pub(super) fn new(logger: slog::Logger, local: LocalReplica, tasks: Vec<JoinHandle<()>>) -> Self {
        Replica { logger, local, tasks }
    }

    pub fn my_address(&self) -> &ReplicaAddress {
        self.local.my_address()
    }

    pub fn role(&self) -> Role {
        self.local.role()
    }

    pub fn current_term(&self) -> u64 {
        self.local.current_term()
    }

    /// Makes `command` callable by the leader under `name`. Registering a name twice replaces
    /// the earlier command.
    pub fn register_command<C>(&self, name: impl Into<String>, command: C)
    where
        C: Command + 'static,
    {
        self.local.register_command(name.into(), Arc::new(command));
    }

    /// Runs `name` on every other replica, one after another, if this replica is leader.
    /// Otherwise does nothing and succeeds. Stops at the first replica that fails.
    pub async fn execute_command(&self, name: &str, payload: impl Into<Bytes>) -> Result<(), ExecuteCommandError> {
        self.local.execute_command(name, payload.into()).await
    }

    pub fn role_listener(&self) -> RoleListener {
        self.local.role_listener()
    }

    /// Waits for the background tasks to finish. They only finish once the shutdown token
    /// passed at creation is cancelled.
    pub async fn join(self) {
        for task in self.tasks {
            if let Err(e) = task.await {
                slog::error!(self.logger, "Replica task failed: {}", e);
            }
        }
    }
}
