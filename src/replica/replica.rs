use crate::api::Command;
use crate::membership::ReplicaAddress;
use crate::replica::broadcast::{CommandBroadcaster, ExecuteCommandError};
use crate::replica::commands::CommandRegistry;
use crate::replica::role::Role;
use crate::replica::role_listener::RoleListener;
use crate::replica::shared_state::SharedState;
use bytes::Bytes;
use std::sync::Arc;

/// LocalReplica is the in-process view of a running replica: what the application can read and
/// ask of it.
pub(crate) struct LocalReplica {
    my_address: ReplicaAddress,
    shared: Arc<SharedState>,
    commands: Arc<CommandRegistry>,
    broadcaster: CommandBroadcaster,
    role_listener: RoleListener,
}

impl LocalReplica {
    pub(crate) fn new(
        my_address: ReplicaAddress,
        shared: Arc<SharedState>,
        commands: Arc<CommandRegistry>,
        broadcaster: CommandBroadcaster,
        role_listener: RoleListener,
    ) -> Self {
        LocalReplica {
            my_address,
            shared,
            commands,
            broadcaster,
            role_listener,
        }
    }

    pub(crate) fn my_address(&self) -> &ReplicaAddress {
        &self.my_address
    }

    pub(crate) fn role(&self) -> Role {
        self.shared.role()
    }

    pub(crate) fn current_term(&self) -> u64 {
        self.shared.current_term().as_u64()
    }

    pub(crate) fn register_command(&self, name: String, command: Arc<dyn Command>) {
        self.commands.register(name, command);
    }

    pub(crate) async fn execute_command(&self, name: &str, payload: Bytes) -> Result<(), ExecuteCommandError> {
        self.broadcaster.execute_command(name, payload).await
    }

    pub(crate) fn role_listener(&self) -> RoleListener {
        self.role_listener.clone()
    }

    #[cfg(test)]
    pub(crate) fn shared(&self) -> Arc<SharedState> {
        self.shared.clone()
    }
}

#[cfg(test)]
mod tests {
    use crate::api::{CommandContext, CommandError};
    use crate::membership::ReplicaAddress;
    use crate::replica::{ExecuteCommandError, Role};
    use crate::test_utils::{wait_for_role, LocalNetwork, TestReplica};
    use bytes::Bytes;
    use std::future::{ready, Ready};
    use std::sync::{Arc, Mutex};

    type Received = Arc<Mutex<Vec<(ReplicaAddress, Role, usize, Bytes)>>>;

    fn record_into(
        received: &Received,
    ) -> impl Fn(CommandContext, Bytes) -> Ready<Result<(), CommandError>> + Send + Sync + 'static {
        let received = received.clone();
        move |ctx: CommandContext, payload: Bytes| {
            received
                .lock()
                .unwrap()
                .push((ctx.my_address, ctx.my_role, ctx.replica_count, payload));
            ready(Ok(()))
        }
    }

    #[tokio::test]
    async fn leader_broadcast_reaches_every_follower() {
        let network = LocalNetwork::new();
        let a = TestReplica::spawn_fast(&network, "a", &["b", "c"]);
        let b = TestReplica::spawn_slow(&network, "b", &["a", "c"]);
        let c = TestReplica::spawn_slow(&network, "c", &["a", "b"]);
        let received: Received = Arc::new(Mutex::new(Vec::new()));
        b.local.register_command("store".into(), Arc::new(record_into(&received)));
        c.local.register_command("store".into(), Arc::new(record_into(&received)));
        wait_for_role(&a.shared, Role::Leader).await;

        a.local
            .execute_command("store", Bytes::from_static(b"hello"))
            .await
            .unwrap();

        let mut received = received.lock().unwrap().clone();
        received.sort_by(|x, y| x.0.cmp(&y.0));
        assert_eq!(
            received,
            vec![
                (ReplicaAddress::new("b"), Role::Follower, 3, Bytes::from_static(b"hello")),
                (ReplicaAddress::new("c"), Role::Follower, 3, Bytes::from_static(b"hello")),
            ]
        );

        network.shutdown();
    }

    #[tokio::test]
    async fn follower_broadcast_is_a_no_op() {
        let network = LocalNetwork::new();
        let a = TestReplica::spawn_fast(&network, "a", &["b"]);
        let b = TestReplica::spawn_slow(&network, "b", &["a"]);
        let received: Received = Arc::new(Mutex::new(Vec::new()));
        a.local.register_command("store".into(), Arc::new(record_into(&received)));
        wait_for_role(&a.shared, Role::Leader).await;

        b.local.execute_command("store", Bytes::from_static(b"x")).await.unwrap();

        assert!(received.lock().unwrap().is_empty());
        network.shutdown();
    }

    #[tokio::test]
    async fn broadcast_of_unregistered_command_fails_on_first_replica() {
        let network = LocalNetwork::new();
        let a = TestReplica::spawn_fast(&network, "a", &["b"]);
        let _b = TestReplica::spawn_slow(&network, "b", &["a"]);
        wait_for_role(&a.shared, Role::Leader).await;

        let result = a.local.execute_command("missing", Bytes::new()).await;

        match result {
            Err(ExecuteCommandError::ReplicaFailed { replica, command, .. }) => {
                assert_eq!(replica, ReplicaAddress::new("b"));
                assert_eq!(command, "missing");
            }
            other => panic!("Unexpected result: {:?}", other),
        }
        network.shutdown();
    }

    #[tokio::test]
    async fn handler_errors_surface_through_the_broadcast() {
        let network = LocalNetwork::new();
        let a = TestReplica::spawn_fast(&network, "a", &["b"]);
        let b = TestReplica::spawn_slow(&network, "b", &["a"]);
        b.local.register_command(
            "fail".into(),
            Arc::new(|_: CommandContext, _: Bytes| async { Err::<(), CommandError>("nope".into()) }),
        );
        wait_for_role(&a.shared, Role::Leader).await;

        let result = a.local.execute_command("fail", Bytes::new()).await;

        assert!(matches!(result, Err(ExecuteCommandError::ReplicaFailed { .. })), "{:?}", result);
        network.shutdown();
    }
}
