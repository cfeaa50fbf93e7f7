use crate::membership::{Membership, MembershipError, ReplicaAddress};
use crate::replica::peers::{PeerCallError, PeerConnector};
use crate::replica::role::Role;
use crate::replica::shared_state::SharedState;
use bytes::Bytes;
use std::sync::Arc;

/// CommandBroadcaster sends a command to every other replica, one at a time, while this replica
/// is leader.
pub(crate) struct CommandBroadcaster {
    logger: slog::Logger,
    shared: Arc<SharedState>,
    membership: Arc<dyn Membership>,
    peers: Arc<dyn PeerConnector>,
}

#[derive(Debug, thiserror::Error)]
pub enum ExecuteCommandError {
    #[error("Error getting replicas: {0}")]
    Membership(#[from] MembershipError),
    #[error("Leader {leader} failed to execute command {command:?} on replica {replica}: {source}")]
    ReplicaFailed {
        leader: ReplicaAddress,
        replica: ReplicaAddress,
        command: String,
        #[source]
        source: PeerCallError,
    },
}

impl CommandBroadcaster {
    pub(crate) fn new(
        logger: slog::Logger,
        shared: Arc<SharedState>,
        membership: Arc<dyn Membership>,
        peers: Arc<dyn PeerConnector>,
    ) -> Self {
        CommandBroadcaster {
            logger,
            shared,
            membership,
            peers,
        }
    }

    /// Succeeds without doing anything unless this replica is leader. Replicas that already ran
    /// the command before a failure are not rolled back, and the command is not run locally.
    pub(crate) async fn execute_command(&self, name: &str, payload: Bytes) -> Result<(), ExecuteCommandError> {
        if self.shared.role() != Role::Leader {
            slog::debug!(self.logger, "Not leader, skipping broadcast of {:?}", name);
            return Ok(());
        }

        let replicas = self.membership.replicas().await?;
        let me = self.membership.my_address();
        for replica in replicas.peers_of(me) {
            if let Err(source) = self.peers.execute_command(replica, name, payload.clone()).await {
                slog::warn!(self.logger, "Command {:?} failed on {}: {}", name, replica, source);
                return Err(ExecuteCommandError::ReplicaFailed {
                    leader: me.clone(),
                    replica: replica.clone(),
                    command: name.to_string(),
                    source,
                });
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::membership::FixedMembership;
    use crate::replica::shared_state::Term;
    use crate::test_utils::quiet_logger;
    use std::collections::HashSet;
    use std::sync::Mutex;

    /// Records execute calls and fails those addressed to `failing`.
    #[derive(Default)]
    struct RecordingPeers {
        calls: Mutex<Vec<(ReplicaAddress, String, Bytes)>>,
        failing: HashSet<ReplicaAddress>,
    }

    #[async_trait::async_trait]
    impl PeerConnector for RecordingPeers {
        async fn heartbeat(&self, _: &ReplicaAddress, _: Term, _: &ReplicaAddress) -> Result<bool, PeerCallError> {
            unreachable!("Broadcast never sends heartbeats")
        }

        async fn request_vote(&self, _: &ReplicaAddress, _: Term, _: &ReplicaAddress) -> Result<bool, PeerCallError> {
            unreachable!("Broadcast never requests votes")
        }

        async fn execute_command(&self, peer: &ReplicaAddress, name: &str, payload: Bytes) -> Result<(), PeerCallError> {
            self.calls
                .lock()
                .unwrap()
                .push((peer.clone(), name.to_string(), payload));
            if self.failing.contains(peer) {
                return Err(PeerCallError::ConnectFailure {
                    address: peer.clone(),
                    reason: "refused".into(),
                });
            }
            Ok(())
        }
    }

    fn broadcaster(role: Role, peers: Arc<RecordingPeers>) -> CommandBroadcaster {
        let (shared, _listener) = SharedState::new();
        shared.set_role(role);
        let membership = FixedMembership::new("a".into(), vec!["b".into(), "c".into(), "d".into()]);

        CommandBroadcaster::new(quiet_logger(), Arc::new(shared), Arc::new(membership), peers)
    }

    fn called(peers: &RecordingPeers) -> Vec<ReplicaAddress> {
        peers.calls.lock().unwrap().iter().map(|(peer, _, _)| peer.clone()).collect()
    }

    #[tokio::test]
    async fn non_leader_contacts_nobody() {
        for role in vec![Role::Follower, Role::Candidate] {
            let peers = Arc::new(RecordingPeers::default());
            let broadcaster = broadcaster(role, peers.clone());

            broadcaster
                .execute_command("store", Bytes::from_static(b"x"))
                .await
                .unwrap();

            assert!(called(&peers).is_empty());
        }
    }

    #[tokio::test]
    async fn leader_sends_to_every_other_replica() {
        let peers = Arc::new(RecordingPeers::default());
        let broadcaster = broadcaster(Role::Leader, peers.clone());

        broadcaster
            .execute_command("store", Bytes::from_static(b"payload"))
            .await
            .unwrap();

        let calls = peers.calls.lock().unwrap().clone();
        assert_eq!(calls.len(), 3);
        for (peer, name, payload) in calls {
            assert_ne!(peer, ReplicaAddress::new("a"));
            assert_eq!(name, "store");
            assert_eq!(payload, Bytes::from_static(b"payload"));
        }
    }

    #[tokio::test]
    async fn first_failure_aborts_the_broadcast() {
        let mut recording = RecordingPeers::default();
        recording.failing.insert("c".into());
        let peers = Arc::new(recording);
        let broadcaster = broadcaster(Role::Leader, peers.clone());

        let result = broadcaster.execute_command("store", Bytes::new()).await;

        match result {
            Err(ExecuteCommandError::ReplicaFailed {
                leader,
                replica,
                command,
                ..
            }) => {
                assert_eq!(leader, ReplicaAddress::new("a"));
                assert_eq!(replica, ReplicaAddress::new("c"));
                assert_eq!(command, "store");
            }
            other => panic!("Unexpected result: {:?}", other),
        }
        // Replica set iterates in address order: b, then c, and d is never reached.
        assert_eq!(called(&peers), vec![ReplicaAddress::new("b"), ReplicaAddress::new("c")]);
    }
}
