use crate::membership::{FixedMembership, ReplicaAddress};
use crate::replica::{
    self, ElectionConfig, ExecuteCommandInput, Gateway, HeartbeatInput, LocalReplica, PeerCallError, PeerConnector,
    ReplicaWiringConfig, RequestVoteInput, Role, SharedState, Term,
};
use crate::server::gateway_error_to_status;
use bytes::Bytes;
use slog::KV;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;
use tokio::time::Duration;
use tokio_util::sync::CancellationToken;

pub(crate) fn quiet_logger() -> slog::Logger {
    slog::Logger::root(slog::Discard, slog::o!())
}

/// LocalNetwork routes peer calls straight into other replicas' gateways, skipping gRPC.
/// Unknown or crashed addresses fail like a refused connection.
#[derive(Clone, Default)]
pub(crate) struct LocalNetwork {
    inner: Arc<Mutex<NetworkState>>,
    shutdown: CancellationToken,
}

#[derive(Default)]
struct NetworkState {
    gateways: HashMap<ReplicaAddress, (Arc<Gateway>, CancellationToken)>,
    crashed: HashSet<ReplicaAddress>,
}

impl LocalNetwork {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn join(&self, address: ReplicaAddress, gateway: Arc<Gateway>, shutdown: CancellationToken) {
        self.inner
            .lock()
            .unwrap()
            .gateways
            .insert(address, (gateway, shutdown));
    }

    /// Stops the replica at `address` and makes it unreachable.
    pub(crate) fn crash(&self, address: &ReplicaAddress) {
        let mut state = self.inner.lock().unwrap();
        state.crashed.insert(address.clone());
        if let Some((_, shutdown)) = state.gateways.get(address) {
            shutdown.cancel();
        }
    }

    pub(crate) fn shutdown(&self) {
        self.shutdown.cancel();
    }

    fn gateway(&self, address: &ReplicaAddress) -> Result<Arc<Gateway>, PeerCallError> {
        let state = self.inner.lock().unwrap();
        match state.gateways.get(address) {
            Some((gateway, _)) if !state.crashed.contains(address) => Ok(gateway.clone()),
            _ => Err(PeerCallError::ConnectFailure {
                address: address.clone(),
                reason: "connection refused".into(),
            }),
        }
    }

    fn rpc_failure(address: &ReplicaAddress, err: replica::GatewayError) -> PeerCallError {
        PeerCallError::Rpc {
            address: address.clone(),
            status: gateway_error_to_status(err),
        }
    }
}

#[async_trait::async_trait]
impl PeerConnector for LocalNetwork {
    async fn heartbeat(
        &self,
        peer: &ReplicaAddress,
        term: Term,
        leader: &ReplicaAddress,
    ) -> Result<bool, PeerCallError> {
        let gateway = self.gateway(peer)?;
        gateway
            .handle_heartbeat(HeartbeatInput {
                leader_term: term,
                leader_address: leader.clone(),
            })
            .await
            .map(|output| output.ok)
            .map_err(|e| Self::rpc_failure(peer, e))
    }

    async fn request_vote(
        &self,
        peer: &ReplicaAddress,
        term: Term,
        candidate: &ReplicaAddress,
    ) -> Result<bool, PeerCallError> {
        let gateway = self.gateway(peer)?;
        gateway
            .handle_request_vote(RequestVoteInput {
                candidate_term: term,
                candidate_address: candidate.clone(),
            })
            .await
            .map(|output| output.vote_granted)
            .map_err(|e| Self::rpc_failure(peer, e))
    }

    async fn execute_command(&self, peer: &ReplicaAddress, name: &str, payload: Bytes) -> Result<(), PeerCallError> {
        let gateway = self.gateway(peer)?;
        gateway
            .handle_execute_command(ExecuteCommandInput {
                name: name.to_string(),
                payload,
            })
            .await
            .map_err(|e| Self::rpc_failure(peer, e))
    }
}

/// A replica running its driver on the local network.
pub(crate) struct TestReplica {
    pub(crate) shared: Arc<SharedState>,
    pub(crate) local: LocalReplica,
    pub(crate) task: JoinHandle<()>,
}

impl TestReplica {
    pub(crate) const HEARTBEAT_INTERVAL: Duration = Duration::from_millis(20);

    /// Times out long before any `spawn_slow` replica does.
    pub(crate) fn spawn_fast(network: &LocalNetwork, me: &str, others: &[&str]) -> Self {
        Self::spawn(
            network,
            me,
            others,
            Duration::from_millis(50),
            Duration::from_millis(60),
            quiet_logger(),
        )
    }

    pub(crate) fn spawn_slow(network: &LocalNetwork, me: &str, others: &[&str]) -> Self {
        Self::spawn(
            network,
            me,
            others,
            Duration::from_secs(2),
            Duration::from_secs(3),
            quiet_logger(),
        )
    }

    pub(crate) fn spawn(
        network: &LocalNetwork,
        me: &str,
        others: &[&str],
        election_min_timeout: Duration,
        election_max_timeout: Duration,
        logger: slog::Logger,
    ) -> Self {
        let membership = FixedMembership::new(me.into(), others.iter().map(|&other| ReplicaAddress::new(other)));
        let shutdown = network.shutdown.child_token();

        let wired = replica::create_replica(ReplicaWiringConfig {
            logger,
            membership: Arc::new(membership),
            peers: Arc::new(network.clone()),
            election: ElectionConfig {
                heartbeat_interval: Self::HEARTBEAT_INTERVAL,
                election_min_timeout,
                election_max_timeout,
                hand_off_timeout: Duration::from_millis(10),
            },
            shutdown: shutdown.clone(),
        });

        network.join(me.into(), wired.gateway, shutdown);
        let task = tokio::spawn(wired.driver.run());

        TestReplica {
            shared: wired.local.shared(),
            local: wired.local,
            task,
        }
    }
}

/// ElectionWins collects `(replica, term)` for every election won, read from the `Term` field
/// the driver logs when it wins.
#[derive(Clone, Default)]
pub(crate) struct ElectionWins {
    wins: Arc<Mutex<Vec<(String, u64)>>>,
}

impl ElectionWins {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn logger(&self, replica: &str) -> slog::Logger {
        let drain = WinRecorder {
            replica: replica.to_string(),
            wins: self.wins.clone(),
        };
        slog::Logger::root(drain, slog::o!())
    }

    pub(crate) fn recorded(&self) -> Vec<(String, u64)> {
        self.wins.lock().unwrap().clone()
    }
}

struct WinRecorder {
    replica: String,
    wins: Arc<Mutex<Vec<(String, u64)>>>,
}

impl slog::Drain for WinRecorder {
    type Ok = ();
    type Err = slog::Never;

    fn log(&self, record: &slog::Record, _: &slog::OwnedKVList) -> Result<(), slog::Never> {
        let mut finder = TermFinder(None);
        if record.kv().serialize(record, &mut finder).is_ok() {
            if let Some(term) = finder.0 {
                self.wins.lock().unwrap().push((self.replica.clone(), term));
            }
        }
        Ok(())
    }
}

struct TermFinder(Option<u64>);

impl slog::Serializer for TermFinder {
    fn emit_arguments(&mut self, key: slog::Key, val: &fmt::Arguments) -> slog::Result {
        if key == "Term" {
            self.0 = val.to_string().parse().ok();
        }
        Ok(())
    }
}

pub(crate) async fn wait_for_role(shared: &SharedState, role: Role) {
    wait_until(|| shared.role() == role, format!("role {}", role)).await;
}

pub(crate) async fn wait_for_term(shared: &SharedState, term: Term) {
    wait_until(|| shared.current_term() >= term, format!("term {:?}", term)).await;
}

async fn wait_until<F: Fn() -> bool>(condition: F, what: String) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while !condition() {
        if tokio::time::Instant::now() > deadline {
            panic!("Timed out waiting for {}", what);
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}
