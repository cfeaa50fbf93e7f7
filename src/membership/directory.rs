use crate::membership::address::{ReplicaAddress, ReplicaSet};
use crate::membership::membership::{Membership, MembershipError};
use crate::membership::registry::Registry;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::time::Duration;
use tokio_util::sync::CancellationToken;

const KEY_PREFIX: &str = "REGISTER";
const KEY_SEPARATOR: &str = "_";
const REGISTRATION_MARKER: &str = "SET";

pub struct RegistryDirectoryConfig {
    pub service_name: String,
    pub my_address: String,
    pub refresh_interval: Option<Duration>,
    pub registration_ttl: Option<Duration>,
    pub registry_timeout: Option<Duration>,
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryDirectoryConfigError {
    #[error("Service name must not be empty")]
    EmptyServiceName,
    #[error("My address must not be empty")]
    EmptyAddress,
    #[error("Registration TTL ({ttl:?}) must be longer than the refresh interval ({refresh:?})")]
    TtlTooShort { ttl: Duration, refresh: Duration },
    #[error("Refresh interval must be non-zero")]
    ZeroRefreshInterval,
}

/// RegistryDirectory discovers replicas through a shared `Registry`. Each replica owns one key,
/// `REGISTER_<service>_<address>`, which it rewrites on every wall-clock aligned refresh tick
/// with a TTL that outlives a single missed tick.
pub struct RegistryDirectory {
    logger: slog::Logger,
    registry: Arc<dyn Registry>,
    service_name: String,
    my_address: ReplicaAddress,
    refresh_interval: Duration,
    registration_ttl: Duration,
    registry_timeout: Duration,
}

impl RegistryDirectory {
    pub fn new(
        logger: slog::Logger,
        config: RegistryDirectoryConfig,
        registry: Arc<dyn Registry>,
    ) -> Result<Self, RegistryDirectoryConfigError> {
        if config.service_name.is_empty() {
            return Err(RegistryDirectoryConfigError::EmptyServiceName);
        }
        if config.my_address.is_empty() {
            return Err(RegistryDirectoryConfigError::EmptyAddress);
        }

        let refresh_interval = config.refresh_interval.unwrap_or(Duration::from_secs(60));
        let registration_ttl = config.registration_ttl.unwrap_or(refresh_interval * 2);
        if refresh_interval == Duration::from_secs(0) {
            return Err(RegistryDirectoryConfigError::ZeroRefreshInterval);
        }
        if registration_ttl <= refresh_interval {
            return Err(RegistryDirectoryConfigError::TtlTooShort {
                ttl: registration_ttl,
                refresh: refresh_interval,
            });
        }

        let logger = logger.new(slog::o!("Service" => config.service_name.clone()));

        Ok(RegistryDirectory {
            logger,
            registry,
            service_name: config.service_name,
            my_address: ReplicaAddress::new(config.my_address),
            refresh_interval,
            registration_ttl,
            registry_timeout: config.registry_timeout.unwrap_or(Duration::from_secs(5)),
        })
    }

    fn make_key(&self, address: &str) -> String {
        [KEY_PREFIX, self.service_name.as_str(), address].join(KEY_SEPARATOR)
    }

    async fn self_register(&self) -> Result<(), MembershipError> {
        let key = self.make_key(self.my_address.as_str());
        let write = self
            .registry
            .set_with_expiration(&key, REGISTRATION_MARKER, self.registration_ttl);

        match tokio::time::timeout(self.registry_timeout, write).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(MembershipError::RegistryTimeout(self.registry_timeout)),
        }
    }
}

#[async_trait::async_trait]
impl Membership for RegistryDirectory {
    fn my_address(&self) -> &ReplicaAddress {
        &self.my_address
    }

    async fn replicas(&self) -> Result<ReplicaSet, MembershipError> {
        let pattern = self.make_key("*");
        let scan = self.registry.keys(&pattern);
        let keys = match tokio::time::timeout(self.registry_timeout, scan).await {
            Ok(result) => result?,
            Err(_) => return Err(MembershipError::RegistryTimeout(self.registry_timeout)),
        };

        let prefix = self.make_key("");
        let mut replicas: ReplicaSet = keys
            .iter()
            .filter_map(|key| key.strip_prefix(prefix.as_str()))
            .filter(|address| !address.is_empty())
            .map(ReplicaAddress::from)
            .collect();

        // Our own registration may not have landed yet.
        replicas.insert(self.my_address.clone());

        Ok(replicas)
    }

    async fn run_refresh(&self, shutdown: CancellationToken) {
        slog::info!(
            self.logger,
            "Registering {} every {:?} (ttl {:?})",
            self.my_address,
            self.refresh_interval,
            self.registration_ttl
        );

        // First registration happens immediately, the rest are aligned to interval boundaries.
        let mut delay = Duration::from_secs(0);
        loop {
            tokio::select! {
                _ = tokio::time::sleep(delay) => {
                    if let Err(e) = self.self_register().await {
                        slog::error!(self.logger, "Failed to register replica: {}", e);
                    }
                    delay = duration_until_next_interval(Utc::now(), self.refresh_interval);
                }
                _ = shutdown.cancelled() => {
                    slog::info!(self.logger, "Registration refresh stopped");
                    return;
                }
            }
        }
    }
}

/// Time from `now` until the next wall-clock multiple of `interval`, measured from the unix
/// epoch. If `now` sits exactly on a boundary, the following boundary is returned.
pub fn duration_until_next_interval(now: DateTime<Utc>, interval: Duration) -> Duration {
    let interval_ms = interval.as_millis().max(1) as i64;
    let elapsed_in_interval = now.timestamp_millis().rem_euclid(interval_ms);

    Duration::from_millis((interval_ms - elapsed_in_interval) as u64)
}
