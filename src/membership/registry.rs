use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tokio::time::{Duration, Instant};

/// Registry is the shared key/value store replicas register themselves in. Keys expire on their
/// own unless refreshed. A production deployment backs this with a networked cache; that client
/// lives outside this crate and only has to implement this trait.
#[async_trait::async_trait]
pub trait Registry: Send + Sync {
    /// Write `key` so that it disappears `ttl` from now unless written again.
    async fn set_with_expiration(&self, key: &str, value: &str, ttl: Duration) -> Result<(), RegistryError>;

    /// All live keys matching `pattern`. A trailing `*` matches any suffix; otherwise the match
    /// is exact.
    async fn keys(&self, pattern: &str) -> Result<Vec<String>, RegistryError>;
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("Registry backend failure: {0}")]
    Backend(String),
}

/// InMemoryRegistry is a process-local `Registry`. Clones share the same storage, so every
/// replica hosted in one process sees the same registrations.
#[derive(Clone, Default)]
pub struct InMemoryRegistry {
    entries: Arc<RwLock<HashMap<String, ExpiringValue>>>,
}

struct ExpiringValue {
    value: String,
    expires_at: Instant,
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every expired entry and return how many went. Writes already do this, so this is
    /// only needed when nothing has been written for a while.
    pub fn purge_expired(&self) -> Result<usize, RegistryError> {
        let mut entries = self.entries.write().map_err(poisoned)?;

        Ok(purge(&mut entries, Instant::now()))
    }

    /// The live value stored under `key`, if any.
    pub fn value(&self, key: &str) -> Result<Option<String>, RegistryError> {
        let now = Instant::now();
        let entries = self.entries.read().map_err(poisoned)?;

        Ok(entries
            .get(key)
            .filter(|v| v.expires_at > now)
            .map(|v| v.value.clone()))
    }

    fn matches(pattern: &str, key: &str) -> bool {
        match pattern.strip_suffix('*') {
            Some(prefix) => key.starts_with(prefix),
            None => key == pattern,
        }
    }
}

#[async_trait::async_trait]
impl Registry for InMemoryRegistry {
    async fn set_with_expiration(&self, key: &str, value: &str, ttl: Duration) -> Result<(), RegistryError> {
        let now = Instant::now();
        let mut entries = self.entries.write().map_err(poisoned)?;
        // Replicas that stopped refreshing are dropped here.
        purge(&mut entries, now);
        entries.insert(
            key.to_string(),
            ExpiringValue {
                value: value.to_string(),
                expires_at: now + ttl,
            },
        );

        Ok(())
    }

    async fn keys(&self, pattern: &str) -> Result<Vec<String>, RegistryError> {
        let now = Instant::now();
        let entries = self.entries.read().map_err(poisoned)?;

        Ok(entries
            .iter()
            .filter(|(key, v)| v.expires_at > now && Self::matches(pattern, key))
            .map(|(key, _)| key.clone())
            .collect())
    }
}

fn purge(entries: &mut HashMap<String, ExpiringValue>, now: Instant) -> usize {
    let before = entries.len();
    entries.retain(|_, v| v.expires_at > now);

    before - entries.len()
}

fn poisoned<T>(_: T) -> RegistryError {
    RegistryError::Backend("registry lock poisoned".to_string())
}
