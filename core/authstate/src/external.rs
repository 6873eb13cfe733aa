//! External state store over a TTL-capable cache service.

use async_trait::async_trait;
use redis::AsyncCommands;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, warn};

use crate::entry::{new_reference, StateEntry, STATE_TTL};
use crate::store::StateStore;
use cirrus_common::{Error, Result};

/// Narrow interface over a shared cache with native key expiry.
///
/// Kept minimal so tests can substitute the cache service.
#[async_trait]
pub trait TtlCache: Send + Sync {
    /// Store a value under `key`, expiring after `ttl`.
    async fn set_with_ttl(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<()>;

    /// Fetch the value under `key`, if present and unexpired.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;
}

/// Redis-backed cache client.
pub struct RedisCache {
    conn: redis::aio::ConnectionManager,
}

impl RedisCache {
    /// Connect to the cache service at `url`.
    ///
    /// # Errors
    /// - Malformed URL (configuration error)
    /// - Connection failure
    pub async fn connect(url: &str) -> Result<Self> {
        let client = redis::Client::open(url)
            .map_err(|e| Error::Configuration(format!("Invalid cache URL: {}", e)))?;
        let conn = client
            .get_connection_manager()
            .await
            .map_err(|e| Error::ExternalSystem(format!("Cache connection failed: {}", e)))?;
        Ok(Self { conn })
    }
}

#[async_trait]
impl TtlCache for RedisCache {
    async fn set_with_ttl(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<()> {
        let mut conn = self.conn.clone();
        conn.set_ex::<_, _, ()>(key, value, ttl.as_secs())
            .await
            .map_err(|e| Error::ExternalSystem(format!("Cache write failed: {}", e)))
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let mut conn = self.conn.clone();
        conn.get(key)
            .await
            .map_err(|e| Error::ExternalSystem(format!("Cache read failed: {}", e)))
    }
}

/// State store delegating to a shared TTL cache.
///
/// Entries are serialized as JSON; the cache's native expiry replaces any
/// in-process bookkeeping, so this backend works across processes.
pub struct ExternalStateStore {
    cache: Arc<dyn TtlCache>,
    ttl: Duration,
}

impl ExternalStateStore {
    /// Create a store over the given cache with the default TTL.
    pub fn new(cache: Arc<dyn TtlCache>) -> Self {
        Self {
            cache,
            ttl: STATE_TTL,
        }
    }
}

#[async_trait]
impl StateStore for ExternalStateStore {
    async fn add(&self, mut entry: StateEntry) -> Result<String> {
        entry.expires_at = chrono::Utc::now()
            + chrono::Duration::from_std(self.ttl).unwrap_or(chrono::Duration::zero());
        let reference = new_reference();

        let payload =
            serde_json::to_vec(&entry).map_err(|e| Error::Serialization(e.to_string()))?;
        self.cache
            .set_with_ttl(&reference, payload, self.ttl)
            .await?;
        Ok(reference)
    }

    async fn find(&self, reference: &str) -> Option<StateEntry> {
        let payload = match self.cache.get(reference).await {
            Ok(Some(payload)) => payload,
            Ok(None) => return None,
            Err(err) => {
                warn!(error = %err, "cache lookup failed, treating state as absent");
                return None;
            }
        };

        match serde_json::from_slice(&payload) {
            Ok(entry) => Some(entry),
            Err(err) => {
                // Fail closed: a corrupt payload is reported as absent,
                // never surfaced to the caller.
                error!(error = %err, "corrupt state entry in cache");
                None
            }
        }
    }
}
