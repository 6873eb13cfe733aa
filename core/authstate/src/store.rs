//! State store trait and startup construction.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

use crate::embedded::EmbeddedStateStore;
use crate::entry::StateEntry;
use crate::external::{ExternalStateStore, RedisCache};
use cirrus_common::{Config, Result};

/// Ephemeral state store correlating the two legs of an authorization
/// handshake.
///
/// Entries live until the fixed TTL elapses; there is no update
/// operation. `find` never fails: genuine absence, expiry and backend
/// trouble all resolve to `None`, and the calling flow restarts.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Stash an entry, stamping its expiry, and return its reference.
    async fn add(&self, entry: StateEntry) -> Result<String>;

    /// Retrieve the entry behind `reference`, if present and unexpired.
    async fn find(&self, reference: &str) -> Option<StateEntry>;
}

/// Build the state store once at process start.
///
/// With no cache configured the embedded in-process backend is used;
/// otherwise entries go through the external TTL cache. The chosen
/// instance is injected into every consumer; there is no hidden global
/// and no runtime backend switching.
pub async fn from_config(config: &Config) -> Result<Arc<dyn StateStore>> {
    match &config.state_cache_url {
        None => {
            info!("using embedded authorization state store");
            Ok(Arc::new(EmbeddedStateStore::new()))
        }
        Some(url) => {
            info!("using external authorization state store");
            let cache = RedisCache::connect(url).await?;
            Ok(Arc::new(ExternalStateStore::new(Arc::new(cache))))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_no_cache_config_selects_embedded() {
        let store = from_config(&Config::default()).await.unwrap();

        let entry = StateEntry::new("alice.example.com", "gdrive", "s3cret");
        let reference = store.add(entry).await.unwrap();
        let found = store.find(&reference).await.unwrap();
        assert_eq!(found.client_state, "s3cret");
    }
}
