//! Embedded in-process state store.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;
use std::time::Duration;

use crate::entry::{new_reference, StateEntry, STATE_TTL};
use crate::store::StateStore;
use cirrus_common::Result;

/// In-process state store backed by a synchronized map.
///
/// Expired entries are evicted lazily, on lookup only; an abandoned flow's
/// entry stays in memory until it is looked up after expiry or the process
/// restarts. That unbounded-growth trade-off is deliberate and accepted
/// for the entry volumes this store sees.
pub struct EmbeddedStateStore {
    entries: RwLock<HashMap<String, StateEntry>>,
    ttl: Duration,
}

impl EmbeddedStateStore {
    /// Create a store with the default TTL.
    pub fn new() -> Self {
        Self::with_ttl(STATE_TTL)
    }

    /// Create a store with a custom TTL.
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    /// Number of live-or-stale entries currently held.
    pub fn len(&self) -> usize {
        self.entries.read().unwrap().len()
    }

    /// Whether the store holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for EmbeddedStateStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StateStore for EmbeddedStateStore {
    async fn add(&self, mut entry: StateEntry) -> Result<String> {
        entry.expires_at = chrono::Utc::now()
            + chrono::Duration::from_std(self.ttl).unwrap_or(chrono::Duration::zero());
        let reference = new_reference();
        self.entries
            .write()
            .unwrap()
            .insert(reference.clone(), entry);
        Ok(reference)
    }

    async fn find(&self, reference: &str) -> Option<StateEntry> {
        {
            let entries = self.entries.read().unwrap();
            match entries.get(reference) {
                None => return None,
                Some(entry) if !entry.is_expired() => return Some(entry.clone()),
                Some(_) => {}
            }
        }

        // Expired: evict as a side effect of the lookup.
        self.entries.write().unwrap().remove(reference);
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_add_find_roundtrip() {
        let store = EmbeddedStateStore::new();
        let entry = StateEntry::new("alice.example.com", "gdrive", "s3cret");

        let reference = store.add(entry.clone()).await.unwrap();
        let found = store.find(&reference).await.unwrap();

        assert_eq!(found.tenant_domain, entry.tenant_domain);
        assert_eq!(found.account_type, entry.account_type);
        assert_eq!(found.client_state, entry.client_state);
        // Expiry is stamped by the store, overriding the caller's value.
        assert!(found.expires_at > entry.expires_at);
        assert!(!found.is_expired());
    }

    #[tokio::test]
    async fn test_find_unknown_reference() {
        let store = EmbeddedStateStore::new();
        assert!(store.find("nothing-here").await.is_none());
    }

    #[tokio::test]
    async fn test_expired_entry_is_absent_and_evicted() {
        let store = EmbeddedStateStore::with_ttl(Duration::from_millis(5));
        let reference = store
            .add(StateEntry::new("alice.example.com", "gdrive", "s3cret"))
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(20)).await;

        assert!(store.find(&reference).await.is_none());
        // The lookup evicted the stale entry.
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_abandoned_entries_linger_until_looked_up() {
        let store = EmbeddedStateStore::with_ttl(Duration::from_millis(5));
        store
            .add(StateEntry::new("alice.example.com", "gdrive", "s3cret"))
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(20)).await;

        // No proactive sweep.
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_add_and_find() {
        let store = Arc::new(EmbeddedStateStore::new());
        let mut tasks = Vec::new();

        for worker in 0..16 {
            let store = store.clone();
            tasks.push(tokio::spawn(async move {
                for i in 0..250 {
                    let state = format!("w{}-i{}", worker, i);
                    let entry = StateEntry::new("alice.example.com", "gdrive", state.clone());
                    let reference = store.add(entry).await.unwrap();
                    let found = store.find(&reference).await.expect("entry must be found");
                    // Never a partially written entry.
                    assert_eq!(found.client_state, state);
                    assert_eq!(found.tenant_domain, "alice.example.com");
                }
            }));
        }

        for task in tasks {
            task.await.unwrap();
        }

        assert_eq!(store.len(), 16 * 250);
    }
}
