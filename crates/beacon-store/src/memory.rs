//! In-process set store.
//!
//! Backed by a DashMap; each operation touches a single entry under its
//! shard lock, which gives the key-level atomicity the contract demands.
//! Expiry is deadline-based: reads treat lapsed entries as absent, and
//! `evict_expired` drops them for real when the sweeper runs.

use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::HashSet;
use std::time::Duration;
use tokio::time::Instant;
use tracing::trace;

use crate::traits::{SetStore, StoreError};

struct Entry {
    members: HashSet<String>,
    expires_at: Instant,
}

/// In-memory [`SetStore`] backend.
#[derive(Default)]
pub struct MemoryStore {
    sets: DashMap<String, Entry>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live (non-expired) keys.
    #[must_use]
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.sets.iter().filter(|e| e.expires_at > now).count()
    }

    /// Whether the store holds no live keys.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl SetStore for MemoryStore {
    async fn add_members(
        &self,
        key: &str,
        members: &[String],
        ttl: Duration,
    ) -> Result<(), StoreError> {
        if members.is_empty() {
            return Ok(());
        }

        let now = Instant::now();
        let mut entry = self.sets.entry(key.to_string()).or_insert_with(|| Entry {
            members: HashSet::new(),
            expires_at: now + ttl,
        });

        // A lapsed entry is indistinguishable from an absent one.
        if entry.expires_at <= now {
            entry.members.clear();
        }

        entry.members.extend(members.iter().cloned());
        entry.expires_at = now + ttl;

        trace!(key = %key, size = entry.members.len(), "set members added");
        Ok(())
    }

    async fn remove_members(&self, key: &str, members: &[String]) -> Result<(), StoreError> {
        if let Some(mut entry) = self.sets.get_mut(key) {
            for member in members {
                entry.members.remove(member);
            }
            let emptied = entry.members.is_empty();
            drop(entry);

            if emptied {
                self.sets.remove_if(key, |_, e| e.members.is_empty());
                trace!(key = %key, "set emptied and dropped");
            }
        }
        Ok(())
    }

    async fn members(&self, key: &str) -> Result<HashSet<String>, StoreError> {
        let now = Instant::now();
        match self.sets.get(key) {
            Some(entry) if entry.expires_at > now => Ok(entry.members.clone()),
            Some(entry) => {
                drop(entry);
                self.sets.remove_if(key, |_, e| e.expires_at <= now);
                Ok(HashSet::new())
            }
            None => Ok(HashSet::new()),
        }
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.sets.remove(key);
        Ok(())
    }

    async fn touch(&self, key: &str, ttl: Duration) -> Result<(), StoreError> {
        if let Some(mut entry) = self.sets.get_mut(key) {
            entry.expires_at = Instant::now() + ttl;
        }
        Ok(())
    }

    async fn evict_expired(&self) -> Result<usize, StoreError> {
        let now = Instant::now();
        let before = self.sets.len();
        self.sets.retain(|_, entry| entry.expires_at > now);
        Ok(before.saturating_sub(self.sets.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TTL: Duration = Duration::from_secs(60);

    fn ids(names: &[&str]) -> Vec<String> {
        names.iter().map(ToString::to_string).collect()
    }

    #[tokio::test]
    async fn test_add_and_read_members() {
        let store = MemoryStore::new();

        store.add_members("topic:a", &ids(&["c1", "c2"]), TTL).await.unwrap();
        store.add_members("topic:a", &ids(&["c2", "c3"]), TTL).await.unwrap();

        let members = store.members("topic:a").await.unwrap();
        assert_eq!(members.len(), 3);
        assert!(members.contains("c2"));
    }

    #[tokio::test]
    async fn test_unknown_key_reads_empty() {
        let store = MemoryStore::new();
        assert!(store.members("topic:missing").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_remove_is_idempotent_and_drops_empty_sets() {
        let store = MemoryStore::new();
        store.add_members("topic:a", &ids(&["c1"]), TTL).await.unwrap();

        store.remove_members("topic:a", &ids(&["c1"])).await.unwrap();
        assert!(store.is_empty());

        // Removing again, and removing from an absent key, are no-ops.
        store.remove_members("topic:a", &ids(&["c1"])).await.unwrap();
        store.remove_members("topic:b", &ids(&["c1"])).await.unwrap();
    }

    #[tokio::test]
    async fn test_delete() {
        let store = MemoryStore::new();
        store.add_members("conn:c1", &ids(&["room"]), TTL).await.unwrap();

        store.delete("conn:c1").await.unwrap();
        assert!(store.members("conn:c1").await.unwrap().is_empty());

        store.delete("conn:c1").await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_entry_reads_empty() {
        let store = MemoryStore::new();
        store
            .add_members("topic:a", &ids(&["c1"]), Duration::from_secs(1))
            .await
            .unwrap();

        tokio::time::advance(Duration::from_secs(2)).await;

        assert!(store.members("topic:a").await.unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_touch_extends_ttl() {
        let store = MemoryStore::new();
        store
            .add_members("conn:c1", &ids(&["room"]), Duration::from_secs(5))
            .await
            .unwrap();

        tokio::time::advance(Duration::from_secs(4)).await;
        store.touch("conn:c1", Duration::from_secs(5)).await.unwrap();
        tokio::time::advance(Duration::from_secs(4)).await;

        assert_eq!(store.members("conn:c1").await.unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_evict_expired() {
        let store = MemoryStore::new();
        store
            .add_members("topic:old", &ids(&["c1"]), Duration::from_secs(1))
            .await
            .unwrap();
        store
            .add_members("topic:new", &ids(&["c2"]), Duration::from_secs(600))
            .await
            .unwrap();

        tokio::time::advance(Duration::from_secs(2)).await;

        assert_eq!(store.evict_expired().await.unwrap(), 1);
        assert_eq!(store.members("topic:new").await.unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_add_resurrects_lapsed_key_fresh() {
        let store = MemoryStore::new();
        store
            .add_members("topic:a", &ids(&["stale"]), Duration::from_secs(1))
            .await
            .unwrap();

        tokio::time::advance(Duration::from_secs(2)).await;
        store.add_members("topic:a", &ids(&["fresh"]), TTL).await.unwrap();

        let members = store.members("topic:a").await.unwrap();
        assert_eq!(members.len(), 1);
        assert!(members.contains("fresh"));
    }
}
