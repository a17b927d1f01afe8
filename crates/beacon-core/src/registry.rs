//! The topic subscription registry.
//!
//! The only shared state in the system. Both directions of the
//! membership relation are persisted — `topic:<name>` holds subscriber
//! ids, `conn:<id>` holds the topics a connection joined — so teardown
//! never needs a scan. Every mutation is a single-key atomic set
//! operation at the store, never read-modify-write: arbitrarily many
//! event units may touch the same topic at once.

use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use beacon_store::{SetStore, StoreError};
use tracing::debug;

use crate::push::ConnectionId;

/// Registry configuration.
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// TTL on `topic:*` keys; refreshed by subscribe and publish traffic.
    pub topic_ttl: Duration,
    /// TTL on `conn:*` keys; refreshed by subscribe and ping.
    pub connection_ttl: Duration,
    /// Deadline applied to every store call.
    pub op_timeout: Duration,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            topic_ttl: Duration::from_secs(24 * 3600),
            connection_ttl: Duration::from_secs(3600),
            op_timeout: Duration::from_secs(2),
        }
    }
}

/// Durable mapping between topics and subscribed connections.
#[derive(Clone)]
pub struct Registry {
    store: Arc<dyn SetStore>,
    config: RegistryConfig,
}

fn topic_key(topic: &str) -> String {
    format!("topic:{topic}")
}

fn conn_key(conn: &ConnectionId) -> String {
    format!("conn:{conn}")
}

impl Registry {
    /// Create a registry over the given store.
    #[must_use]
    pub fn new(store: Arc<dyn SetStore>, config: RegistryConfig) -> Self {
        Self { store, config }
    }

    /// Bound a store call by the configured op timeout.
    async fn timed<T, F>(&self, fut: F) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, StoreError>>,
    {
        tokio::time::timeout(self.config.op_timeout, fut)
            .await
            .map_err(|_| StoreError::Timeout)?
    }

    /// Add a connection to each named topic, and the topics to the
    /// connection's reverse mapping. Idempotent union.
    ///
    /// # Errors
    ///
    /// Only on store unavailability or timeout; both are transient.
    pub async fn subscribe(
        &self,
        conn: &ConnectionId,
        topics: &[String],
    ) -> Result<(), StoreError> {
        if topics.is_empty() {
            return Ok(());
        }

        let member = vec![conn.as_str().to_string()];
        for topic in topics {
            self.timed(
                self.store
                    .add_members(&topic_key(topic), &member, self.config.topic_ttl),
            )
            .await?;
        }
        self.timed(
            self.store
                .add_members(&conn_key(conn), topics, self.config.connection_ttl),
        )
        .await?;

        debug!(conn = %conn, count = topics.len(), "subscribed");
        Ok(())
    }

    /// Remove a connection from each named topic. Removing a non-member
    /// is a no-op.
    ///
    /// # Errors
    ///
    /// Only on store unavailability or timeout.
    pub async fn unsubscribe(
        &self,
        conn: &ConnectionId,
        topics: &[String],
    ) -> Result<(), StoreError> {
        if topics.is_empty() {
            return Ok(());
        }

        let member = vec![conn.as_str().to_string()];
        for topic in topics {
            self.timed(self.store.remove_members(&topic_key(topic), &member))
                .await?;
        }
        self.timed(self.store.remove_members(&conn_key(conn), topics))
            .await?;

        debug!(conn = %conn, count = topics.len(), "unsubscribed");
        Ok(())
    }

    /// Remove a connection from every topic it joined and drop its
    /// reverse mapping. Safe to call repeatedly.
    ///
    /// # Errors
    ///
    /// Only on store unavailability or timeout.
    pub async fn remove_connection(&self, conn: &ConnectionId) -> Result<(), StoreError> {
        let topics = self.timed(self.store.members(&conn_key(conn))).await?;

        let member = vec![conn.as_str().to_string()];
        for topic in &topics {
            self.timed(self.store.remove_members(&topic_key(topic), &member))
                .await?;
        }
        self.timed(self.store.delete(&conn_key(conn))).await?;

        debug!(conn = %conn, topics = topics.len(), "connection removed");
        Ok(())
    }

    /// Read a topic's subscriber set. Unknown topics yield the empty set.
    ///
    /// # Errors
    ///
    /// Only on store unavailability or timeout.
    pub async fn subscribers(&self, topic: &str) -> Result<HashSet<ConnectionId>, StoreError> {
        let members = self.timed(self.store.members(&topic_key(topic))).await?;
        Ok(members.into_iter().map(ConnectionId::from).collect())
    }

    /// Refresh the liveness TTL of a connection's registry entry.
    /// Touching an unknown connection is a no-op.
    ///
    /// # Errors
    ///
    /// Only on store unavailability or timeout.
    pub async fn touch(&self, conn: &ConnectionId) -> Result<(), StoreError> {
        self.timed(
            self.store
                .touch(&conn_key(conn), self.config.connection_ttl),
        )
        .await
    }

    /// Refresh a topic key's TTL. Publish traffic keeps active topics
    /// alive; touching an unknown topic is a no-op.
    ///
    /// # Errors
    ///
    /// Only on store unavailability or timeout.
    pub async fn touch_topic(&self, topic: &str) -> Result<(), StoreError> {
        self.timed(self.store.touch(&topic_key(topic), self.config.topic_ttl))
            .await
    }

    /// Purge expired entries via the store's maintenance hook, returning
    /// how many were evicted.
    ///
    /// # Errors
    ///
    /// Only on store unavailability or timeout.
    pub async fn evict_expired(&self) -> Result<usize, StoreError> {
        self.timed(self.store.evict_expired()).await
    }
}
