//! Redis set store.
//!
//! One multiplexed async connection per client; keys are namespaced under
//! a configurable prefix. `SADD`/`SREM` give the required key-level
//! atomicity natively, sets vanish with their last member, and expiry is
//! handled by Redis itself, so the eviction hook stays a no-op.

use async_trait::async_trait;
use redis::{aio::MultiplexedConnection, AsyncCommands, Client};
use std::collections::HashSet;
use std::time::Duration;
use tracing::debug;

use crate::traits::{SetStore, StoreError};

/// Redis-backed [`SetStore`].
pub struct RedisStore {
    client: Client,
    prefix: String,
}

impl RedisStore {
    /// Create a store from a Redis URL and key namespace prefix.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL cannot be parsed. No connection is
    /// made until the first operation.
    pub fn new(url: &str, prefix: impl Into<String>) -> Result<Self, StoreError> {
        let client = Client::open(url)
            .map_err(|e| StoreError::Unavailable(format!("redis open failed: {e}")))?;
        let prefix = prefix.into();
        debug!(prefix = %prefix, "redis store created");
        Ok(Self { client, prefix })
    }

    fn key(&self, key: &str) -> String {
        format!("{}:{}", self.prefix, key)
    }

    async fn conn(&self) -> Result<MultiplexedConnection, StoreError> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| StoreError::Unavailable(format!("redis connect failed: {e}")))
    }
}

fn store_err(e: redis::RedisError) -> StoreError {
    StoreError::Unavailable(e.to_string())
}

#[async_trait]
impl SetStore for RedisStore {
    async fn add_members(
        &self,
        key: &str,
        members: &[String],
        ttl: Duration,
    ) -> Result<(), StoreError> {
        if members.is_empty() {
            return Ok(());
        }
        let mut conn = self.conn().await?;
        let key = self.key(key);

        conn.sadd::<_, _, ()>(&key, members).await.map_err(store_err)?;
        conn.expire::<_, ()>(&key, ttl.as_secs() as i64)
            .await
            .map_err(store_err)?;
        Ok(())
    }

    async fn remove_members(&self, key: &str, members: &[String]) -> Result<(), StoreError> {
        if members.is_empty() {
            return Ok(());
        }
        let mut conn = self.conn().await?;

        conn.srem::<_, _, ()>(self.key(key), members)
            .await
            .map_err(store_err)?;
        Ok(())
    }

    async fn members(&self, key: &str) -> Result<HashSet<String>, StoreError> {
        let mut conn = self.conn().await?;

        conn.smembers::<_, HashSet<String>>(self.key(key))
            .await
            .map_err(store_err)
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let mut conn = self.conn().await?;

        conn.del::<_, ()>(self.key(key)).await.map_err(store_err)?;
        Ok(())
    }

    async fn touch(&self, key: &str, ttl: Duration) -> Result<(), StoreError> {
        let mut conn = self.conn().await?;

        conn.expire::<_, ()>(self.key(key), ttl.as_secs() as i64)
            .await
            .map_err(store_err)?;
        Ok(())
    }

    // evict_expired: default no-op; Redis expires keys natively.
}
