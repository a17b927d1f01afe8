//! Storage abstraction for the beacon registry.
//!
//! The registry coordinates arbitrarily many concurrent event handlers
//! through this seam, so every mutation here must be atomic at the key
//! level. Backends must never implement these as read-modify-write.

use async_trait::async_trait;
use std::collections::HashSet;
use std::time::Duration;
use thiserror::Error;

/// Storage errors.
///
/// Both variants are transient: the caller's surrounding infrastructure
/// is expected to retry the whole event, not to treat these as protocol
/// failures.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store could not be reached or refused the operation.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// The operation exceeded its deadline.
    #[error("store operation timed out")]
    Timeout,
}

/// A keyed set store with per-key expiry.
///
/// Keys map to sets of opaque string members. A set ceases to exist when
/// its last member is removed (Redis semantics; the memory backend
/// mirrors this) or when its TTL lapses. Reading an absent key yields the
/// empty set.
#[async_trait]
pub trait SetStore: Send + Sync {
    /// Atomically add members to the set at `key`, creating it if absent,
    /// and (re)arm the key's TTL. Adding an existing member is a no-op.
    async fn add_members(
        &self,
        key: &str,
        members: &[String],
        ttl: Duration,
    ) -> Result<(), StoreError>;

    /// Atomically remove members from the set at `key`. Removing a
    /// non-member, or removing from an absent key, is a no-op.
    async fn remove_members(&self, key: &str, members: &[String]) -> Result<(), StoreError>;

    /// Read the set at `key`. Absent or expired keys yield the empty set.
    async fn members(&self, key: &str) -> Result<HashSet<String>, StoreError>;

    /// Delete the key outright. Deleting an absent key is a no-op.
    async fn delete(&self, key: &str) -> Result<(), StoreError>;

    /// Re-arm the TTL of an existing key. Touching an absent key is a
    /// no-op.
    async fn touch(&self, key: &str, ttl: Duration) -> Result<(), StoreError>;

    /// Purge entries whose TTL has lapsed, returning how many were
    /// removed. Backends with native expiry need not override this.
    async fn evict_expired(&self) -> Result<usize, StoreError> {
        Ok(0)
    }
}
