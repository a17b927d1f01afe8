//! Liveness reclamation.
//!
//! Teardown events can be lost — abrupt network drops, crashed clients —
//! so dead connections are converged out of the registry two ways: lazily,
//! when a broadcast reports a stale target, and periodically, when the
//! host ticks the expiry sweep. Either path ends in the same state: no
//! subscriber set permanently holds a dead connection.

use tracing::{debug, info, warn};

use crate::push::ConnectionId;
use crate::registry::Registry;
use beacon_store::StoreError;

/// Reclaims registry entries for connections that disappeared without a
/// clean disconnect.
#[derive(Clone)]
pub struct Sweeper {
    registry: Registry,
}

impl Sweeper {
    /// Create a sweeper over the registry.
    #[must_use]
    pub fn new(registry: Registry) -> Self {
        Self { registry }
    }

    /// Lazy cleanup: tear down every connection a broadcast found stale.
    ///
    /// Best-effort; a store failure here is logged and left for the next
    /// delivery failure or the expiry sweep to retry.
    pub async fn reap(&self, stale: &[ConnectionId]) {
        for conn in stale {
            match self.registry.remove_connection(conn).await {
                Ok(()) => debug!(conn = %conn, "reaped stale connection"),
                Err(e) => warn!(conn = %conn, error = %e, "failed to reap stale connection"),
            }
        }
    }

    /// Lazy cleanup for a failed broadcast: prune the stale ids from the
    /// topic whose delivery failed, then run the full teardown. The
    /// direct prune covers connections whose reverse mapping already
    /// expired while publish traffic kept the topic key alive.
    pub async fn reap_from(&self, topic: &str, stale: &[ConnectionId]) {
        let topics = [topic.to_string()];
        for conn in stale {
            if let Err(e) = self.registry.unsubscribe(conn, &topics).await {
                warn!(conn = %conn, topic = %topic, error = %e, "failed to prune stale subscriber");
            }
        }
        self.reap(stale).await;
    }

    /// Expiry sweep: purge entries whose TTL lapsed, returning the count.
    ///
    /// # Errors
    ///
    /// Propagates transient store failures so the scheduler can log them.
    pub async fn sweep(&self) -> Result<usize, StoreError> {
        let evicted = self.registry.evict_expired().await?;
        if evicted > 0 {
            info!(evicted, "expiry sweep purged entries");
        }
        Ok(evicted)
    }
}
