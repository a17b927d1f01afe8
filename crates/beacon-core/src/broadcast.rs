//! Fan-out delivery.
//!
//! One payload, many targets, every push independent: a stale or slow
//! target never blocks its siblings, and nothing here ever surfaces a
//! failure to the publisher. Targets whose connection is gone come back
//! in the [`Delivery`] report as the cleanup signal the sweeper consumes.

use bytes::Bytes;
use futures_util::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace, warn};

use crate::push::{ConnectionId, PushError, Pusher};

/// Outcome of one broadcast.
#[derive(Debug, Default)]
pub struct Delivery {
    /// Targets that received the payload.
    pub delivered: usize,
    /// Targets whose connection no longer exists; eligible for reaping.
    pub stale: Vec<ConnectionId>,
    /// Targets that failed for some other reason (logged, not reaped).
    pub failed: usize,
}

/// Concurrent payload fan-out over a [`Pusher`].
#[derive(Clone)]
pub struct Broadcaster {
    pusher: Arc<dyn Pusher>,
    push_timeout: Duration,
}

impl Broadcaster {
    /// Create a broadcaster with a per-target push deadline.
    #[must_use]
    pub fn new(pusher: Arc<dyn Pusher>, push_timeout: Duration) -> Self {
        Self {
            pusher,
            push_timeout,
        }
    }

    /// Push `payload` to every target concurrently.
    ///
    /// Ordering between targets is not guaranteed. An empty target set
    /// returns an empty report.
    pub async fn deliver(
        &self,
        targets: impl IntoIterator<Item = ConnectionId>,
        payload: Bytes,
    ) -> Delivery {
        let pushes = targets.into_iter().map(|target| {
            let payload = payload.clone();
            async move {
                let result =
                    tokio::time::timeout(self.push_timeout, self.pusher.push(&target, payload))
                        .await;
                (target, result)
            }
        });

        let mut delivery = Delivery::default();
        for (target, result) in join_all(pushes).await {
            match result {
                Ok(Ok(())) => {
                    trace!(conn = %target, "delivered");
                    delivery.delivered += 1;
                }
                Ok(Err(PushError::ConnectionGone)) => {
                    debug!(conn = %target, "push target gone");
                    delivery.stale.push(target);
                }
                Ok(Err(PushError::Failed(reason))) => {
                    warn!(conn = %target, reason = %reason, "push failed");
                    delivery.failed += 1;
                }
                Err(_) => {
                    warn!(conn = %target, "push timed out");
                    delivery.failed += 1;
                }
            }
        }
        delivery
    }
}
