//! Per-event signal routing.
//!
//! One [`SignalRouter::handle`] call per lifecycle or message event.
//! The router keeps no state between calls — every connection's picture
//! lives in the registry, so any clone of the router on any process can
//! handle any event. Malformed input is dropped with a diagnostic; the
//! only errors that escape are transient store failures, which the host
//! may retry wholesale (every registry mutation is idempotent).

use bytes::Bytes;
use thiserror::Error;
use tracing::{debug, trace, warn};

use beacon_protocol::{codec, ClientFrame, ServerFrame};
use beacon_store::StoreError;

use crate::broadcast::Broadcaster;
use crate::push::ConnectionId;
use crate::registry::Registry;
use crate::sweeper::Sweeper;
use crate::topic::validate_topic_name;

/// An inbound event from the connection-terminating host.
#[derive(Debug, Clone)]
pub enum SignalEvent {
    /// A socket was accepted.
    Connect(ConnectionId),
    /// A socket closed or errored. May be reported more than once.
    Disconnect(ConnectionId),
    /// One raw text frame arrived on a socket.
    Message(ConnectionId, String),
}

/// Failures that escape an event handler.
///
/// Only transient storage trouble does; protocol garbage is swallowed at
/// the boundary.
#[derive(Debug, Error)]
pub enum EventError {
    /// The registry's store was unavailable or timed out.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// What one event did, for the host's metrics.
#[derive(Debug, Default)]
pub struct EventOutcome {
    /// Targets that received a pushed payload.
    pub delivered: usize,
    /// Targets found dead and handed to the sweeper.
    pub stale: usize,
    /// Pushes that failed for other reasons.
    pub failed: usize,
}

/// Stateless per-event dispatcher.
#[derive(Clone)]
pub struct SignalRouter {
    registry: Registry,
    broadcaster: Broadcaster,
    sweeper: Sweeper,
}

impl SignalRouter {
    /// Assemble a router from its collaborators.
    #[must_use]
    pub fn new(registry: Registry, broadcaster: Broadcaster, sweeper: Sweeper) -> Self {
        Self {
            registry,
            broadcaster,
            sweeper,
        }
    }

    /// Handle one event to completion.
    ///
    /// # Errors
    ///
    /// Returns [`EventError`] only for transient store failures; the
    /// caller may retry the whole event.
    pub async fn handle(&self, event: SignalEvent) -> Result<EventOutcome, EventError> {
        match event {
            SignalEvent::Connect(conn) => {
                // Registry entry is created lazily on first subscribe.
                debug!(conn = %conn, "connected");
                Ok(EventOutcome::default())
            }
            SignalEvent::Disconnect(conn) => {
                self.registry.remove_connection(&conn).await?;
                debug!(conn = %conn, "disconnected");
                Ok(EventOutcome::default())
            }
            SignalEvent::Message(conn, raw) => self.handle_message(&conn, &raw).await,
        }
    }

    async fn handle_message(
        &self,
        conn: &ConnectionId,
        raw: &str,
    ) -> Result<EventOutcome, EventError> {
        let frame = match codec::decode(raw) {
            Ok(frame) => frame,
            Err(e) => {
                debug!(conn = %conn, error = %e, "dropping malformed frame");
                return Ok(EventOutcome::default());
            }
        };
        trace!(conn = %conn, kind = frame.kind(), "frame");

        match frame {
            ClientFrame::Subscribe { topics } => {
                let topics = self.admissible(conn, topics);
                self.registry.subscribe(conn, &topics).await?;
                Ok(EventOutcome::default())
            }
            ClientFrame::Unsubscribe { topics } => {
                let topics = self.admissible(conn, topics);
                self.registry.unsubscribe(conn, &topics).await?;
                Ok(EventOutcome::default())
            }
            ClientFrame::Publish { topic, payload } => {
                if let Err(reason) = validate_topic_name(&topic) {
                    debug!(conn = %conn, reason, "dropping publish to invalid topic");
                    return Ok(EventOutcome::default());
                }
                if payload.is_empty() {
                    debug!(conn = %conn, topic = %topic, "dropping publish with no payload");
                    return Ok(EventOutcome::default());
                }
                self.publish(conn, &topic, raw).await
            }
            ClientFrame::Ping => self.pong(conn).await,
        }
    }

    /// Drop invalid topic names, keeping the rest.
    fn admissible(&self, conn: &ConnectionId, topics: Vec<String>) -> Vec<String> {
        topics
            .into_iter()
            .filter(|name| match validate_topic_name(name) {
                Ok(()) => true,
                Err(reason) => {
                    debug!(conn = %conn, topic = %name, reason, "skipping invalid topic name");
                    false
                }
            })
            .collect()
    }

    /// Relay the publisher's raw frame text, verbatim, to every other
    /// subscriber of the topic.
    async fn publish(
        &self,
        sender: &ConnectionId,
        topic: &str,
        raw: &str,
    ) -> Result<EventOutcome, EventError> {
        let mut targets = self.registry.subscribers(topic).await?;
        targets.remove(sender);

        if targets.is_empty() {
            trace!(conn = %sender, topic = %topic, "publish to empty topic");
            return Ok(EventOutcome::default());
        }

        self.registry.touch_topic(topic).await?;

        let delivery = self
            .broadcaster
            .deliver(targets, Bytes::from(raw.to_owned()))
            .await;

        debug!(
            conn = %sender,
            topic = %topic,
            delivered = delivery.delivered,
            stale = delivery.stale.len(),
            "published"
        );

        if !delivery.stale.is_empty() {
            self.sweeper.reap_from(topic, &delivery.stale).await;
        }

        Ok(EventOutcome {
            delivered: delivery.delivered,
            stale: delivery.stale.len(),
            failed: delivery.failed,
        })
    }

    /// Answer a ping with a pong and refresh the sender's liveness TTL.
    async fn pong(&self, conn: &ConnectionId) -> Result<EventOutcome, EventError> {
        self.registry.touch(conn).await?;

        let pong = match codec::encode(&ServerFrame::Pong) {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "pong encoding failed");
                return Ok(EventOutcome::default());
            }
        };

        let delivery = self
            .broadcaster
            .deliver([conn.clone()], Bytes::from(pong))
            .await;

        if !delivery.stale.is_empty() {
            // The pinging socket vanished mid-event.
            self.sweeper.reap(&delivery.stale).await;
        }

        Ok(EventOutcome {
            delivered: delivery.delivered,
            stale: delivery.stale.len(),
            failed: delivery.failed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::push::{PushError, Pusher};
    use crate::registry::RegistryConfig;
    use async_trait::async_trait;
    use beacon_store::MemoryStore;
    use std::collections::HashSet;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    /// Test pusher: records pushes, reports configured ids as gone.
    #[derive(Default)]
    struct RecordingPusher {
        sent: Mutex<Vec<(ConnectionId, String)>>,
        gone: Mutex<HashSet<ConnectionId>>,
    }

    impl RecordingPusher {
        fn mark_gone(&self, conn: &ConnectionId) {
            self.gone.lock().unwrap().insert(conn.clone());
        }

        fn sent_to(&self, conn: &ConnectionId) -> Vec<String> {
            self.sent
                .lock()
                .unwrap()
                .iter()
                .filter(|(c, _)| c == conn)
                .map(|(_, text)| text.clone())
                .collect()
        }
    }

    #[async_trait]
    impl Pusher for RecordingPusher {
        async fn push(&self, conn: &ConnectionId, payload: Bytes) -> Result<(), PushError> {
            if self.gone.lock().unwrap().contains(conn) {
                return Err(PushError::ConnectionGone);
            }
            let text = String::from_utf8(payload.to_vec()).expect("payloads are text");
            self.sent.lock().unwrap().push((conn.clone(), text));
            Ok(())
        }
    }

    struct Harness {
        router: SignalRouter,
        registry: Registry,
        pusher: Arc<RecordingPusher>,
    }

    fn harness() -> Harness {
        let registry = Registry::new(Arc::new(MemoryStore::new()), RegistryConfig::default());
        let pusher = Arc::new(RecordingPusher::default());
        let broadcaster = Broadcaster::new(pusher.clone(), Duration::from_secs(5));
        let sweeper = Sweeper::new(registry.clone());
        Harness {
            router: SignalRouter::new(registry.clone(), broadcaster, sweeper),
            registry,
            pusher,
        }
    }

    fn conn(name: &str) -> ConnectionId {
        ConnectionId::new(name)
    }

    async fn send(h: &Harness, from: &ConnectionId, raw: &str) -> EventOutcome {
        h.router
            .handle(SignalEvent::Message(from.clone(), raw.to_string()))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_publish_reaches_other_subscribers_once_never_sender() {
        let h = harness();
        let (a, b) = (conn("a"), conn("b"));

        send(&h, &a, r#"{"type":"subscribe","topics":["room1"]}"#).await;
        send(&h, &b, r#"{"type":"subscribe","topics":["room1"]}"#).await;

        let raw = r#"{"type":"publish","topic":"room1","sdp":"v=0..."}"#;
        let outcome = send(&h, &a, raw).await;

        assert_eq!(outcome.delivered, 1);
        // B gets the publisher's exact frame text, exactly once.
        assert_eq!(h.pusher.sent_to(&b), vec![raw.to_string()]);
        // A never hears its own publish.
        assert!(h.pusher.sent_to(&a).is_empty());
    }

    #[tokio::test]
    async fn test_unsubscribe_before_publish_silences_peer() {
        let h = harness();
        let (a, b) = (conn("a"), conn("b"));

        send(&h, &a, r#"{"type":"subscribe","topics":["room1"]}"#).await;
        send(&h, &b, r#"{"type":"subscribe","topics":["room1"]}"#).await;
        send(&h, &a, r#"{"type":"unsubscribe","topics":["room1"]}"#).await;

        send(&h, &b, r#"{"type":"publish","topic":"room1","sdp":"x"}"#).await;

        assert!(h.pusher.sent_to(&a).is_empty());
    }

    #[tokio::test]
    async fn test_stale_target_is_purged_and_others_still_served() {
        let h = harness();
        let (a, b, c) = (conn("a"), conn("b"), conn("c"));

        for peer in [&a, &b, &c] {
            send(&h, peer, r#"{"type":"subscribe","topics":["room1"]}"#).await;
        }

        // A's socket died without a disconnect event.
        h.pusher.mark_gone(&a);

        let outcome = send(&h, &b, r#"{"type":"publish","topic":"room1","sdp":"x"}"#).await;

        assert_eq!(outcome.delivered, 1);
        assert_eq!(outcome.stale, 1);
        assert_eq!(h.pusher.sent_to(&c).len(), 1);

        // Lazy cleanup removed A from the subscriber set.
        let subs = h.registry.subscribers("room1").await.unwrap();
        assert!(!subs.contains(&a));
        assert!(subs.contains(&b) && subs.contains(&c));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_member_pruned_even_after_reverse_mapping_expiry() {
        let h = harness();
        let (a, b) = (conn("a"), conn("b"));

        send(&h, &a, r#"{"type":"subscribe","topics":["room1"]}"#).await;
        send(&h, &b, r#"{"type":"subscribe","topics":["room1"]}"#).await;

        // A's socket dies silently, and its conn entry then outlives the
        // liveness TTL while the topic key stays well within its own.
        h.pusher.mark_gone(&a);
        tokio::time::advance(Duration::from_secs(2 * 3600)).await;

        let outcome = send(&h, &b, r#"{"type":"publish","topic":"room1","sdp":"x"}"#).await;
        assert_eq!(outcome.stale, 1);

        // Lazy cleanup converges even though conn:a no longer lists the
        // topic: A is pruned from room1's subscriber set for good.
        let subs = h.registry.subscribers("room1").await.unwrap();
        assert!(!subs.contains(&a));
        assert!(subs.contains(&b));
    }

    #[tokio::test]
    async fn test_disconnect_tears_down_and_is_idempotent() {
        let h = harness();
        let a = conn("a");

        send(&h, &a, r#"{"type":"subscribe","topics":["room1","room2"]}"#).await;

        h.router
            .handle(SignalEvent::Disconnect(a.clone()))
            .await
            .unwrap();
        assert!(h.registry.subscribers("room1").await.unwrap().is_empty());
        assert!(h.registry.subscribers("room2").await.unwrap().is_empty());

        // Duplicate disconnect is a no-op, not an error.
        h.router.handle(SignalEvent::Disconnect(a)).await.unwrap();
    }

    #[tokio::test]
    async fn test_publish_to_empty_topic_is_a_noop() {
        let h = harness();
        let outcome = send(&h, &conn("a"), r#"{"type":"publish","topic":"void","sdp":"x"}"#).await;

        assert_eq!(outcome.delivered, 0);
        assert!(h.pusher.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_ping_pongs_sender_only_without_registry_mutation() {
        let h = harness();
        let (a, b) = (conn("a"), conn("b"));

        send(&h, &b, r#"{"type":"subscribe","topics":["room1"]}"#).await;
        send(&h, &a, r#"{"type":"ping"}"#).await;

        assert_eq!(h.pusher.sent_to(&a), vec![r#"{"type":"pong"}"#.to_string()]);
        assert!(h.pusher.sent_to(&b).is_empty());
        assert_eq!(h.registry.subscribers("room1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_malformed_and_unknown_frames_are_swallowed() {
        let h = harness();
        let a = conn("a");

        send(&h, &a, "not json at all").await;
        send(&h, &a, r#"{"type":"announce","topics":["x"]}"#).await;
        send(&h, &a, r#"{"type":"publish","topic":"room1"}"#).await; // nothing to relay

        assert!(h.pusher.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_topic_names_are_skipped_not_fatal() {
        let h = harness();
        let a = conn("a");

        send(&h, &a, r#"{"type":"subscribe","topics":["", "ok-room"]}"#).await;

        assert!(h.registry.subscribers("").await.unwrap().is_empty());
        assert_eq!(h.registry.subscribers("ok-room").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_empty_topics_list_is_tolerated() {
        let h = harness();
        send(&h, &conn("a"), r#"{"type":"subscribe","topics":[]}"#).await;
        send(&h, &conn("a"), r#"{"type":"unsubscribe"}"#).await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_subscribes_through_router() {
        let h = harness();
        let n = 32;

        let mut handles = Vec::new();
        for i in 0..n {
            let router = h.router.clone();
            handles.push(tokio::spawn(async move {
                router
                    .handle(SignalEvent::Message(
                        ConnectionId::new(format!("conn-{i}")),
                        r#"{"type":"subscribe","topics":["contended"]}"#.to_string(),
                    ))
                    .await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(h.registry.subscribers("contended").await.unwrap().len(), n);
    }

    #[tokio::test]
    async fn test_ping_from_vanished_socket_triggers_cleanup() {
        let h = harness();
        let a = conn("a");

        send(&h, &a, r#"{"type":"subscribe","topics":["room1"]}"#).await;
        h.pusher.mark_gone(&a);

        let outcome = send(&h, &a, r#"{"type":"ping"}"#).await;

        assert_eq!(outcome.stale, 1);
        assert!(h.registry.subscribers("room1").await.unwrap().is_empty());
    }
}
