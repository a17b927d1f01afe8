//! The connection gateway.
//!
//! This is the host's side of the push seam: a table of live sockets on
//! this process, each with a bounded outbound queue drained by its writer
//! task. The core never sees sockets; it pushes at connection ids and
//! learns `ConnectionGone` when the id has no entry here. This table is
//! host state, not registry state — a fleet of servers shares the
//! registry while each gateway only knows its own sockets.

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use tokio::sync::mpsc;
use tracing::debug;

use beacon_core::{ConnectionId, PushError, Pusher};

/// Socket table and [`Pusher`] implementation for this process.
pub struct Gateway {
    connections: DashMap<ConnectionId, mpsc::Sender<Bytes>>,
    queue_depth: usize,
}

impl Gateway {
    /// Create an empty gateway with the given per-connection queue depth.
    #[must_use]
    pub fn new(queue_depth: usize) -> Self {
        Self {
            connections: DashMap::new(),
            queue_depth,
        }
    }

    /// Register a connection, returning the receiver its writer task
    /// drains into the socket sink.
    pub fn register(&self, conn: ConnectionId) -> mpsc::Receiver<Bytes> {
        let (tx, rx) = mpsc::channel(self.queue_depth);
        self.connections.insert(conn.clone(), tx);
        debug!(conn = %conn, total = self.connections.len(), "connection registered");
        rx
    }

    /// Drop a connection's entry. Pushes to it fail as gone afterwards.
    pub fn unregister(&self, conn: &ConnectionId) {
        self.connections.remove(conn);
        debug!(conn = %conn, total = self.connections.len(), "connection unregistered");
    }

    /// Number of live connections on this process.
    #[must_use]
    pub fn len(&self) -> usize {
        self.connections.len()
    }

    /// Whether no connections are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}

#[async_trait]
impl Pusher for Gateway {
    async fn push(&self, conn: &ConnectionId, payload: Bytes) -> Result<(), PushError> {
        // Clone the sender out so the map shard isn't held across await.
        let tx = self
            .connections
            .get(conn)
            .map(|entry| entry.value().clone())
            .ok_or(PushError::ConnectionGone)?;

        // A closed queue means the writer task is gone with its socket.
        tx.send(payload).await.map_err(|_| PushError::ConnectionGone)
    }
}
