//! Outbound push seam.
//!
//! The relay never owns sockets. Whatever terminates connections — an
//! in-process WebSocket host, an API gateway, a test double — implements
//! [`Pusher`], and the core only ever asks it to push bytes at a
//! connection id.

use async_trait::async_trait;
use bytes::Bytes;
use std::fmt;
use thiserror::Error;

/// Unique identifier for a live connection.
///
/// Opaque to the core; ids must stay unique across every host process
/// sharing one registry, which is why generation is random rather than
/// timestamp-derived.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConnectionId(pub String);

impl ConnectionId {
    /// Create a connection ID from an existing identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a random connection ID.
    #[must_use]
    pub fn generate() -> Self {
        Self(format!("conn-{}", uuid::Uuid::new_v4()))
    }

    /// Get the ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for ConnectionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ConnectionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Push failures.
#[derive(Debug, Error)]
pub enum PushError {
    /// The target connection no longer exists. This is the cleanup
    /// signal: the broadcaster reports it and the sweeper reaps the id.
    #[error("connection not found")]
    ConnectionGone,

    /// The push could not be completed for some other reason.
    #[error("push failed: {0}")]
    Failed(String),
}

/// Capability to push bytes to a live connection.
#[async_trait]
pub trait Pusher: Send + Sync {
    /// Push a payload to the connection, or report that it is gone.
    async fn push(&self, conn: &ConnectionId, payload: Bytes) -> Result<(), PushError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_id_generation() {
        let id1 = ConnectionId::generate();
        let id2 = ConnectionId::generate();
        assert_ne!(id1, id2);
        assert!(id1.as_str().starts_with("conn-"));
    }

    #[test]
    fn test_connection_id_from_string() {
        let id: ConnectionId = "peer-7".into();
        assert_eq!(id.as_str(), "peer-7");
        assert_eq!(id.to_string(), "peer-7");
    }
}
