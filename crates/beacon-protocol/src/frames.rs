//! Frame types for the beacon signaling protocol.
//!
//! Frames are JSON objects tagged by a `type` field, one object per
//! WebSocket text frame. The schema follows the y-webrtc rendezvous
//! convention: membership frames carry a `topics` list, publishes carry a
//! single `topic` plus arbitrary payload fields the relay never interprets.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A frame sent by a signaling client.
///
/// Unknown `type` values fail deserialization and are dropped at the
/// boundary; extra fields on membership and ping frames are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientFrame {
    /// Join the given topics. Absent or empty lists are tolerated.
    #[serde(rename = "subscribe")]
    Subscribe {
        /// Topic names to join.
        #[serde(default)]
        topics: Vec<String>,
    },

    /// Leave the given topics.
    #[serde(rename = "unsubscribe")]
    Unsubscribe {
        /// Topic names to leave.
        #[serde(default)]
        topics: Vec<String>,
    },

    /// Relay a payload to every other subscriber of a topic.
    #[serde(rename = "publish")]
    Publish {
        /// Target topic.
        topic: String,
        /// Opaque payload fields (SDP offers/answers, ICE candidates, ...).
        /// The relay forwards the original frame text, so these survive
        /// byte-for-byte; this map exists for boundary validation only.
        #[serde(flatten)]
        payload: Map<String, Value>,
    },

    /// Keepalive probe; answered with a pong.
    #[serde(rename = "ping")]
    Ping,
}

impl ClientFrame {
    /// Short name of the frame kind, for logs and metric labels.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            ClientFrame::Subscribe { .. } => "subscribe",
            ClientFrame::Unsubscribe { .. } => "unsubscribe",
            ClientFrame::Publish { .. } => "publish",
            ClientFrame::Ping => "ping",
        }
    }

    /// Create a new Subscribe frame.
    #[must_use]
    pub fn subscribe(topics: impl IntoIterator<Item = impl Into<String>>) -> Self {
        ClientFrame::Subscribe {
            topics: topics.into_iter().map(Into::into).collect(),
        }
    }

    /// Create a new Unsubscribe frame.
    #[must_use]
    pub fn unsubscribe(topics: impl IntoIterator<Item = impl Into<String>>) -> Self {
        ClientFrame::Unsubscribe {
            topics: topics.into_iter().map(Into::into).collect(),
        }
    }

    /// Create a new Publish frame.
    #[must_use]
    pub fn publish(topic: impl Into<String>, payload: Map<String, Value>) -> Self {
        ClientFrame::Publish {
            topic: topic.into(),
            payload,
        }
    }

    /// Create a new Ping frame.
    #[must_use]
    pub fn ping() -> Self {
        ClientFrame::Ping
    }
}

/// A frame originated by the relay.
///
/// Forwarded publishes are not modeled here: the relay re-sends the
/// publisher's raw frame text instead of re-encoding it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerFrame {
    /// Reply to a ping.
    #[serde(rename = "pong")]
    Pong,
}
