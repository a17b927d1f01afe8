//! # beacon-protocol
//!
//! Wire protocol definitions for the beacon signaling relay.
//!
//! Signaling clients speak a small JSON protocol: every WebSocket text
//! frame carries one object tagged by a `type` field. Four client frame
//! kinds exist (`subscribe`, `unsubscribe`, `publish`, `ping`); the relay
//! itself only ever originates a `pong`. Everything a `publish` carries
//! beyond its topic is opaque to the relay and re-delivered verbatim.
//!
//! ## Example
//!
//! ```rust
//! use beacon_protocol::{codec, ClientFrame};
//!
//! let frame = codec::decode(r#"{"type":"subscribe","topics":["room-a"]}"#).unwrap();
//! assert!(matches!(frame, ClientFrame::Subscribe { .. }));
//! ```

pub mod codec;
pub mod frames;

pub use codec::{decode, encode, ProtocolError, MAX_FRAME_SIZE};
pub use frames::{ClientFrame, ServerFrame};
