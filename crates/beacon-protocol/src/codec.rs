//! Codec for the beacon signaling protocol.
//!
//! One JSON object per WebSocket text frame; no envelope, no length
//! prefix. The codec enforces the frame size cap and structural validity,
//! nothing more — publish payloads stay opaque.

use thiserror::Error;

use crate::frames::{ClientFrame, ServerFrame};

/// Maximum accepted frame size (128 KiB).
///
/// Session descriptions and candidate batches are small; anything near
/// this cap is either abuse or a broken client.
pub const MAX_FRAME_SIZE: usize = 128 * 1024;

/// Protocol errors that can occur during encoding/decoding.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Frame exceeds the maximum size.
    #[error("frame size {0} exceeds maximum {MAX_FRAME_SIZE}")]
    FrameTooLarge(usize),

    /// Frame is not a well-formed object of a known kind.
    #[error("malformed frame: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Decode a client frame from raw text.
///
/// # Errors
///
/// Returns an error if the text is over the size cap, is not valid JSON,
/// or does not match any known frame kind. Callers drop such frames with
/// a diagnostic; decoding failures are never fatal to a connection.
pub fn decode(raw: &str) -> Result<ClientFrame, ProtocolError> {
    if raw.len() > MAX_FRAME_SIZE {
        return Err(ProtocolError::FrameTooLarge(raw.len()));
    }
    Ok(serde_json::from_str(raw)?)
}

/// Encode a relay-originated frame to text.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn encode(frame: &ServerFrame) -> Result<String, ProtocolError> {
    Ok(serde_json::to_string(frame)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_known_kinds() {
        assert!(decode(r#"{"type":"subscribe","topics":["a"]}"#).is_ok());
        assert!(decode(r#"{"type":"unsubscribe","topics":["a"]}"#).is_ok());
        assert!(decode(r#"{"type":"publish","topic":"a","data":1}"#).is_ok());
        assert!(decode(r#"{"type":"ping"}"#).is_ok());
    }

    #[test]
    fn test_decode_rejects_oversized_frame() {
        let padding = "x".repeat(MAX_FRAME_SIZE);
        let raw = format!(r#"{{"type":"publish","topic":"a","blob":"{}"}}"#, padding);

        match decode(&raw) {
            Err(ProtocolError::FrameTooLarge(size)) => assert!(size > MAX_FRAME_SIZE),
            other => panic!("expected FrameTooLarge, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(decode("not json"), Err(ProtocolError::Malformed(_))));
        assert!(matches!(decode("[1,2,3]"), Err(ProtocolError::Malformed(_))));
        assert!(matches!(decode(r#"{"type":42}"#), Err(ProtocolError::Malformed(_))));
    }

    #[test]
    fn test_encode_pong() {
        assert_eq!(encode(&ServerFrame::Pong).unwrap(), r#"{"type":"pong"}"#);
    }
}
