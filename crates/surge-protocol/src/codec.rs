//! Codec for encoding and decoding protocol frames.
//!
//! The Pusher channel protocol uses JSON text frames, so the codec is a thin
//! layer over `serde_json` that pins down the error surface: a frame that
//! fails to decode is reported as a [`ProtocolError`] and the caller decides
//! whether to drop it.

use thiserror::Error;

use crate::message::{ClientEnvelope, OutboundMessage};

/// Protocol errors that can occur during encoding/decoding.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Failed to serialize an outbound message.
    #[error("Encoding error: {0}")]
    Encode(#[source] serde_json::Error),

    /// Inbound frame was not a valid protocol envelope.
    #[error("Decoding error: {0}")]
    Decode(#[source] serde_json::Error),
}

/// Encode an outbound message as a JSON text frame.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn encode(message: &OutboundMessage) -> Result<String, ProtocolError> {
    serde_json::to_string(message).map_err(ProtocolError::Encode)
}

/// Decode an inbound text frame into a client envelope.
///
/// # Errors
///
/// Returns an error if the frame is not a valid envelope.
pub fn decode(text: &str) -> Result<ClientEnvelope, ProtocolError> {
    serde_json::from_str(text).map_err(ProtocolError::Decode)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::events;

    #[test]
    fn test_encode_decode_roundtrip() {
        let messages = vec![
            OutboundMessage::connection_established("1234.5678", 120),
            OutboundMessage::pong(),
            OutboundMessage::error(4009, "Subscription authentication failed"),
            OutboundMessage::subscription_succeeded("test-channel"),
            OutboundMessage::member_removed("presence-room", "u1"),
        ];

        for message in messages {
            let encoded = encode(&message).unwrap();
            let decoded: OutboundMessage = serde_json::from_str(&encoded).unwrap();
            assert_eq!(message, decoded);
        }
    }

    #[test]
    fn test_encode_omits_empty_fields() {
        let encoded = encode(&OutboundMessage::pong()).unwrap();
        assert_eq!(encoded, r#"{"event":"pusher:pong"}"#);
    }

    #[test]
    fn test_decode_envelope() {
        let envelope = decode(r#"{"event":"pusher:ping"}"#).unwrap();
        assert_eq!(envelope.event, events::PING);
        assert!(envelope.channel.is_none());
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(decode("not json"), Err(ProtocolError::Decode(_))));
        assert!(matches!(decode("[1,2,3]"), Err(ProtocolError::Decode(_))));
    }
}
