//! Inbound control messages
//!
//! The subset of client messages the gateway acts on itself. Everything else
//! belongs to the domain layer behind it.

use serde::Deserialize;

/// A message received on a client channel
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Liveness handshake initiated by the peer; answered with a `pong`
    Ping,
    /// Direct message to another user, relayed as a notification
    PeerMessage {
        recipient_id: String,
        content: String,
    },
    /// Any message type this gateway does not handle
    #[serde(other)]
    Unknown,
}

impl ClientMessage {
    /// Parse a client message from raw JSON text
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ping() {
        let msg = ClientMessage::from_json(r#"{"type":"ping"}"#).unwrap();
        assert!(matches!(msg, ClientMessage::Ping));
    }

    #[test]
    fn test_parse_peer_message() {
        let msg = ClientMessage::from_json(
            r#"{"type":"peer_message","recipient_id":"u42","content":"hello"}"#,
        )
        .unwrap();

        match msg {
            ClientMessage::PeerMessage {
                recipient_id,
                content,
            } => {
                assert_eq!(recipient_id, "u42");
                assert_eq!(content, "hello");
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn test_unknown_type_is_not_an_error() {
        let msg = ClientMessage::from_json(r#"{"type":"mood_entry","score":7}"#).unwrap();
        assert!(matches!(msg, ClientMessage::Unknown));
    }

    #[test]
    fn test_malformed_json_is_an_error() {
        assert!(ClientMessage::from_json("not json").is_err());
    }
}
