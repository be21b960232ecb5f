//! Message types for the Pusher channel protocol.
//!
//! Every frame on the wire is a JSON envelope `{event, data?, channel?}`.
//! Inbound frames decode into [`ClientEnvelope`]; outbound frames are built
//! through the [`OutboundMessage`] constructors. System events
//! (`pusher:*` / `pusher_internal:*`) carry their `data` field as a
//! JSON-encoded string, matching the reference protocol; relayed and
//! broadcast events pass their payload through verbatim.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Protocol event names.
pub mod events {
    /// Sent once per connection, carrying the socket id and activity timeout.
    pub const CONNECTION_ESTABLISHED: &str = "pusher:connection_established";
    /// Client liveness probe.
    pub const PING: &str = "pusher:ping";
    /// Server reply to a ping.
    pub const PONG: &str = "pusher:pong";
    /// Protocol-level error report.
    pub const ERROR: &str = "pusher:error";
    /// Client request to join a channel.
    pub const SUBSCRIBE: &str = "pusher:subscribe";
    /// Client request to leave a channel.
    pub const UNSUBSCRIBE: &str = "pusher:unsubscribe";
    /// Subscription acknowledgment for public and private channels.
    pub const SUBSCRIPTION_SUCCEEDED: &str = "pusher:subscription_succeeded";
    /// Subscription acknowledgment for presence channels, carrying the
    /// member snapshot.
    pub const INTERNAL_SUBSCRIPTION_SUCCEEDED: &str = "pusher_internal:subscription_succeeded";
    /// A member joined a presence channel.
    pub const MEMBER_ADDED: &str = "pusher_internal:member_added";
    /// A member left a presence channel.
    pub const MEMBER_REMOVED: &str = "pusher_internal:member_removed";
    /// Prefix marking client-originated events eligible for relay.
    pub const CLIENT_EVENT_PREFIX: &str = "client-";
}

/// Protocol error codes.
pub mod codes {
    /// Subscription auth token was missing, malformed, or invalid.
    pub const SUBSCRIPTION_AUTH_FAILED: u16 = 4009;
    /// The connection named an application key this instance does not serve.
    pub const APP_KEY_MISMATCH: u16 = 4001;
}

/// The `data` field of an envelope: either a JSON value or a string
/// (possibly itself containing encoded JSON).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EventData {
    /// Raw string payload.
    Text(String),
    /// Structured JSON payload.
    Json(Value),
}

impl EventData {
    /// Convert into a JSON value, passing structured payloads through as-is.
    #[must_use]
    pub fn into_value(self) -> Value {
        match self {
            EventData::Text(text) => Value::String(text),
            EventData::Json(value) => value,
        }
    }
}

/// An inbound frame from a client connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientEnvelope {
    /// Event name.
    pub event: String,
    /// Event payload, shape depends on the event.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<EventData>,
    /// Target channel, required for client events.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
}

impl ClientEnvelope {
    /// Deserialize the `data` field into a typed payload.
    ///
    /// String payloads are treated as encoded JSON. Returns `None` when the
    /// field is missing or does not match the expected shape.
    #[must_use]
    pub fn parse_data<T: serde::de::DeserializeOwned>(&self) -> Option<T> {
        match self.data.as_ref()? {
            EventData::Text(text) => serde_json::from_str(text).ok(),
            EventData::Json(value) => serde_json::from_value(value.clone()).ok(),
        }
    }
}

/// The `data` payload of a `pusher:subscribe` request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscribePayload {
    /// Channel to subscribe to.
    pub channel: String,
    /// Auth token `"<key>:<signature>"`, required for protected channels.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth: Option<String>,
    /// JSON-encoded member identity, required for presence channels.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_data: Option<String>,
}

/// The `data` payload of a `pusher:unsubscribe` request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnsubscribePayload {
    /// Channel to unsubscribe from.
    pub channel: String,
}

/// A presence-channel member identity, the decoded `channel_data` shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresenceMember {
    /// Application-assigned user id.
    pub user_id: String,
    /// Opaque user metadata.
    #[serde(default)]
    pub user_info: Value,
}

/// Full membership snapshot of a presence channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresenceSnapshot {
    /// Member user ids.
    pub ids: Vec<String>,
    /// Map of user id to user info.
    pub hash: serde_json::Map<String, Value>,
    /// Member count.
    pub count: usize,
}

impl PresenceSnapshot {
    /// Wire form of the snapshot: `{"presence": {ids, hash, count}}` as an
    /// encoded JSON string.
    #[must_use]
    pub fn wire_data(&self) -> String {
        json!({ "presence": self }).to_string()
    }
}

/// The body of a server-originated publish request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublishRequest {
    /// Event name delivered to subscribers.
    pub name: String,
    /// Event payload, delivered verbatim.
    pub data: EventData,
    /// Channels to fan the event out to.
    pub channels: Vec<String>,
    /// Session to exclude from delivery, so a publishing client can skip
    /// its own echo.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub socket_id: Option<String>,
}

/// An outbound frame to a client connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboundMessage {
    /// Event name.
    pub event: String,
    /// Source channel, present on channel-scoped events.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    /// Event payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    /// Sending member's user id, present on relayed presence-channel events.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

impl OutboundMessage {
    /// Create a `pusher:connection_established` message.
    #[must_use]
    pub fn connection_established(socket_id: &str, activity_timeout: u64) -> Self {
        let payload = json!({
            "socket_id": socket_id,
            "activity_timeout": activity_timeout,
        });
        Self {
            event: events::CONNECTION_ESTABLISHED.to_string(),
            channel: None,
            data: Some(Value::String(payload.to_string())),
            user_id: None,
        }
    }

    /// Create a `pusher:pong` message.
    #[must_use]
    pub fn pong() -> Self {
        Self {
            event: events::PONG.to_string(),
            channel: None,
            data: None,
            user_id: None,
        }
    }

    /// Create a `pusher:error` message.
    #[must_use]
    pub fn error(code: u16, message: impl Into<String>) -> Self {
        Self {
            event: events::ERROR.to_string(),
            channel: None,
            data: Some(json!({ "message": message.into(), "code": code })),
            user_id: None,
        }
    }

    /// Create a subscription acknowledgment for a public or private channel.
    #[must_use]
    pub fn subscription_succeeded(channel: impl Into<String>) -> Self {
        Self {
            event: events::SUBSCRIPTION_SUCCEEDED.to_string(),
            channel: Some(channel.into()),
            data: Some(Value::String("{}".to_string())),
            user_id: None,
        }
    }

    /// Create a presence-channel subscription acknowledgment carrying the
    /// full member snapshot.
    #[must_use]
    pub fn presence_subscription_succeeded(
        channel: impl Into<String>,
        snapshot: &PresenceSnapshot,
    ) -> Self {
        Self {
            event: events::INTERNAL_SUBSCRIPTION_SUCCEEDED.to_string(),
            channel: Some(channel.into()),
            data: Some(Value::String(snapshot.wire_data())),
            user_id: None,
        }
    }

    /// Create a `pusher_internal:member_added` message.
    #[must_use]
    pub fn member_added(channel: impl Into<String>, member: &PresenceMember) -> Self {
        Self {
            event: events::MEMBER_ADDED.to_string(),
            channel: Some(channel.into()),
            data: Some(Value::String(
                json!({ "user_id": member.user_id, "user_info": member.user_info }).to_string(),
            )),
            user_id: None,
        }
    }

    /// Create a `pusher_internal:member_removed` message.
    #[must_use]
    pub fn member_removed(channel: impl Into<String>, user_id: &str) -> Self {
        Self {
            event: events::MEMBER_REMOVED.to_string(),
            channel: Some(channel.into()),
            data: Some(Value::String(json!({ "user_id": user_id }).to_string())),
            user_id: None,
        }
    }

    /// Create a channel event delivered verbatim to subscribers, used for
    /// both client relays and server-originated broadcasts.
    #[must_use]
    pub fn channel_event(
        event: impl Into<String>,
        channel: impl Into<String>,
        data: Option<Value>,
        user_id: Option<String>,
    ) -> Self {
        Self {
            event: event.into(),
            channel: Some(channel.into()),
            data,
            user_id,
        }
    }

    /// Whether this event name carries the client-originated relay marker.
    #[must_use]
    pub fn is_client_event(event: &str) -> bool {
        event.starts_with(events::CLIENT_EVENT_PREFIX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_with_object_data() {
        let raw = r#"{"event":"pusher:subscribe","data":{"channel":"private-chat","auth":"key:sig"}}"#;
        let envelope: ClientEnvelope = serde_json::from_str(raw).unwrap();

        assert_eq!(envelope.event, "pusher:subscribe");
        let payload: SubscribePayload = envelope.parse_data().unwrap();
        assert_eq!(payload.channel, "private-chat");
        assert_eq!(payload.auth.as_deref(), Some("key:sig"));
        assert!(payload.channel_data.is_none());
    }

    #[test]
    fn test_envelope_with_string_data() {
        let raw = r#"{"event":"pusher:unsubscribe","data":"{\"channel\":\"test\"}"}"#;
        let envelope: ClientEnvelope = serde_json::from_str(raw).unwrap();

        let payload: UnsubscribePayload = envelope.parse_data().unwrap();
        assert_eq!(payload.channel, "test");
    }

    #[test]
    fn test_envelope_missing_data() {
        let raw = r#"{"event":"pusher:ping"}"#;
        let envelope: ClientEnvelope = serde_json::from_str(raw).unwrap();

        assert!(envelope.data.is_none());
        assert!(envelope.parse_data::<SubscribePayload>().is_none());
    }

    #[test]
    fn test_connection_established_payload() {
        let message = OutboundMessage::connection_established("123.456", 120);

        assert_eq!(message.event, events::CONNECTION_ESTABLISHED);
        let Some(Value::String(data)) = &message.data else {
            panic!("expected string data");
        };
        let inner: Value = serde_json::from_str(data).unwrap();
        assert_eq!(inner["socket_id"], "123.456");
        assert_eq!(inner["activity_timeout"], 120);
    }

    #[test]
    fn test_error_payload() {
        let message = OutboundMessage::error(codes::SUBSCRIPTION_AUTH_FAILED, "nope");

        assert_eq!(message.event, events::ERROR);
        assert_eq!(message.data, Some(json!({ "message": "nope", "code": 4009 })));
    }

    #[test]
    fn test_presence_snapshot_wire_data() {
        let mut hash = serde_json::Map::new();
        hash.insert("u1".to_string(), json!({ "name": "Alice" }));
        let snapshot = PresenceSnapshot {
            ids: vec!["u1".to_string()],
            hash,
            count: 1,
        };

        let inner: Value = serde_json::from_str(&snapshot.wire_data()).unwrap();
        assert_eq!(inner["presence"]["count"], 1);
        assert_eq!(inner["presence"]["ids"][0], "u1");
        assert_eq!(inner["presence"]["hash"]["u1"]["name"], "Alice");
    }

    #[test]
    fn test_client_event_marker() {
        assert!(OutboundMessage::is_client_event("client-typing"));
        assert!(!OutboundMessage::is_client_event("pusher:ping"));
        assert!(!OutboundMessage::is_client_event("typing"));
    }

    #[test]
    fn test_publish_request_decode() {
        let raw = r#"{"name":"test-event","data":"hi","channels":["test-channel"]}"#;
        let request: PublishRequest = serde_json::from_str(raw).unwrap();

        assert_eq!(request.name, "test-event");
        assert_eq!(request.channels, vec!["test-channel"]);
        assert!(request.socket_id.is_none());
        assert_eq!(request.data.into_value(), Value::String("hi".to_string()));
    }
}
