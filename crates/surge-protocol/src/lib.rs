//! # surge-protocol
//!
//! Wire types for the Pusher channel protocol as spoken by the Surge
//! realtime relay.
//!
//! Frames are JSON text envelopes `{event, data?, channel?}`:
//!
//! - `pusher:subscribe` / `pusher:unsubscribe` - Channel membership
//! - `client-*` - Client-originated events relayed to channel peers
//! - `pusher:ping` / `pusher:pong` - Liveness
//! - `pusher_internal:*` - Presence membership notifications
//!
//! ## Example
//!
//! ```rust
//! use surge_protocol::{codec, OutboundMessage};
//!
//! let message = OutboundMessage::connection_established("1234.5678", 120);
//! let frame = codec::encode(&message).unwrap();
//! assert!(frame.contains("pusher:connection_established"));
//! ```

pub mod channel;
pub mod codec;
pub mod message;

pub use channel::{validate_channel_name, ChannelType};
pub use codec::ProtocolError;
pub use message::{
    ClientEnvelope, EventData, OutboundMessage, PresenceMember, PresenceSnapshot, PublishRequest,
    SubscribePayload, UnsubscribePayload,
};
