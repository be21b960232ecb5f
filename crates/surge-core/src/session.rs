//! Sessions: one live connection plus its subscription state.

use std::collections::HashSet;

use rand::Rng;
use tokio::sync::mpsc;
use tracing::trace;

use surge_protocol::message::{OutboundMessage, PresenceMember};

/// Outbound-send handle for a session.
///
/// The network layer drains the paired receiver and writes frames to the
/// socket; the core only ever queues. Queuing never blocks, and a closed
/// handle is simply ignored, so one dead peer cannot stall a fan-out.
pub type SessionHandle = mpsc::UnboundedSender<OutboundMessage>;

/// Generate a socket id in the protocol's `"{num}.{num}"` shape.
///
/// Ids are random 64 bits total, collision-improbable for the lifetime of
/// one application instance.
#[must_use]
pub fn generate_socket_id() -> String {
    let mut rng = rand::thread_rng();
    format!("{}.{}", rng.gen::<u32>(), rng.gen::<u32>())
}

/// A live connection and its subscription state.
#[derive(Debug)]
pub struct Session {
    /// Socket id, unique per application instance.
    pub id: String,
    /// Channels this session is currently subscribed to.
    pub channels: HashSet<String>,
    /// Member identity, set only by a successful presence subscription.
    pub identity: Option<PresenceMember>,
    handle: SessionHandle,
}

impl Session {
    /// Create a session around an outbound-send handle.
    #[must_use]
    pub fn new(id: impl Into<String>, handle: SessionHandle) -> Self {
        Self {
            id: id.into(),
            channels: HashSet::new(),
            identity: None,
            handle,
        }
    }

    /// Queue a message for delivery to this session.
    ///
    /// Delivery is best-effort: a closed peer is logged and skipped, never
    /// surfaced to the caller.
    pub fn send(&self, message: OutboundMessage) {
        if self.handle.send(message).is_err() {
            trace!(connection = %self.id, "Dropping message for closed session");
        }
    }

    /// The session's user id, when authenticated on a presence channel.
    #[must_use]
    pub fn user_id(&self) -> Option<&str> {
        self.identity.as_ref().map(|m| m.user_id.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_socket_id_shape() {
        let id = generate_socket_id();
        let (a, b) = id.split_once('.').unwrap();
        assert!(a.parse::<u32>().is_ok());
        assert!(b.parse::<u32>().is_ok());
    }

    #[test]
    fn test_socket_ids_are_unique() {
        let ids: HashSet<String> = (0..100).map(|_| generate_socket_id()).collect();
        assert_eq!(ids.len(), 100);
    }

    #[test]
    fn test_send_to_closed_handle_is_ignored() {
        let (tx, rx) = mpsc::unbounded_channel();
        let session = Session::new("1.2", tx);
        drop(rx);

        // Must not panic or error
        session.send(OutboundMessage::pong());
    }

    #[test]
    fn test_send_queues_message() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let session = Session::new("1.2", tx);

        session.send(OutboundMessage::pong());
        let message = rx.try_recv().unwrap();
        assert_eq!(message.event, "pusher:pong");
    }
}
