//! Channel state: a named topic plus its current subscribers.
//!
//! Channels are created lazily on first subscribe and deleted by the
//! application state as soon as their subscriber set empties, so no orphan
//! channels persist.

use std::collections::HashSet;

use tracing::debug;

use surge_protocol::ChannelType;

use crate::presence::Presence;

/// A channel and its subscriber set.
#[derive(Debug)]
pub struct Channel {
    name: String,
    kind: ChannelType,
    subscribers: HashSet<String>,
    presence: Presence,
}

impl Channel {
    /// Create a channel, resolving its type from the name once.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let kind = ChannelType::from_name(&name);
        Self {
            name,
            kind,
            subscribers: HashSet::new(),
            presence: Presence::new(),
        }
    }

    /// Get the channel name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the channel type tag.
    #[must_use]
    pub fn kind(&self) -> ChannelType {
        self.kind
    }

    /// Get the number of subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Check if a session is subscribed.
    #[must_use]
    pub fn is_subscribed(&self, socket_id: &str) -> bool {
        self.subscribers.contains(socket_id)
    }

    /// Add a session to the subscriber set.
    ///
    /// Returns `true` if the session was not already subscribed.
    pub fn subscribe(&mut self, socket_id: impl Into<String>) -> bool {
        let socket_id = socket_id.into();
        let added = self.subscribers.insert(socket_id.clone());
        if added {
            debug!(channel = %self.name, connection = %socket_id, "Session subscribed");
        }
        added
    }

    /// Remove a session from the subscriber set.
    ///
    /// Returns `true` if the session was subscribed.
    pub fn unsubscribe(&mut self, socket_id: &str) -> bool {
        let removed = self.subscribers.remove(socket_id);
        if removed {
            debug!(channel = %self.name, connection = %socket_id, "Session unsubscribed");
        }
        removed
    }

    /// Iterate over subscriber socket ids.
    pub fn subscribers(&self) -> impl Iterator<Item = &String> {
        self.subscribers.iter()
    }

    /// Check if the channel has no subscribers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }

    /// Presence membership for this channel. Populated only when the
    /// channel type is `Presence`.
    #[must_use]
    pub fn presence(&self) -> &Presence {
        &self.presence
    }

    /// Mutable presence membership for this channel.
    pub fn presence_mut(&mut self) -> &mut Presence {
        &mut self.presence
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_kind_resolved_once() {
        assert_eq!(Channel::new("room").kind(), ChannelType::Public);
        assert_eq!(Channel::new("private-room").kind(), ChannelType::Private);
        assert_eq!(Channel::new("presence-room").kind(), ChannelType::Presence);
    }

    #[test]
    fn test_subscribe_unsubscribe() {
        let mut channel = Channel::new("test");

        assert!(channel.subscribe("1.1"));
        assert!(!channel.subscribe("1.1"));
        assert_eq!(channel.subscriber_count(), 1);
        assert!(channel.is_subscribed("1.1"));

        channel.subscribe("2.2");
        assert_eq!(channel.subscriber_count(), 2);

        assert!(channel.unsubscribe("1.1"));
        assert!(!channel.unsubscribe("1.1"));
        assert!(!channel.is_subscribed("1.1"));
        assert!(!channel.is_empty());

        channel.unsubscribe("2.2");
        assert!(channel.is_empty());
    }
}
