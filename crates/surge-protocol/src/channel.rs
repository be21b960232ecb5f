//! Channel naming and typing.
//!
//! A channel's type is governed by its name prefix: `private-` and
//! `presence-` channels require subscription auth, everything else is
//! public. The type is resolved once when a channel is created and carried
//! as an explicit tag, never re-derived by string inspection per operation.

use serde::{Deserialize, Serialize};

/// Maximum channel name length.
pub const MAX_CHANNEL_NAME_LENGTH: usize = 200;

/// Name prefix for private channels.
pub const PRIVATE_PREFIX: &str = "private-";

/// Name prefix for presence channels.
pub const PRESENCE_PREFIX: &str = "presence-";

/// The type of a channel, derived from its name prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelType {
    /// Open to any connected session, no auth required.
    Public,
    /// Requires a signed auth token to subscribe.
    Private,
    /// Requires auth plus a member identity; membership is tracked and
    /// broadcast to other subscribers.
    Presence,
}

impl ChannelType {
    /// Derive the channel type from a channel name.
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        if name.starts_with(PRESENCE_PREFIX) {
            ChannelType::Presence
        } else if name.starts_with(PRIVATE_PREFIX) {
            ChannelType::Private
        } else {
            ChannelType::Public
        }
    }

    /// Whether subscribing to this channel type requires a signed auth token.
    #[must_use]
    pub fn requires_auth(self) -> bool {
        !matches!(self, ChannelType::Public)
    }

    /// Whether this channel type tracks member presence.
    #[must_use]
    pub fn is_presence(self) -> bool {
        matches!(self, ChannelType::Presence)
    }
}

/// Validate a channel name.
///
/// # Errors
///
/// Returns an error message if the channel name is invalid.
pub fn validate_channel_name(name: &str) -> Result<(), &'static str> {
    if name.is_empty() {
        return Err("Channel name cannot be empty");
    }
    if name.len() > MAX_CHANNEL_NAME_LENGTH {
        return Err("Channel name too long");
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || "_-=@,.;".contains(c))
    {
        return Err("Channel name contains invalid characters");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_from_name() {
        assert_eq!(ChannelType::from_name("notifications"), ChannelType::Public);
        assert_eq!(ChannelType::from_name("private-chat"), ChannelType::Private);
        assert_eq!(
            ChannelType::from_name("presence-room"),
            ChannelType::Presence
        );
        // The presence prefix wins even though it also contains a dash
        assert_eq!(
            ChannelType::from_name("presence-private-room"),
            ChannelType::Presence
        );
    }

    #[test]
    fn test_auth_requirements() {
        assert!(!ChannelType::Public.requires_auth());
        assert!(ChannelType::Private.requires_auth());
        assert!(ChannelType::Presence.requires_auth());
        assert!(ChannelType::Presence.is_presence());
        assert!(!ChannelType::Private.is_presence());
    }

    #[test]
    fn test_channel_name_validation() {
        assert!(validate_channel_name("test-channel").is_ok());
        assert!(validate_channel_name("presence-room_1").is_ok());
        assert!(validate_channel_name("").is_err());
        assert!(validate_channel_name("spaces are invalid").is_err());

        let long_name = "a".repeat(MAX_CHANNEL_NAME_LENGTH + 1);
        assert!(validate_channel_name(&long_name).is_err());
    }
}
