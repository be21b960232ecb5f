//! Presence tracking for presence channels.
//!
//! Each presence channel keeps a map of user id to user info. Entries exist
//! only while at least one session authenticated as that user id is
//! subscribed; membership is keyed by user id, not session, so a second
//! session sharing a user id does not get independently tracked.

use std::collections::HashMap;

use serde_json::Value;
use tracing::debug;

use surge_protocol::message::{PresenceMember, PresenceSnapshot};

/// Presence membership for a single channel.
#[derive(Debug, Default)]
pub struct Presence {
    members: HashMap<String, Value>,
}

impl Presence {
    /// Create an empty presence map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the number of present members.
    #[must_use]
    pub fn count(&self) -> usize {
        self.members.len()
    }

    /// Check if a user id is present.
    #[must_use]
    pub fn is_present(&self, user_id: &str) -> bool {
        self.members.contains_key(user_id)
    }

    /// Add a member, overwriting any existing info for the same user id.
    ///
    /// Returns `true` if this is a new member.
    pub fn join(&mut self, member: &PresenceMember) -> bool {
        let is_new = self
            .members
            .insert(member.user_id.clone(), member.user_info.clone())
            .is_none();
        if is_new {
            debug!(user = %member.user_id, "Presence: member joined");
        }
        is_new
    }

    /// Remove a member by user id.
    ///
    /// Returns the removed user info, if any.
    pub fn leave(&mut self, user_id: &str) -> Option<Value> {
        let info = self.members.remove(user_id);
        if info.is_some() {
            debug!(user = %user_id, "Presence: member left");
        }
        info
    }

    /// Full membership snapshot: sorted member ids, id-to-info map, count.
    #[must_use]
    pub fn snapshot(&self) -> PresenceSnapshot {
        let mut ids: Vec<String> = self.members.keys().cloned().collect();
        ids.sort();

        let mut hash = serde_json::Map::new();
        for id in &ids {
            hash.insert(id.clone(), self.members[id].clone());
        }

        PresenceSnapshot {
            count: ids.len(),
            ids,
            hash,
        }
    }

    /// Check if no members are present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn member(user_id: &str, info: Value) -> PresenceMember {
        PresenceMember {
            user_id: user_id.to_string(),
            user_info: info,
        }
    }

    #[test]
    fn test_join_leave() {
        let mut presence = Presence::new();

        assert!(presence.join(&member("u1", json!({ "name": "Alice" }))));
        assert!(!presence.join(&member("u1", json!({ "name": "Alice" }))));

        assert_eq!(presence.count(), 1);
        assert!(presence.is_present("u1"));

        assert!(presence.leave("u1").is_some());
        assert!(!presence.is_present("u1"));
        assert!(presence.leave("u1").is_none());
    }

    #[test]
    fn test_join_overwrites_info() {
        let mut presence = Presence::new();
        presence.join(&member("u1", json!({ "status": "online" })));
        presence.join(&member("u1", json!({ "status": "away" })));

        let snapshot = presence.snapshot();
        assert_eq!(snapshot.count, 1);
        assert_eq!(snapshot.hash["u1"]["status"], "away");
    }

    #[test]
    fn test_snapshot_ids_are_sorted() {
        let mut presence = Presence::new();
        presence.join(&member("zed", Value::Null));
        presence.join(&member("amy", Value::Null));
        presence.join(&member("mia", Value::Null));

        let snapshot = presence.snapshot();
        assert_eq!(snapshot.ids, vec!["amy", "mia", "zed"]);
        assert_eq!(snapshot.count, 3);
        assert_eq!(snapshot.hash.len(), 3);
    }
}
