//! The application state block.
//!
//! One [`App`] owns every session, channel, and presence entry for a single
//! configured application, and implements the protocol's subscribe,
//! unsubscribe, relay, broadcast, and presence semantics. Every mutating
//! operation runs as one critical section under the state mutex, so
//! multi-step transitions (subscribe, unsubscribe, broadcast, disconnect
//! cleanup) never interleave partially. Outbound delivery goes through
//! per-session unbounded senders and never blocks the mutation path; a
//! failed send to one peer never affects delivery to another.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use serde_json::Value;
use tracing::{debug, info, trace};

use surge_protocol::channel::{validate_channel_name, ChannelType};
use surge_protocol::codec;
use surge_protocol::message::{
    codes, events, ClientEnvelope, EventData, OutboundMessage, PresenceMember, PublishRequest,
    SubscribePayload, UnsubscribePayload,
};

use crate::auth::AuthVerifier;
use crate::channel::Channel;
use crate::session::{generate_socket_id, Session, SessionHandle};

/// Default activity-timeout hint sent in the connection acknowledgment,
/// in seconds.
pub const DEFAULT_ACTIVITY_TIMEOUT: u64 = 120;

/// Error message carried by a rejected subscription.
const AUTH_FAILURE_MESSAGE: &str = "Subscription authentication failed";

/// Identity and protocol hints for one application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Application key, the public half of the identity.
    pub key: String,
    /// Application secret used to sign subscription auth tokens.
    pub secret: String,
    /// Activity-timeout hint, seconds.
    pub activity_timeout: u64,
}

impl AppConfig {
    /// Create a config for a key/secret pair with the default timeout hint.
    #[must_use]
    pub fn new(key: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            secret: secret.into(),
            activity_timeout: DEFAULT_ACTIVITY_TIMEOUT,
        }
    }

    /// Override the activity-timeout hint.
    #[must_use]
    pub fn with_activity_timeout(mut self, seconds: u64) -> Self {
        self.activity_timeout = seconds;
        self
    }
}

#[derive(Debug, Default)]
struct AppState {
    /// Live sessions indexed by socket id.
    sessions: HashMap<String, Session>,
    /// Channels with at least one subscriber, indexed by name.
    channels: HashMap<String, Channel>,
}

/// Application statistics.
#[derive(Debug, Clone)]
pub struct AppStats {
    /// Number of live sessions.
    pub session_count: usize,
    /// Number of channels with at least one subscriber.
    pub channel_count: usize,
    /// Total number of subscriptions across all sessions.
    pub total_subscriptions: usize,
}

/// All connection, channel, and presence state for one application.
pub struct App {
    auth: AuthVerifier,
    activity_timeout: u64,
    state: Mutex<AppState>,
}

impl App {
    /// Create an application from its configured identity.
    #[must_use]
    pub fn new(config: AppConfig) -> Self {
        info!(key = %config.key, "Creating application");
        Self {
            auth: AuthVerifier::new(config.key, config.secret),
            activity_timeout: config.activity_timeout,
            state: Mutex::new(AppState::default()),
        }
    }

    /// The application key this instance serves.
    #[must_use]
    pub fn key(&self) -> &str {
        self.auth.key()
    }

    fn state(&self) -> MutexGuard<'_, AppState> {
        self.state.lock().expect("application state mutex poisoned")
    }

    /// Get application statistics.
    #[must_use]
    pub fn stats(&self) -> AppStats {
        let state = self.state();
        AppStats {
            session_count: state.sessions.len(),
            channel_count: state.channels.len(),
            total_subscriptions: state.sessions.values().map(|s| s.channels.len()).sum(),
        }
    }

    /// Check if a channel currently exists.
    #[must_use]
    pub fn channel_exists(&self, channel_name: &str) -> bool {
        self.state().channels.contains_key(channel_name)
    }

    /// Get the subscriber count for a channel.
    #[must_use]
    pub fn subscriber_count(&self, channel_name: &str) -> usize {
        self.state()
            .channels
            .get(channel_name)
            .map(Channel::subscriber_count)
            .unwrap_or(0)
    }

    /// Get the channels a session is subscribed to.
    #[must_use]
    pub fn session_channels(&self, socket_id: &str) -> Vec<String> {
        self.state()
            .sessions
            .get(socket_id)
            .map(|s| s.channels.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Register a new connection.
    ///
    /// Allocates a socket id, registers an empty session around the
    /// outbound-send handle, and acknowledges with
    /// `pusher:connection_established`.
    pub fn connect(&self, handle: SessionHandle) -> String {
        let socket_id = generate_socket_id();
        let session = Session::new(socket_id.clone(), handle);

        let mut state = self.state();
        session.send(OutboundMessage::connection_established(
            &socket_id,
            self.activity_timeout,
        ));
        state.sessions.insert(socket_id.clone(), session);
        debug!(connection = %socket_id, "Session connected");
        socket_id
    }

    /// Remove a connection, unsubscribing it from every channel first.
    ///
    /// Each channel goes through the client-initiated unsubscribe path, so
    /// presence members are removed and announced exactly as if the client
    /// had left on its own. No dangling subscriber references survive.
    pub fn disconnect(&self, socket_id: &str) {
        let mut state = self.state();
        let channels: Vec<String> = match state.sessions.get(socket_id) {
            Some(session) => session.channels.iter().cloned().collect(),
            None => return,
        };
        for channel_name in &channels {
            Self::unsubscribe_session(&mut state, socket_id, channel_name);
        }
        state.sessions.remove(socket_id);
        debug!(connection = %socket_id, "Session disconnected");
    }

    /// Handle a raw inbound text frame from a session.
    ///
    /// A frame that fails to decode is dropped silently: no reply, no state
    /// change.
    pub fn handle_message(&self, socket_id: &str, raw: &str) {
        match codec::decode(raw) {
            Ok(envelope) => self.dispatch(socket_id, &envelope),
            Err(err) => {
                trace!(connection = %socket_id, error = %err, "Dropping undecodable frame");
            }
        }
    }

    /// Dispatch a decoded envelope to the matching operation.
    pub fn dispatch(&self, socket_id: &str, envelope: &ClientEnvelope) {
        match envelope.event.as_str() {
            events::PING => self.ping(socket_id),
            events::SUBSCRIBE => {
                let Some(payload) = envelope.parse_data::<SubscribePayload>() else {
                    trace!(connection = %socket_id, "Dropping subscribe without payload");
                    return;
                };
                self.subscribe(
                    socket_id,
                    &payload.channel,
                    payload.auth.as_deref(),
                    payload.channel_data.as_deref(),
                );
            }
            events::UNSUBSCRIBE => {
                let Some(payload) = envelope.parse_data::<UnsubscribePayload>() else {
                    trace!(connection = %socket_id, "Dropping unsubscribe without payload");
                    return;
                };
                self.unsubscribe(socket_id, &payload.channel);
            }
            event if OutboundMessage::is_client_event(event) => {
                let Some(channel) = envelope.channel.as_deref() else {
                    trace!(connection = %socket_id, event = %event, "Dropping client event without channel");
                    return;
                };
                let data = envelope.data.clone().map(EventData::into_value);
                self.relay_client_event(socket_id, event, channel, data);
            }
            other => {
                trace!(connection = %socket_id, event = %other, "Ignoring unknown event");
            }
        }
    }

    /// Answer a ping with a pong to the same session. No other state is
    /// touched.
    fn ping(&self, socket_id: &str) {
        let state = self.state();
        if let Some(session) = state.sessions.get(socket_id) {
            session.send(OutboundMessage::pong());
        }
    }

    /// Subscribe a session to a channel.
    ///
    /// Protected channels are gated on the auth verifier; a rejected token
    /// is reported only to the requester and leaves the session otherwise
    /// untouched. Presence subscriptions record the member identity and
    /// announce the join to every other subscriber.
    pub fn subscribe(
        &self,
        socket_id: &str,
        channel_name: &str,
        auth: Option<&str>,
        channel_data: Option<&str>,
    ) {
        if let Err(reason) = validate_channel_name(channel_name) {
            trace!(connection = %socket_id, channel = %channel_name, %reason, "Dropping subscribe to invalid channel");
            return;
        }

        let mut guard = self.state();
        let state = &mut *guard;
        if !state.sessions.contains_key(socket_id) {
            return;
        }

        let kind = ChannelType::from_name(channel_name);
        if kind.requires_auth() {
            if let Err(err) = self.auth.verify(socket_id, channel_name, auth, channel_data) {
                debug!(connection = %socket_id, channel = %channel_name, error = %err, "Subscription auth rejected");
                if let Some(session) = state.sessions.get(socket_id) {
                    session.send(OutboundMessage::error(
                        codes::SUBSCRIPTION_AUTH_FAILED,
                        AUTH_FAILURE_MESSAGE,
                    ));
                }
                return;
            }
        }

        let member = if kind.is_presence() {
            match channel_data.and_then(|raw| serde_json::from_str::<PresenceMember>(raw).ok()) {
                Some(member) => Some(member),
                None => {
                    trace!(connection = %socket_id, channel = %channel_name, "Dropping presence subscribe without member data");
                    return;
                }
            }
        } else {
            None
        };

        let channel = state
            .channels
            .entry(channel_name.to_string())
            .or_insert_with(|| {
                debug!(channel = %channel_name, "Creating channel");
                Channel::new(channel_name)
            });
        channel.subscribe(socket_id);

        // The presence snapshot is taken after the join so the
        // acknowledgment includes the joining member.
        let (ack, fanout) = if let Some(member) = &member {
            channel.presence_mut().join(member);
            let snapshot = channel.presence().snapshot();
            let peers: Vec<String> = channel
                .subscribers()
                .filter(|id| id.as_str() != socket_id)
                .cloned()
                .collect();
            (
                OutboundMessage::presence_subscription_succeeded(channel_name, &snapshot),
                Some((OutboundMessage::member_added(channel_name, member), peers)),
            )
        } else {
            (OutboundMessage::subscription_succeeded(channel_name), None)
        };

        if let Some(session) = state.sessions.get_mut(socket_id) {
            session.channels.insert(channel_name.to_string());
            if let Some(member) = member {
                session.identity = Some(member);
            }
            session.send(ack);
        }

        if let Some((added, peers)) = fanout {
            for peer_id in &peers {
                if let Some(peer) = state.sessions.get(peer_id) {
                    peer.send(added.clone());
                }
            }
        }
    }

    /// Unsubscribe a session from a channel.
    pub fn unsubscribe(&self, socket_id: &str, channel_name: &str) {
        let mut state = self.state();
        Self::unsubscribe_session(&mut state, socket_id, channel_name);
    }

    fn unsubscribe_session(state: &mut AppState, socket_id: &str, channel_name: &str) {
        let Some(session) = state.sessions.get_mut(socket_id) else {
            return;
        };
        if !session.channels.remove(channel_name) {
            return;
        }
        let identity = session.identity.clone();

        let Some(channel) = state.channels.get_mut(channel_name) else {
            return;
        };
        channel.unsubscribe(socket_id);

        let mut removal = None;
        if channel.kind().is_presence() {
            if let Some(member) = identity {
                if channel.presence_mut().leave(&member.user_id).is_some() {
                    let remaining: Vec<String> = channel.subscribers().cloned().collect();
                    removal = Some((
                        OutboundMessage::member_removed(channel_name, &member.user_id),
                        remaining,
                    ));
                }
            }
        }

        let remove_channel = channel.is_empty();
        if remove_channel {
            state.channels.remove(channel_name);
            debug!(channel = %channel_name, "Deleting empty channel");
        }

        if let Some((message, remaining)) = removal {
            for peer_id in &remaining {
                if let Some(peer) = state.sessions.get(peer_id) {
                    peer.send(message.clone());
                }
            }
        }
    }

    /// Relay a client-originated event to the other subscribers of a channel.
    ///
    /// The event is delivered only when the sender is subscribed to the
    /// channel and the channel is private or presence; anything else is
    /// dropped silently. The sender never receives its own relay.
    pub fn relay_client_event(
        &self,
        socket_id: &str,
        event: &str,
        channel_name: &str,
        data: Option<Value>,
    ) {
        let state = self.state();
        let Some(session) = state.sessions.get(socket_id) else {
            return;
        };
        if !session.channels.contains(channel_name) {
            trace!(connection = %socket_id, channel = %channel_name, "Dropping client event from non-subscriber");
            return;
        }
        let Some(channel) = state.channels.get(channel_name) else {
            return;
        };
        if !channel.kind().requires_auth() {
            trace!(connection = %socket_id, channel = %channel_name, "Dropping client event on public channel");
            return;
        }

        let message = OutboundMessage::channel_event(
            event,
            channel_name,
            data,
            session.user_id().map(String::from),
        );
        for peer_id in channel.subscribers() {
            if peer_id.as_str() == socket_id {
                continue;
            }
            if let Some(peer) = state.sessions.get(peer_id) {
                peer.send(message.clone());
            }
        }
    }

    /// Fan a server-originated publish out to its channels.
    ///
    /// The session matching `socket_id` is excluded from delivery so a
    /// publishing client can skip its own echo. A channel with no
    /// subscribers is a silent no-op. Returns the number of deliveries.
    pub fn publish(&self, request: &PublishRequest) -> usize {
        let state = self.state();
        let data = request.data.clone().into_value();
        let mut delivered = 0;

        for channel_name in &request.channels {
            let Some(channel) = state.channels.get(channel_name) else {
                trace!(channel = %channel_name, "Publish to channel without subscribers");
                continue;
            };
            let message = OutboundMessage::channel_event(
                request.name.as_str(),
                channel_name.as_str(),
                Some(data.clone()),
                None,
            );
            for peer_id in channel.subscribers() {
                if request.socket_id.as_deref() == Some(peer_id.as_str()) {
                    continue;
                }
                if let Some(peer) = state.sessions.get(peer_id) {
                    peer.send(message.clone());
                    delivered += 1;
                }
            }
        }

        trace!(event = %request.name, recipients = delivered, "Published event");
        delivered
    }

    /// Assert that the session and channel subscription sets mirror each
    /// other exactly.
    #[cfg(test)]
    fn assert_subscriptions_consistent(&self) {
        let state = self.state();
        for (socket_id, session) in &state.sessions {
            for channel_name in &session.channels {
                let channel = state
                    .channels
                    .get(channel_name)
                    .unwrap_or_else(|| panic!("channel {channel_name} missing for {socket_id}"));
                assert!(
                    channel.is_subscribed(socket_id),
                    "{socket_id} not in subscribers of {channel_name}"
                );
            }
        }
        for (channel_name, channel) in &state.channels {
            assert!(!channel.is_empty(), "orphan channel {channel_name}");
            for socket_id in channel.subscribers() {
                let session = state
                    .sessions
                    .get(socket_id)
                    .unwrap_or_else(|| panic!("session {socket_id} missing for {channel_name}"));
                assert!(
                    session.channels.contains(channel_name),
                    "{channel_name} not in channel set of {socket_id}"
                );
            }
        }
    }
}
