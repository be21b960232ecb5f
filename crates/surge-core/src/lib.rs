//! # surge-core
//!
//! Application state and event routing for the Surge realtime relay.
//!
//! This crate provides the fundamental building blocks:
//!
//! - **App** - Per-application state block implementing the protocol's
//!   subscribe/unsubscribe/relay/broadcast/presence semantics
//! - **Session** - One live connection plus its subscription state
//! - **Channel** - Named topic with its current subscriber set
//! - **Presence** - Per-channel membership keyed by user id
//! - **AuthVerifier** - HMAC-SHA256 auth for protected subscriptions
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │   Session   │────▶│     App     │────▶│   Channel   │
//! └─────────────┘     └─────────────┘     └─────────────┘
//!                            │                   │
//!                            ▼                   ▼
//!                     ┌─────────────┐     ┌─────────────┐
//!                     │ AuthVerifier│     │  Presence   │
//!                     └─────────────┘     └─────────────┘
//! ```
//!
//! All state mutation for one application is serialized behind the `App`
//! state mutex; outbound delivery is queued per session and never blocks
//! the mutation path.

pub mod app;
pub mod auth;
pub mod channel;
pub mod presence;
pub mod session;

pub use app::{App, AppConfig, AppStats, DEFAULT_ACTIVITY_TIMEOUT};
pub use auth::{AuthError, AuthVerifier};
pub use channel::Channel;
pub use presence::Presence;
pub use session::{generate_socket_id, Session, SessionHandle};
