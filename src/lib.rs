//! Failover-capable session management for real-time publish/subscribe clients.
//!
//! `robust-session` sits on top of an abstract transport (anything implementing
//! [`TransportClient`]) and presents callers with a single, stable
//! subscription/listener surface while transparently rotating the underlying
//! connection across a primary origin and an ordered pool of fallback origins
//! whenever the active origin becomes unhealthy.
//!
//! The manager guarantees that:
//!
//! * the set of channels the transport is subscribed to always converges to
//!   the cumulative intent recorded through [`SessionManager::subscribe`] and
//!   [`SessionManager::unsubscribe`], no matter how many origin swaps happen
//!   in between;
//! * listeners registered through [`SessionManager::add_listener`] keep
//!   receiving events across swaps without re-registration;
//! * origins are rotated, never blacklisted: a failed origin is retried on
//!   the next rotation pass.
//!
//! Wire protocol, encoding, TLS, and network I/O are the transport's problem;
//! this crate only drives connect/subscribe/unsubscribe calls and consumes
//! the transport's status stream.

#[macro_use]
mod macros;

pub mod session;

pub use session::{
    ClientConfig, DEFAULT_COMMAND_QUEUE_CAPACITY, DEFAULT_EVENT_BUFFER_CAPACITY,
    DEFAULT_MAX_DELAY, DEFAULT_MIN_DELAY, DEFAULT_RETRY_BUDGET, EventListener, FailoverPolicy,
    IntentSnapshot, ListenerId, MessageEvent, Origin, OriginOverrides, PresenceAction,
    PresenceEvent, RotationPolicy, SessionManager, SessionManagerBuilder, SessionState,
    SessionStatus, StatusCategory, StatusEvent, TransportClient, TransportError,
    TransportEvent, TransportFactory,
};
