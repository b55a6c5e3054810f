//! The boundary contract with the transport collaborator.
//!
//! Everything below this trait pair (wire protocol, framing, encryption,
//! actual network I/O) is the transport's concern. The session layer only
//! requires that a client can be created for an origin, told to connect,
//! subscribe and unsubscribe, and that it reports what happens on a
//! broadcast event stream.

use std::{future::Future, sync::Arc, time::Duration};

use bytes::Bytes;
use tokio::sync::broadcast;

use super::{errors::TransportError, origin::Origin};

/// Default capacity of a client's broadcast event stream.
///
/// If events arrive while the buffer is full the stream reports a lag and
/// the oldest events are dropped; size this for the expected message rate.
pub const DEFAULT_EVENT_BUFFER_CAPACITY: usize = 128;

/// Default transport connect timeout.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Connection status categories a transport can report.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatusCategory {
    /// The client established (or re-established) its connection.
    Connected,
    /// Transient loss of connectivity; worth retrying the same origin.
    DisconnectedRecoverable,
    /// The origin is gone for good as far as this client can tell.
    DisconnectedFatal,
    /// The origin rejected the client's credentials.
    AccessDenied,
    /// Every origin in the pool failed within one rotation pass.
    ///
    /// Synthesized by the session manager; transports must never emit it.
    AllOriginsUnavailable,
}

impl StatusCategory {
    /// True for categories that disqualify the current origin immediately.
    pub fn is_fatal(&self) -> bool {
        matches!(self, StatusCategory::DisconnectedFatal | StatusCategory::AccessDenied)
    }
}

/// A connection status notification.
#[derive(Clone, Debug)]
pub struct StatusEvent {
    pub category: StatusCategory,
    /// Endpoint of the origin the status refers to, when known.
    pub origin: Option<String>,
}

/// An application message received on a subscribed channel.
///
/// The payload is passed through verbatim; the session layer never decodes it.
#[derive(Clone, Debug)]
pub struct MessageEvent {
    pub channel: String,
    pub payload: Bytes,
}

/// Participant activity on a presence-enabled channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PresenceAction {
    Join,
    Leave,
    Timeout,
}

/// A presence notification for a channel.
#[derive(Clone, Debug)]
pub struct PresenceEvent {
    pub channel: String,
    pub participant: String,
    pub action: PresenceAction,
}

/// Everything a transport client can report.
#[derive(Clone, Debug)]
pub enum TransportEvent {
    Status(StatusEvent),
    Message(MessageEvent),
    Presence(PresenceEvent),
}

/// Base configuration applied to every transport client the factory creates.
///
/// Per-origin values from [`OriginOverrides`](super::origin::OriginOverrides)
/// win over these via [`effective`](ClientConfig::effective).
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Credentials presented to the origin, if the transport needs any.
    pub auth_token: Option<String>,
    /// How long a connect attempt may take before the transport gives up.
    pub connect_timeout: Duration,
    /// Capacity of the client's broadcast event stream.
    pub event_buffer_capacity: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            auth_token: None,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            event_buffer_capacity: DEFAULT_EVENT_BUFFER_CAPACITY,
        }
    }
}

impl ClientConfig {
    /// Merge this base configuration with an origin's overrides.
    pub fn effective(&self, origin: &Origin) -> ClientConfig {
        ClientConfig {
            auth_token: origin.overrides.auth_token.clone().or_else(|| self.auth_token.clone()),
            connect_timeout: origin.overrides.connect_timeout.unwrap_or(self.connect_timeout),
            event_buffer_capacity: self.event_buffer_capacity,
        }
    }
}

/// A live connection to one origin.
///
/// `connect` initiates the connection; completion (and everything that
/// happens afterwards) is reported on the stream returned by
/// [`events`](TransportClient::events). Implementations must classify their
/// own failure codes into the [`StatusCategory`] taxonomy; the session
/// layer treats the category as authoritative.
pub trait TransportClient: Send + Sync + 'static {
    /// Initiate the connection to the client's origin.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] only for failures detected synchronously
    /// (bad config, resolution failure); asynchronous outcomes arrive as
    /// status events.
    fn connect(&self) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Tear the connection down. Best effort, never fails.
    fn disconnect(&self) -> impl Future<Output = ()> + Send;

    /// Subscribe to `channels`, optionally with presence interest.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] if the subscribe could not be issued.
    fn subscribe(
        &self,
        channels: &[String],
        presence: bool,
    ) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Unsubscribe from `channels`, optionally dropping presence interest.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] if the unsubscribe could not be issued.
    fn unsubscribe(
        &self,
        channels: &[String],
        presence: bool,
    ) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Obtain a receiver for this client's event stream.
    ///
    /// Receivers only observe events sent after they were created, so the
    /// session layer binds one before calling [`connect`](Self::connect).
    fn events(&self) -> broadcast::Receiver<TransportEvent>;
}

/// Creates and destroys transport clients. Pure resource lifecycle boundary,
/// replaceable with a fake in tests.
pub trait TransportFactory: Send + Sync + 'static {
    /// Concrete client type this factory produces.
    type Client: TransportClient;

    /// Create a client bound to `origin` with the merged `config`.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] when the client cannot even be
    /// constructed for this origin.
    fn create(
        &self,
        origin: &Origin,
        config: &ClientConfig,
    ) -> impl Future<Output = Result<Arc<Self::Client>, TransportError>> + Send;

    /// Release all resources held by `client`.
    ///
    /// Called exactly once per created client, after the session layer has
    /// dropped its event stream binding.
    fn destroy(&self, client: Arc<Self::Client>) -> impl Future<Output = ()> + Send;
}
