//! The manager façade: the single object callers interact with.
//!
//! Subscribe/unsubscribe record intent and always logically succeed; they
//! never error on a disconnected session. All failure information reaches
//! callers through registered listeners, never as return values.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, watch};

use super::{
    listener::{EventListener, ListenerId, ListenerSet},
    origin::Origin,
    supervisor::{Command, SessionState, SessionStatus},
    transport::TransportFactory,
};

/// Failover-capable session manager over an abstract pub/sub transport.
///
/// Cheap to clone; all clones drive the same supervisor task. The session
/// shuts down when [`shutdown`](Self::shutdown) is called or when every
/// clone has been dropped.
pub struct SessionManager<F: TransportFactory> {
    commands: mpsc::Sender<Command>,
    listeners: Arc<ListenerSet>,
    client_rx: watch::Receiver<Option<Arc<F::Client>>>,
    status_rx: watch::Receiver<SessionStatus>,
}

impl<F: TransportFactory> Clone for SessionManager<F> {
    fn clone(&self) -> Self {
        Self {
            commands: self.commands.clone(),
            listeners: self.listeners.clone(),
            client_rx: self.client_rx.clone(),
            status_rx: self.status_rx.clone(),
        }
    }
}

impl<F: TransportFactory> SessionManager<F> {
    pub(crate) fn new(
        commands: mpsc::Sender<Command>,
        listeners: Arc<ListenerSet>,
        client_rx: watch::Receiver<Option<Arc<F::Client>>>,
        status_rx: watch::Receiver<SessionStatus>,
    ) -> Self {
        Self { commands, listeners, client_rx, status_rx }
    }

    /// Bring the session up against the primary origin.
    ///
    /// A no-op while a session is already active. After an
    /// `AllOriginsUnavailable` status the pool has been reset, so calling
    /// this again starts a fresh rotation pass from the primary.
    pub async fn connect(&self) {
        let _ = self.commands.send(Command::Connect).await;
    }

    /// Record intent to be subscribed to `channels`.
    ///
    /// Applied to the live client immediately when connected; otherwise the
    /// intent is replayed on the next successful connect. Subscribing to an
    /// already-subscribed channel, or with an empty channel set, is a no-op.
    pub async fn subscribe<I, S>(&self, channels: I, presence: bool)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let channels: Vec<String> = channels.into_iter().map(Into::into).collect();
        if channels.is_empty() {
            return;
        }
        let _ = self.commands.send(Command::Subscribe { channels, presence }).await;
    }

    /// Record intent to be unsubscribed from `channels`.
    ///
    /// Same delivery rules as [`subscribe`](Self::subscribe); unsubscribing
    /// from a channel that was never subscribed is a no-op.
    pub async fn unsubscribe<I, S>(&self, channels: I, presence: bool)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let channels: Vec<String> = channels.into_iter().map(Into::into).collect();
        if channels.is_empty() {
            return;
        }
        let _ = self.commands.send(Command::Unsubscribe { channels, presence }).await;
    }

    /// Register a listener. It keeps receiving events across origin swaps
    /// with no re-registration, until removed.
    pub fn add_listener(&self, listener: Arc<dyn EventListener>) -> ListenerId {
        self.listeners.add(listener)
    }

    /// Deregister a listener. Returns `false` if the id was unknown.
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        self.listeners.remove(id)
    }

    /// The currently active transport client, for direct protocol
    /// operations (publish and friends) not covered by the session layer.
    ///
    /// Always resolves through the supervisor's watch channel, so it never
    /// yields a client whose destruction has begun; `None` mid-swap or
    /// while disconnected.
    pub fn client(&self) -> Option<Arc<F::Client>> {
        self.client_rx.borrow().clone()
    }

    /// Current state of the connection state machine.
    pub fn state(&self) -> SessionState {
        self.status_rx.borrow().state
    }

    /// True while the session is bound to a fallback origin.
    pub fn is_in_failover(&self) -> bool {
        self.status_rx.borrow().origin_index > 0
    }

    /// The origin the session is currently bound to (or targeting).
    pub fn current_origin(&self) -> Origin {
        self.status_rx.borrow().origin.clone()
    }

    /// Watch session state transitions as they happen.
    pub fn watch_status(&self) -> watch::Receiver<SessionStatus> {
        self.status_rx.clone()
    }

    /// Dispose of the session: abandon any in-flight connect or failover,
    /// cancel pending timers, and destroy the active transport client.
    ///
    /// Listeners are kept registered but will receive nothing further.
    /// Idempotent; double disposal is a no-op.
    pub async fn shutdown(&self) {
        let (done_tx, done_rx) = oneshot::channel();
        if self.commands.send(Command::Shutdown { done: done_tx }).await.is_ok() {
            let _ = done_rx.await;
        }
    }
}
