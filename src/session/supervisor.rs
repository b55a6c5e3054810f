//! The connection supervisor: an actor task that owns the session state
//! machine.
//!
//! All mutation of the origin pool, the live client, and the subscription
//! intent happens on this single task; the façade only sends commands into
//! its queue. That queue is the ordering authority the concurrency model
//! requires: two failovers can never race, and a replay can never
//! interleave with a caller's unsubscribe.
//!
//! The task `select!`s over three sources, commands first so that disposal
//! wins over an in-flight failover:
//!
//! 1. the command queue (connect, subscribe, unsubscribe, shutdown),
//! 2. the live client's event stream (one binding, rebound on every swap),
//! 3. the armed backoff timer for in-place reconnects.

use std::sync::Arc;

use backon::ExponentialBackoff;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::time::Instant;

use super::{
    errors::TransportError,
    intent::SubscriptionIntent,
    listener::ListenerSet,
    origin::{Origin, OriginPool},
    policy::{FailoverPolicy, RotationPolicy},
    transport::{
        ClientConfig, StatusCategory, StatusEvent, TransportClient, TransportEvent,
        TransportFactory,
    },
};

/// Explicit connection lifecycle states.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    /// No session; waiting for a `connect()` call.
    Idle,
    /// A connect attempt is in flight against the current origin.
    Connecting,
    /// The session is live and the subscription intent has been applied.
    Connected,
    /// Waiting out the backoff delay before retrying the same origin.
    Reconnecting,
    /// Swapping to the next origin in the pool.
    Failover,
    /// The manager was disposed; terminal.
    ShutDown,
}

/// Observable session position, published on a watch channel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionStatus {
    /// Current state of the supervisor's state machine.
    pub state: SessionState,
    /// Index of the origin the session is bound to (0 = primary).
    pub origin_index: usize,
    /// The origin itself.
    pub origin: Origin,
}

/// Commands the supervisor actor.
pub(crate) enum Command {
    Connect,
    Subscribe { channels: Vec<String>, presence: bool },
    Unsubscribe { channels: Vec<String>, presence: bool },
    Shutdown { done: oneshot::Sender<()> },
}

/// The live pairing of a client and the supervisor's binding to its events.
///
/// Exactly one exists at a time; dropped wholesale on every swap so a stale
/// client can never leak events past its destruction.
struct ActiveSession<F: TransportFactory> {
    client: Arc<F::Client>,
    events: broadcast::Receiver<TransportEvent>,
}

pub(crate) struct Supervisor<F: TransportFactory> {
    factory: Arc<F>,
    pool: OriginPool,
    base_config: ClientConfig,
    policy: FailoverPolicy,
    intent: SubscriptionIntent,
    listeners: Arc<ListenerSet>,
    commands: mpsc::Receiver<Command>,
    client_tx: watch::Sender<Option<Arc<F::Client>>>,
    status_tx: watch::Sender<SessionStatus>,
    state: SessionState,
    session: Option<ActiveSession<F>>,
    /// Delay sequence for the current origin's retry run. `None` when no
    /// run is active; re-initialized lazily on the first recoverable failure.
    backoff: Option<ExponentialBackoff>,
    /// Deadline of the armed reconnect timer.
    retry_at: Option<Instant>,
    /// Which pool positions have failed since the last successful connect.
    /// All-true means one full rotation pass has been exhausted.
    tried_this_pass: Vec<bool>,
    /// For `RotationPolicy::PrimaryFirst`: the fallback that failed last,
    /// so the walk resumes after it once the primary has been re-probed.
    resume_from: Option<usize>,
}

impl<F: TransportFactory> Supervisor<F> {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        factory: Arc<F>,
        pool: OriginPool,
        base_config: ClientConfig,
        policy: FailoverPolicy,
        listeners: Arc<ListenerSet>,
        commands: mpsc::Receiver<Command>,
        client_tx: watch::Sender<Option<Arc<F::Client>>>,
        status_tx: watch::Sender<SessionStatus>,
    ) -> Self {
        let pool_len = pool.len();
        Self {
            factory,
            pool,
            base_config,
            policy,
            intent: SubscriptionIntent::default(),
            listeners,
            commands,
            client_tx,
            status_tx,
            state: SessionState::Idle,
            session: None,
            backoff: None,
            retry_at: None,
            tried_this_pass: vec![false; pool_len],
            resume_from: None,
        }
    }

    pub(crate) async fn run(mut self) {
        loop {
            tokio::select! {
                biased;

                cmd = self.commands.recv() => match cmd {
                    Some(Command::Shutdown { done }) => {
                        self.shutdown().await;
                        let _ = done.send(());
                        return;
                    }
                    Some(cmd) => self.handle_command(cmd).await,
                    // every manager handle dropped
                    None => {
                        self.shutdown().await;
                        return;
                    }
                },

                event = Self::next_event(&mut self.session), if self.session.is_some() => {
                    self.handle_transport_event(event).await;
                }

                () = Self::wait_until(self.retry_at), if self.retry_at.is_some() => {
                    self.retry_current_origin().await;
                }
            }
        }
    }

    async fn next_event(
        session: &mut Option<ActiveSession<F>>,
    ) -> Result<TransportEvent, broadcast::error::RecvError> {
        match session.as_mut() {
            Some(active) => active.events.recv().await,
            // disabled by the select guard; never polled
            None => std::future::pending().await,
        }
    }

    async fn wait_until(deadline: Option<Instant>) {
        match deadline {
            Some(deadline) => tokio::time::sleep_until(deadline).await,
            // disabled by the select guard; never polled
            None => std::future::pending().await,
        }
    }

    async fn handle_command(&mut self, cmd: Command) {
        match cmd {
            Command::Connect => self.handle_connect().await,
            Command::Subscribe { channels, presence } => {
                let presence_before = self.intent.presence();
                let added = self.intent.add_channels(channels, presence);
                let presence_now = self.intent.presence();

                if self.state != SessionState::Connected {
                    return;
                }
                let Some(client) = self.current_client() else { return };
                if !added.is_empty() {
                    trace!(channels = added.len(), "applying subscribe delta to live client");
                    if let Err(e) = client.subscribe(&added, presence_now).await {
                        warn!(error = %e, "live subscribe failed; intent retained for replay");
                    }
                } else if presence_now != presence_before {
                    // presence flipped on for already-subscribed channels
                    let snapshot = self.intent.snapshot();
                    if let Err(e) = client.subscribe(&snapshot.channels, presence_now).await {
                        warn!(error = %e, "live presence update failed; intent retained for replay");
                    }
                }
            }
            Command::Unsubscribe { channels, presence } => {
                let removed = self.intent.remove_channels(channels, presence);

                if self.state != SessionState::Connected || removed.is_empty() {
                    return;
                }
                let Some(client) = self.current_client() else { return };
                trace!(channels = removed.len(), "applying unsubscribe delta to live client");
                if let Err(e) = client.unsubscribe(&removed, presence).await {
                    warn!(error = %e, "live unsubscribe failed; intent retained for replay");
                }
            }
            Command::Shutdown { .. } => unreachable!("shutdown handled in run loop"),
        }
    }

    async fn handle_connect(&mut self) {
        if self.state != SessionState::Idle {
            debug!(state = ?self.state, "connect ignored: session already active");
            return;
        }
        self.begin_rotation_pass();
        self.pool.reset();
        if let Err(e) = self.try_connect_current().await {
            self.handle_failure(e.is_recoverable()).await;
        }
    }

    /// Create a client for the pool's current origin, bind its event stream,
    /// and initiate the connection. On success the supervisor is left in
    /// `Connecting`, waiting for a `Connected` status event.
    async fn try_connect_current(&mut self) -> Result<(), TransportError> {
        let origin = self.pool.current().clone();
        self.set_state(SessionState::Connecting);
        info!(
            origin = %origin.endpoint,
            origin_index = self.pool.position(),
            "connecting"
        );

        let config = self.base_config.effective(&origin);
        let client = self.factory.create(&origin, &config).await?;

        // Bind the event stream before connect so no status is missed.
        let events = client.events();
        self.session = Some(ActiveSession { client: client.clone(), events });
        self.client_tx.send_replace(Some(client.clone()));

        client.connect().await
    }

    async fn handle_transport_event(
        &mut self,
        event: Result<TransportEvent, broadcast::error::RecvError>,
    ) {
        let event = match event {
            Ok(event) => event,
            Err(broadcast::error::RecvError::Lagged(missed)) => {
                warn!(missed, "event stream lagged; increase event_buffer_capacity");
                return;
            }
            Err(broadcast::error::RecvError::Closed) => {
                warn!("transport dropped its event stream");
                // unbind first or this branch re-fires while the retry timer runs
                self.teardown_session().await;
                self.handle_failure(true).await;
                return;
            }
        };

        match &event {
            TransportEvent::Status(status) => {
                self.listeners.dispatch(&event);
                match status.category {
                    StatusCategory::Connected => self.on_connected().await,
                    // manager-synthesized only; a transport emitting it is a bug
                    StatusCategory::AllOriginsUnavailable => {
                        debug!("ignoring AllOriginsUnavailable emitted by transport");
                    }
                    category => self.handle_failure(!category.is_fatal()).await,
                }
            }
            TransportEvent::Message(_) | TransportEvent::Presence(_) => {
                self.listeners.dispatch(&event);
            }
        }
    }

    /// A `Connected` status arrived: replay the full subscription intent so
    /// the client's subscribed set equals the caller's intent exactly.
    async fn on_connected(&mut self) {
        match self.state {
            SessionState::Connecting | SessionState::Connected => {}
            // a transport may only report Connected while we drive a connect
            other => {
                debug!(state = ?other, "ignoring Connected status in unexpected state");
                return;
            }
        }

        info!(
            origin = %self.pool.current().endpoint,
            origin_index = self.pool.position(),
            "session connected"
        );
        self.set_state(SessionState::Connected);
        self.begin_rotation_pass();
        // a successful connect ends the current retry run
        self.backoff = None;

        let snapshot = self.intent.snapshot();
        if snapshot.is_empty() {
            return;
        }
        let Some(client) = self.current_client() else { return };
        debug!(
            channels = snapshot.channels.len(),
            presence = snapshot.presence,
            "replaying subscription intent"
        );
        if let Err(e) = client.subscribe(&snapshot.channels, snapshot.presence).await {
            warn!(error = %e, "intent replay failed");
            self.handle_failure(e.is_recoverable()).await;
        }
    }

    /// Drive the state machine after any failure: retry in place while the
    /// origin's budget lasts, otherwise rotate through the pool until an
    /// origin accepts a connect attempt or the pass is exhausted.
    async fn handle_failure(&mut self, mut recoverable: bool) {
        if self.state == SessionState::ShutDown {
            return;
        }

        loop {
            if recoverable {
                if self.backoff.is_none() {
                    self.backoff = Some(self.policy.backoff());
                }
                if let Some(delay) = self.backoff.as_mut().and_then(Iterator::next) {
                    debug!(
                        origin = %self.pool.current().endpoint,
                        delay_ms = delay.as_millis() as u64,
                        "scheduling reconnect against current origin"
                    );
                    self.set_state(SessionState::Reconnecting);
                    self.retry_at = Some(Instant::now() + delay);
                    return;
                }
                debug!(
                    origin = %self.pool.current().endpoint,
                    "retry budget exhausted for origin"
                );
            }

            // Current origin is disqualified: fail over.
            self.set_state(SessionState::Failover);
            self.teardown_session().await;
            self.backoff = None;
            self.retry_at = None;
            self.tried_this_pass[self.pool.position()] = true;

            if self.tried_this_pass.iter().all(|tried| *tried) {
                error!(
                    origins = self.pool.len(),
                    "all origins exhausted within one rotation pass"
                );
                self.listeners.dispatch(&TransportEvent::Status(StatusEvent {
                    category: StatusCategory::AllOriginsUnavailable,
                    origin: None,
                }));
                self.begin_rotation_pass();
                self.pool.reset();
                self.set_state(SessionState::Idle);
                return;
            }

            self.rotate();
            match self.try_connect_current().await {
                Ok(()) => return,
                Err(e) => {
                    warn!(
                        origin = %self.pool.current().endpoint,
                        error = %e,
                        "connect attempt failed"
                    );
                    recoverable = e.is_recoverable();
                }
            }
        }
    }

    /// Pick the next origin to try according to the rotation policy.
    fn rotate(&mut self) {
        match self.policy.rotation {
            RotationPolicy::NextInLine => {
                self.pool.advance();
            }
            RotationPolicy::PrimaryFirst => {
                let position = self.pool.position();
                if position > 0 {
                    // remember where the fallback walk stopped, re-probe primary
                    self.resume_from = Some(position);
                    self.pool.reset();
                } else {
                    let next = match self.resume_from {
                        Some(resume) if resume + 1 < self.pool.len() => resume + 1,
                        _ => 1,
                    };
                    while self.pool.position() != next {
                        self.pool.advance();
                    }
                }
            }
        }
    }

    async fn retry_current_origin(&mut self) {
        self.retry_at = None;
        if self.state != SessionState::Reconnecting {
            return;
        }
        debug!(origin = %self.pool.current().endpoint, "retrying current origin");
        self.teardown_session().await;
        if let Err(e) = self.try_connect_current().await {
            self.handle_failure(e.is_recoverable()).await;
        }
    }

    /// Drop the event stream binding, then destroy the client. The order
    /// guarantees no event from a destroyed client reaches listeners after
    /// its destruction is initiated.
    async fn teardown_session(&mut self) {
        if let Some(ActiveSession { client, events }) = self.session.take() {
            drop(events);
            self.client_tx.send_replace(None);
            client.disconnect().await;
            self.factory.destroy(client).await;
        }
    }

    async fn shutdown(&mut self) {
        if self.state == SessionState::ShutDown {
            return;
        }
        info!("session manager shutting down");
        self.retry_at = None;
        self.backoff = None;
        // subscription intent is deliberately kept; only resources go
        self.teardown_session().await;
        self.set_state(SessionState::ShutDown);
    }

    fn begin_rotation_pass(&mut self) {
        self.tried_this_pass.fill(false);
        self.resume_from = None;
    }

    fn current_client(&self) -> Option<Arc<F::Client>> {
        self.session.as_ref().map(|active| active.client.clone())
    }

    fn set_state(&mut self, state: SessionState) {
        self.state = state;
        self.status_tx.send_replace(SessionStatus {
            state,
            origin_index: self.pool.position(),
            origin: self.pool.current().clone(),
        });
    }
}
