//! Common test utilities: a scripted mock transport and a recording listener.

#![allow(dead_code)]

use std::{
    collections::{BTreeSet, HashMap, VecDeque},
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use bytes::Bytes;
use parking_lot::Mutex;
use robust_session::{
    ClientConfig, EventListener, MessageEvent, Origin, PresenceAction, PresenceEvent,
    SessionManager, SessionState, StatusCategory, StatusEvent, TransportClient, TransportError,
    TransportEvent, TransportFactory,
};
use tokio::sync::broadcast;

/// Upper bound on any single wait in these tests.
pub const WAIT_TIMEOUT: Duration = Duration::from_secs(5);

/// What a mock client does when the supervisor calls `connect`.
#[derive(Clone, Debug)]
pub enum ConnectScript {
    /// Emit `Connected`.
    Succeed,
    /// Emit `Connected`, then the given status (for mid-session failures).
    SucceedThen(StatusCategory),
    /// Emit the given status instead of connecting.
    Fail(StatusCategory),
    /// Return the error from `connect` without emitting anything.
    Error(TransportError),
}

#[derive(Default)]
struct FactoryState {
    scripts: Mutex<HashMap<String, VecDeque<ConnectScript>>>,
    created: AtomicUsize,
    destroyed: AtomicUsize,
    create_order: Mutex<Vec<String>>,
    create_delay: Mutex<Duration>,
}

/// Scripted stand-in for a real transport factory.
///
/// Each `create` for an endpoint pops the next scripted behavior for that
/// endpoint; endpoints with no remaining script connect successfully.
/// Clones share state so tests can keep a handle for assertions.
#[derive(Clone, Default)]
pub struct MockFactory {
    inner: Arc<FactoryState>,
}

impl MockFactory {
    pub fn script<I>(&self, endpoint: &str, scripts: I)
    where
        I: IntoIterator<Item = ConnectScript>,
    {
        self.inner
            .scripts
            .lock()
            .entry(endpoint.to_owned())
            .or_default()
            .extend(scripts);
    }

    pub fn set_create_delay(&self, delay: Duration) {
        *self.inner.create_delay.lock() = delay;
    }

    pub fn created(&self) -> usize {
        self.inner.created.load(Ordering::SeqCst)
    }

    pub fn destroyed(&self) -> usize {
        self.inner.destroyed.load(Ordering::SeqCst)
    }

    pub fn create_order(&self) -> Vec<String> {
        self.inner.create_order.lock().clone()
    }
}

/// Mock client: records subscribe/unsubscribe calls and lets tests inject
/// events into its broadcast stream.
pub struct MockClient {
    pub endpoint: String,
    script: ConnectScript,
    events: Mutex<Option<broadcast::Sender<TransportEvent>>>,
    pub subscribed: Mutex<BTreeSet<String>>,
    pub presence: Mutex<bool>,
    pub subscribe_calls: Mutex<Vec<(Vec<String>, bool)>>,
    pub unsubscribe_calls: Mutex<Vec<(Vec<String>, bool)>>,
}

impl MockClient {
    pub fn emit(&self, event: TransportEvent) {
        if let Some(events) = self.events.lock().as_ref() {
            let _ = events.send(event);
        }
    }

    /// Drop the event stream sender, closing every bound receiver.
    pub fn close_events(&self) {
        self.events.lock().take();
    }

    pub fn emit_status(&self, category: StatusCategory) {
        self.emit(TransportEvent::Status(StatusEvent {
            category,
            origin: Some(self.endpoint.clone()),
        }));
    }

    pub fn emit_message(&self, channel: &str, payload: &[u8]) {
        self.emit(TransportEvent::Message(MessageEvent {
            channel: channel.to_owned(),
            payload: Bytes::copy_from_slice(payload),
        }));
    }

    pub fn emit_presence(&self, channel: &str, participant: &str, action: PresenceAction) {
        self.emit(TransportEvent::Presence(PresenceEvent {
            channel: channel.to_owned(),
            participant: participant.to_owned(),
            action,
        }));
    }

    pub fn subscribed_channels(&self) -> Vec<String> {
        self.subscribed.lock().iter().cloned().collect()
    }
}

impl TransportClient for MockClient {
    async fn connect(&self) -> Result<(), TransportError> {
        match &self.script {
            ConnectScript::Succeed => {
                self.emit_status(StatusCategory::Connected);
                Ok(())
            }
            ConnectScript::SucceedThen(category) => {
                self.emit_status(StatusCategory::Connected);
                self.emit_status(*category);
                Ok(())
            }
            ConnectScript::Fail(category) => {
                self.emit_status(*category);
                Ok(())
            }
            ConnectScript::Error(error) => Err(error.clone()),
        }
    }

    async fn disconnect(&self) {}

    async fn subscribe(&self, channels: &[String], presence: bool) -> Result<(), TransportError> {
        self.subscribed.lock().extend(channels.iter().cloned());
        *self.presence.lock() = presence;
        self.subscribe_calls.lock().push((channels.to_vec(), presence));
        Ok(())
    }

    async fn unsubscribe(&self, channels: &[String], presence: bool) -> Result<(), TransportError> {
        {
            let mut subscribed = self.subscribed.lock();
            for channel in channels {
                subscribed.remove(channel);
            }
        }
        self.unsubscribe_calls.lock().push((channels.to_vec(), presence));
        Ok(())
    }

    fn events(&self) -> broadcast::Receiver<TransportEvent> {
        self.events.lock().as_ref().expect("event stream closed").subscribe()
    }
}

impl TransportFactory for MockFactory {
    type Client = MockClient;

    async fn create(
        &self,
        origin: &Origin,
        config: &ClientConfig,
    ) -> Result<Arc<MockClient>, TransportError> {
        let delay = *self.inner.create_delay.lock();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let script = self
            .inner
            .scripts
            .lock()
            .get_mut(&origin.endpoint)
            .and_then(VecDeque::pop_front)
            .unwrap_or(ConnectScript::Succeed);

        self.inner.created.fetch_add(1, Ordering::SeqCst);
        self.inner.create_order.lock().push(origin.endpoint.clone());

        let (events, _) = broadcast::channel(config.event_buffer_capacity);
        Ok(Arc::new(MockClient {
            endpoint: origin.endpoint.clone(),
            script,
            events: Mutex::new(Some(events)),
            subscribed: Mutex::default(),
            presence: Mutex::new(false),
            subscribe_calls: Mutex::default(),
            unsubscribe_calls: Mutex::default(),
        }))
    }

    async fn destroy(&self, _client: Arc<MockClient>) {
        self.inner.destroyed.fetch_add(1, Ordering::SeqCst);
    }
}

/// Listener that records everything it receives.
#[derive(Default)]
pub struct RecordingListener {
    statuses: Mutex<Vec<StatusEvent>>,
    messages: Mutex<Vec<MessageEvent>>,
    presence: Mutex<Vec<PresenceEvent>>,
}

impl RecordingListener {
    pub fn status_categories(&self) -> Vec<StatusCategory> {
        self.statuses.lock().iter().map(|status| status.category).collect()
    }

    pub fn message_channels(&self) -> Vec<String> {
        self.messages.lock().iter().map(|message| message.channel.clone()).collect()
    }

    pub fn message_payloads(&self) -> Vec<Bytes> {
        self.messages.lock().iter().map(|message| message.payload.clone()).collect()
    }

    pub fn presence_count(&self) -> usize {
        self.presence.lock().len()
    }
}

impl EventListener for RecordingListener {
    fn on_status(&self, status: &StatusEvent) {
        self.statuses.lock().push(status.clone());
    }

    fn on_message(&self, message: &MessageEvent) {
        self.messages.lock().push(message.clone());
    }

    fn on_presence(&self, presence: &PresenceEvent) {
        self.presence.lock().push(presence.clone());
    }
}

/// Wait until the session reaches `state` or the timeout elapses.
pub async fn wait_for_state<F: TransportFactory>(
    manager: &SessionManager<F>,
    state: SessionState,
) -> anyhow::Result<()> {
    let mut status = manager.watch_status();
    tokio::time::timeout(WAIT_TIMEOUT, status.wait_for(|s| s.state == state)).await??;
    Ok(())
}

/// Poll `condition` until it holds or the timeout elapses.
pub async fn wait_until(condition: impl Fn() -> bool) -> anyhow::Result<()> {
    tokio::time::timeout(WAIT_TIMEOUT, async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await?;
    Ok(())
}
