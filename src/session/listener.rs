//! Listener registration that survives connection swaps.
//!
//! Callers register listeners once; the supervisor owns the single binding
//! to the live client's event stream and funnels every event through
//! [`ListenerSet::dispatch`]. Swapping the underlying client therefore never
//! requires a re-registration call, and no event from a destroyed client is
//! dispatched after its destruction is initiated (the supervisor drops its
//! stream binding first).

use std::sync::Arc;

use parking_lot::RwLock;

use super::transport::{MessageEvent, PresenceEvent, StatusEvent, TransportEvent};

/// Capability set for external observers of the session.
///
/// All methods default to no-ops so implementors only override what they
/// care about.
pub trait EventListener: Send + Sync + 'static {
    /// Connection status changed (includes manager-synthesized statuses).
    fn on_status(&self, _status: &StatusEvent) {}

    /// An application message arrived on a subscribed channel.
    fn on_message(&self, _message: &MessageEvent) {}

    /// Participant activity on a presence-enabled channel.
    fn on_presence(&self, _presence: &PresenceEvent) {}
}

/// Handle identifying a registered listener.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

#[derive(Default)]
struct Registry {
    next_id: u64,
    listeners: Vec<(ListenerId, Arc<dyn EventListener>)>,
}

/// The set of caller-registered listeners, independent of session lifetime.
#[derive(Default)]
pub(crate) struct ListenerSet {
    registry: RwLock<Registry>,
}

impl ListenerSet {
    /// Register a listener. Safe in any connection state.
    pub fn add(&self, listener: Arc<dyn EventListener>) -> ListenerId {
        let mut registry = self.registry.write();
        let id = ListenerId(registry.next_id);
        registry.next_id += 1;
        registry.listeners.push((id, listener));
        id
    }

    /// Deregister a listener. Returns `false` if the id was unknown.
    pub fn remove(&self, id: ListenerId) -> bool {
        let mut registry = self.registry.write();
        let before = registry.listeners.len();
        registry.listeners.retain(|(lid, _)| *lid != id);
        registry.listeners.len() != before
    }

    /// Fan one event out to every registered listener, in registration order.
    ///
    /// Callbacks may re-enter [`add`](Self::add) or [`remove`](Self::remove)
    /// (self-removal is a normal pattern), so the lock is never held while a
    /// callback runs; the fan-out operates on a snapshot of the registry.
    pub fn dispatch(&self, event: &TransportEvent) {
        let listeners: Vec<Arc<dyn EventListener>> = self
            .registry
            .read()
            .listeners
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect();
        for listener in listeners {
            match event {
                TransportEvent::Status(status) => listener.on_status(status),
                TransportEvent::Message(message) => listener.on_message(message),
                TransportEvent::Presence(presence) => listener.on_presence(presence),
            }
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.registry.read().listeners.len()
    }
}
