//! Builder for constructing a [`SessionManager`].

use std::{sync::Arc, time::Duration};

use tokio::sync::{mpsc, watch};

use super::{
    listener::ListenerSet,
    manager::SessionManager,
    origin::{Origin, OriginPool},
    policy::{FailoverPolicy, RotationPolicy},
    supervisor::{SessionState, SessionStatus, Supervisor},
    transport::{ClientConfig, TransportFactory},
};

/// Default depth of the supervisor's command queue.
pub const DEFAULT_COMMAND_QUEUE_CAPACITY: usize = 64;

/// Builder for a [`SessionManager`].
///
/// Use this to configure the origin pool, the base client configuration,
/// and the failover policy.
pub struct SessionManagerBuilder<F: TransportFactory> {
    factory: F,
    primary: Origin,
    fallbacks: Vec<Origin>,
    base_config: ClientConfig,
    policy: FailoverPolicy,
    command_queue_capacity: usize,
}

impl<F: TransportFactory> SessionManagerBuilder<F> {
    /// Start a builder with the transport factory and the primary origin.
    #[must_use]
    pub fn new(factory: F, primary: Origin) -> Self {
        Self {
            factory,
            primary,
            fallbacks: Vec::new(),
            base_config: ClientConfig::default(),
            policy: FailoverPolicy::default(),
            command_queue_capacity: DEFAULT_COMMAND_QUEUE_CAPACITY,
        }
    }

    /// Append a fallback origin to the pool.
    ///
    /// Fallbacks are tried in the order they were added. Duplicate origins
    /// are permitted but rarely useful.
    #[must_use]
    pub fn fallback(mut self, origin: Origin) -> Self {
        self.fallbacks.push(origin);
        self
    }

    /// Set the base client configuration merged with per-origin overrides.
    #[must_use]
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.base_config = config;
        self
    }

    /// Set the number of in-place reconnect attempts per origin.
    #[must_use]
    pub fn retry_budget(mut self, retry_budget: usize) -> Self {
        self.policy.retry_budget = retry_budget;
        self
    }

    /// Set the base delay of the reconnect backoff.
    #[must_use]
    pub fn min_delay(mut self, min_delay: Duration) -> Self {
        self.policy.min_delay = min_delay;
        self
    }

    /// Set the cap on the reconnect backoff delay.
    #[must_use]
    pub fn max_delay(mut self, max_delay: Duration) -> Self {
        self.policy.max_delay = max_delay;
        self
    }

    /// Set the rotation order used after an origin is disqualified.
    #[must_use]
    pub fn rotation(mut self, rotation: RotationPolicy) -> Self {
        self.policy.rotation = rotation;
        self
    }

    /// Replace the whole failover policy at once.
    #[must_use]
    pub fn policy(mut self, policy: FailoverPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Set the depth of the supervisor's command queue.
    #[must_use]
    pub fn command_queue_capacity(mut self, capacity: usize) -> Self {
        self.command_queue_capacity = capacity.max(1);
        self
    }

    /// Build the manager and spawn its supervisor task.
    ///
    /// Must be called from within a tokio runtime. The session starts in
    /// [`SessionState::Idle`]; call [`SessionManager::connect`] to bring it
    /// up.
    #[must_use]
    pub fn build(self) -> SessionManager<F> {
        debug!(
            fallback_count = self.fallbacks.len(),
            retry_budget = self.policy.retry_budget,
            rotation = ?self.policy.rotation,
            "building SessionManager"
        );

        let pool = OriginPool::new(self.primary.clone(), self.fallbacks);
        let listeners = Arc::new(ListenerSet::default());

        let (command_tx, command_rx) = mpsc::channel(self.command_queue_capacity);
        let (client_tx, client_rx) = watch::channel(None);
        let (status_tx, status_rx) = watch::channel(SessionStatus {
            state: SessionState::Idle,
            origin_index: 0,
            origin: self.primary,
        });

        let supervisor = Supervisor::new(
            Arc::new(self.factory),
            pool,
            self.base_config,
            self.policy,
            listeners.clone(),
            command_rx,
            client_tx,
            status_tx,
        );
        tokio::spawn(supervisor.run());

        info!("SessionManager initialized");

        SessionManager::new(command_tx, listeners, client_rx, status_rx)
    }
}
