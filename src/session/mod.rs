pub mod builder;
pub mod errors;
pub mod intent;
pub mod listener;
pub mod manager;
pub mod origin;
pub mod policy;
pub mod supervisor;
pub mod transport;

pub use builder::{DEFAULT_COMMAND_QUEUE_CAPACITY, SessionManagerBuilder};
pub use errors::TransportError;
pub use intent::{IntentSnapshot, SubscriptionIntent};
pub use listener::{EventListener, ListenerId};
pub use manager::SessionManager;
pub use origin::{Origin, OriginOverrides, OriginPool};
pub use policy::{
    DEFAULT_MAX_DELAY, DEFAULT_MIN_DELAY, DEFAULT_RETRY_BUDGET, FailoverPolicy, RotationPolicy,
};
pub use supervisor::{SessionState, SessionStatus};
pub use transport::{
    ClientConfig, DEFAULT_EVENT_BUFFER_CAPACITY, MessageEvent, PresenceAction, PresenceEvent,
    StatusCategory, StatusEvent, TransportClient, TransportEvent, TransportFactory,
};
