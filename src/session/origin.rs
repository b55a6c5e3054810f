//! Origins and the rotation pool.

use std::time::Duration;

/// Per-origin overrides applied on top of the base [`ClientConfig`] when a
/// transport client is created for that origin.
///
/// [`ClientConfig`]: super::transport::ClientConfig
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OriginOverrides {
    /// Auth token to use against this origin instead of the base one.
    pub auth_token: Option<String>,
    /// Connect timeout for this origin instead of the base one.
    pub connect_timeout: Option<Duration>,
}

/// A network endpoint a transport client can connect to for pub/sub service.
///
/// Immutable once placed in the pool.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Origin {
    /// Opaque endpoint identifier, passed through to the transport factory.
    pub endpoint: String,
    /// Configuration overrides for clients bound to this origin.
    pub overrides: OriginOverrides,
}

impl Origin {
    /// Create an origin with no configuration overrides.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self { endpoint: endpoint.into(), overrides: OriginOverrides::default() }
    }

    /// Create an origin with per-origin configuration overrides.
    pub fn with_overrides(endpoint: impl Into<String>, overrides: OriginOverrides) -> Self {
        Self { endpoint: endpoint.into(), overrides }
    }
}

/// Ordered, immutable-after-construction list of candidate origins.
///
/// The primary origin sits at index 0, fallbacks after it in the order they
/// were added. Rotation is purely positional: [`advance`](Self::advance)
/// wraps back to the primary after the last fallback and no entry is ever
/// removed, so origins that recover later get retried on the next pass.
#[derive(Debug)]
pub struct OriginPool {
    origins: Vec<Origin>,
    index: usize,
}

impl OriginPool {
    /// Build a pool from the primary origin and an ordered list of fallbacks.
    pub fn new(primary: Origin, fallbacks: Vec<Origin>) -> Self {
        let mut origins = Vec::with_capacity(1 + fallbacks.len());
        origins.push(primary);
        origins.extend(fallbacks);
        Self { origins, index: 0 }
    }

    /// The origin the pool currently points at.
    pub fn current(&self) -> &Origin {
        &self.origins[self.index]
    }

    /// Move to the next origin, wrapping to the primary after the last one.
    pub fn advance(&mut self) -> &Origin {
        self.index = (self.index + 1) % self.origins.len();
        self.current()
    }

    /// Return to the primary origin.
    pub fn reset(&mut self) -> &Origin {
        self.index = 0;
        self.current()
    }

    /// Number of origins in the pool (primary included). Always at least 1.
    pub fn len(&self) -> usize {
        self.origins.len()
    }

    /// The pool can never be empty; kept for API completeness.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Index of the current origin. 0 is the primary.
    pub fn position(&self) -> usize {
        self.index
    }

    /// True while the pool points at the primary origin.
    pub fn is_primary(&self) -> bool {
        self.index == 0
    }
}
