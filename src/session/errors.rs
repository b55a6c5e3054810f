//! Error types and recoverability classification for transport failures.
//!
//! Subscribe/unsubscribe on the manager façade are intent-recording and
//! always logically succeed, so no error type leaks through them; failure
//! information flows outward via the listener status channel. The one error
//! type that crosses the boundary is [`TransportError`], returned by
//! transport implementations from connect/subscribe/unsubscribe and by the
//! factory from client creation.

use thiserror::Error;
use tokio::time::error::Elapsed;

/// Failure reported by a transport implementation.
///
/// The supervisor only cares about one property of these:
/// [`is_recoverable`](TransportError::is_recoverable). Recoverable failures
/// are retried in place against the same origin up to the configured budget;
/// fatal ones trigger an immediate failover to the next origin.
#[derive(Error, Debug, Clone)]
pub enum TransportError {
    /// The operation exceeded the transport's timeout.
    #[error("operation timed out")]
    Timeout,

    /// The origin could not be reached at all (DNS, TLS, connection refused).
    #[error("origin unreachable: {0}")]
    Unreachable(String),

    /// The origin rejected the client's credentials.
    #[error("access denied by origin")]
    AccessDenied,

    /// Any other transport-level failure.
    #[error("transport failure: {0}")]
    Other(String),
}

impl TransportError {
    /// Returns `true` if the error should be retried against the same origin.
    ///
    /// Unreachable and access-denied failures are origin-level problems that
    /// retrying cannot fix; unknown failures default to retryable, the same
    /// stance pub/sub clients take for unclassified status codes.
    pub fn is_recoverable(&self) -> bool {
        match self {
            TransportError::Timeout | TransportError::Other(_) => true,
            TransportError::Unreachable(_) | TransportError::AccessDenied => false,
        }
    }
}

impl From<Elapsed> for TransportError {
    fn from(_: Elapsed) -> Self {
        TransportError::Timeout
    }
}
