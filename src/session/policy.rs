//! Failover policy: retry budget, backoff curve, and rotation order.
//!
//! These are policy knobs, not constants: which status codes count as
//! fatal is owned by the transport (it pre-classifies statuses), but how
//! patient the session is with a flapping origin and where it goes after a
//! fallback fails are decided here.

use std::time::Duration;

use backon::{BackoffBuilder, ExponentialBackoff, ExponentialBuilder};

/// Default number of in-place reconnect attempts per origin before failover.
pub const DEFAULT_RETRY_BUDGET: usize = 5;

/// Default base delay between reconnect attempts.
pub const DEFAULT_MIN_DELAY: Duration = Duration::from_secs(1);

/// Default cap on the exponential backoff delay.
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(30);

/// Where the session goes after the current origin is disqualified.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RotationPolicy {
    /// Advance to the next origin in pool order, wrapping after the last.
    #[default]
    NextInLine,
    /// After a fallback fails, probe the primary again before moving on to
    /// the fallback after the one that last failed.
    PrimaryFirst,
}

/// Tunable failover behavior for a session manager.
#[derive(Clone, Debug)]
pub struct FailoverPolicy {
    /// Reconnect attempts against one origin before failing over.
    pub retry_budget: usize,
    /// Base delay of the exponential backoff between reconnect attempts.
    pub min_delay: Duration,
    /// Upper bound on the backoff delay.
    pub max_delay: Duration,
    /// Rotation order after a disqualifying failure.
    pub rotation: RotationPolicy,
}

impl Default for FailoverPolicy {
    fn default() -> Self {
        Self {
            retry_budget: DEFAULT_RETRY_BUDGET,
            min_delay: DEFAULT_MIN_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
            rotation: RotationPolicy::default(),
        }
    }
}

impl FailoverPolicy {
    /// Build the delay sequence for one origin's retry run.
    ///
    /// The iterator yields at most `retry_budget` delays; exhaustion of the
    /// iterator is exhaustion of the origin's budget.
    pub(crate) fn backoff(&self) -> ExponentialBackoff {
        ExponentialBuilder::default()
            .with_min_delay(self.min_delay)
            .with_max_delay(self.max_delay)
            .with_max_times(self.retry_budget)
            .build()
    }
}
