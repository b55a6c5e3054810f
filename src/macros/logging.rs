//! Internal logging macros that wrap `tracing` when the feature is enabled.
//!
//! When the `tracing` feature is disabled, all logging calls compile to
//! no-ops, so users who don't need observability pay nothing at runtime.

#[allow(unused_macros)]
macro_rules! error {
    ($($arg:tt)*) => {
        #[cfg(feature = "tracing")]
        tracing::error!(target: "robust_session", $($arg)*)
    };
}

#[allow(unused_macros)]
macro_rules! warn {
    ($($arg:tt)*) => {
        #[cfg(feature = "tracing")]
        tracing::warn!(target: "robust_session", $($arg)*)
    };
}

#[allow(unused_macros)]
macro_rules! info {
    ($($arg:tt)*) => {
        #[cfg(feature = "tracing")]
        tracing::info!(target: "robust_session", $($arg)*)
    };
}

#[allow(unused_macros)]
macro_rules! debug {
    ($($arg:tt)*) => {
        #[cfg(feature = "tracing")]
        tracing::debug!(target: "robust_session", $($arg)*)
    };
}

#[allow(unused_macros)]
macro_rules! trace {
    ($($arg:tt)*) => {
        #[cfg(feature = "tracing")]
        tracing::trace!(target: "robust_session", $($arg)*)
    };
}
