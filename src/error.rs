//! Relay error types

use thiserror::Error;

/// Errors reported by [`Relay`](crate::Relay) lifecycle operations
///
/// Slow or stalled receivers never produce an error; their deliveries are
/// dropped silently and only show up in [`RelayStats`](crate::RelayStats).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RelayError {
    /// `start` called on a relay that is already running
    #[error("relay is already running")]
    AlreadyStarted,

    /// `close` called on a relay that was never started
    #[error("relay was never started")]
    NotStarted,

    /// Operation on a relay that has been closed
    #[error("relay is closed")]
    Closed,

    /// The dispatch loop went away without answering a request
    #[error("dispatch loop terminated unexpectedly")]
    DispatchLost,
}

/// Result alias for relay operations
pub type Result<T> = std::result::Result<T, RelayError>;
