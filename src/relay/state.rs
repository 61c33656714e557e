//! Relay lifecycle state
//!
//! A relay moves `Created -> Running -> Closed` and never goes back.

use crate::error::{RelayError, Result};

/// Relay lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayState {
    /// Constructed, receivers are stored directly, no dispatch loop yet
    Created,
    /// Dispatch loop is running
    Running,
    /// Dispatch loop has exited and every receiver was closed
    Closed,
}

impl RelayState {
    /// Check if the dispatch loop is running
    pub fn is_running(self) -> bool {
        self == RelayState::Running
    }

    /// Check if the relay reached its terminal state
    pub fn is_closed(self) -> bool {
        self == RelayState::Closed
    }

    /// State after a `start` request
    pub(crate) fn start(self) -> Result<RelayState> {
        match self {
            RelayState::Created => Ok(RelayState::Running),
            RelayState::Running => Err(RelayError::AlreadyStarted),
            RelayState::Closed => Err(RelayError::Closed),
        }
    }

    /// State after a `close` request
    pub(crate) fn close(self) -> Result<RelayState> {
        match self {
            RelayState::Created => Err(RelayError::NotStarted),
            RelayState::Running => Ok(RelayState::Closed),
            RelayState::Closed => Err(RelayError::Closed),
        }
    }
}
