//! Relay configuration

use std::time::Duration;

/// Default bound on a single delivery attempt
pub const DEFAULT_DELIVERY_TIMEOUT: Duration = Duration::from_millis(5);

/// Default number of undelivered messages a receiver may hold
pub const DEFAULT_RECEIVER_CAPACITY: usize = 1;

/// Default depth of the registration request channel
pub const DEFAULT_REGISTRATION_CAPACITY: usize = 1;

/// Relay configuration options
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// How long a delivery waits on a full receiver before the message is
    /// dropped for that receiver
    pub delivery_timeout: Duration,

    /// Buffer slots per receiver (at least 1)
    pub receiver_capacity: usize,

    /// Pending registration requests queued for the dispatch loop (at least 1)
    pub registration_capacity: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            delivery_timeout: DEFAULT_DELIVERY_TIMEOUT,
            receiver_capacity: DEFAULT_RECEIVER_CAPACITY,
            registration_capacity: DEFAULT_REGISTRATION_CAPACITY,
        }
    }
}

impl RelayConfig {
    /// Create a config with a custom delivery timeout
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            delivery_timeout: timeout,
            ..Default::default()
        }
    }

    /// Set the delivery timeout
    pub fn delivery_timeout(mut self, timeout: Duration) -> Self {
        self.delivery_timeout = timeout;
        self
    }

    /// Set the per-receiver buffer capacity
    pub fn receiver_capacity(mut self, capacity: usize) -> Self {
        self.receiver_capacity = capacity.max(1);
        self
    }

    /// Set the registration channel capacity
    pub fn registration_capacity(mut self, capacity: usize) -> Self {
        self.registration_capacity = capacity.max(1);
        self
    }
}
