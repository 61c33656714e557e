//! Statistics and metrics for a relay

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Point-in-time relay statistics
#[derive(Debug, Clone, Default)]
pub struct RelayStats {
    /// Messages read from the input
    pub messages_received: u64,
    /// Deliveries that reached a receiver's buffer
    pub delivered: u64,
    /// Deliveries abandoned after the delivery timeout
    pub timed_out: u64,
    /// Deliveries to receivers whose handle was already dropped
    pub disconnected: u64,
    /// Receivers currently registered
    pub receivers: u64,
    /// Time since the relay was created
    pub uptime: Duration,
}

impl RelayStats {
    /// Fraction of delivery attempts that did not reach the receiver
    pub fn drop_rate(&self) -> f64 {
        let attempts = self.delivered + self.timed_out + self.disconnected;
        if attempts > 0 {
            (self.timed_out + self.disconnected) as f64 / attempts as f64
        } else {
            0.0
        }
    }
}

/// Shared counters updated by the dispatch loop and delivery tasks
#[derive(Debug)]
pub(crate) struct RelayMetrics {
    created_at: Instant,
    messages_received: AtomicU64,
    delivered: AtomicU64,
    timed_out: AtomicU64,
    disconnected: AtomicU64,
    receivers: AtomicU64,
}

impl RelayMetrics {
    pub(crate) fn new() -> Self {
        Self {
            created_at: Instant::now(),
            messages_received: AtomicU64::new(0),
            delivered: AtomicU64::new(0),
            timed_out: AtomicU64::new(0),
            disconnected: AtomicU64::new(0),
            receivers: AtomicU64::new(0),
        }
    }

    pub(crate) fn message_received(&self) {
        self.messages_received.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn delivered(&self) {
        self.delivered.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn timed_out(&self) {
        self.timed_out.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn disconnected(&self) {
        self.disconnected.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn set_receivers(&self, count: usize) {
        self.receivers.store(count as u64, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> RelayStats {
        RelayStats {
            messages_received: self.messages_received.load(Ordering::Relaxed),
            delivered: self.delivered.load(Ordering::Relaxed),
            timed_out: self.timed_out.load(Ordering::Relaxed),
            disconnected: self.disconnected.load(Ordering::Relaxed),
            receivers: self.receivers.load(Ordering::Relaxed),
            uptime: self.created_at.elapsed(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relay_stats_default() {
        let stats = RelayStats::default();
        assert_eq!(stats.messages_received, 0);
        assert_eq!(stats.delivered, 0);
        assert_eq!(stats.timed_out, 0);
        assert_eq!(stats.disconnected, 0);
        assert_eq!(stats.receivers, 0);
    }

    #[test]
    fn test_drop_rate_no_attempts() {
        let stats = RelayStats::default();

        assert_eq!(stats.drop_rate(), 0.0);
    }

    #[test]
    fn test_drop_rate() {
        let stats = RelayStats {
            delivered: 6,
            timed_out: 3,
            disconnected: 1,
            ..Default::default()
        };

        // 4 failed out of 10 attempts
        assert!((stats.drop_rate() - 0.4).abs() < f64::EPSILON);
    }

    #[test]
    fn test_metrics_snapshot() {
        let metrics = RelayMetrics::new();
        metrics.message_received();
        metrics.message_received();
        metrics.delivered();
        metrics.timed_out();
        metrics.disconnected();
        metrics.set_receivers(3);

        let stats = metrics.snapshot();
        assert_eq!(stats.messages_received, 2);
        assert_eq!(stats.delivered, 1);
        assert_eq!(stats.timed_out, 1);
        assert_eq!(stats.disconnected, 1);
        assert_eq!(stats.receivers, 3);
    }
}
