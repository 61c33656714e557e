//! Relay statistics

mod metrics;

pub(crate) use metrics::RelayMetrics;
pub use metrics::RelayStats;
