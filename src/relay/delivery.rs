//! Per-receiver delivery lanes
//!
//! Every registered receiver gets one lane: an ordered queue fed by the
//! dispatch loop and a worker task that pushes queued messages into the
//! receiver's buffer one at a time. Messages for one receiver therefore arrive
//! in input order, and a stalled receiver only backs up its own lane.
//!
//! Each queued message carries a deadline set when the dispatch loop read it.
//! A message still waiting for buffer space at its deadline is dropped for that
//! receiver; the pending send is cancelled, so it can never arrive later.

use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinSet;
use tokio::time::Instant;

use super::receiver::{ReceiverId, Sink};
use crate::stats::RelayMetrics;

/// Outcome of one delivery attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Delivery {
    /// Message is in the receiver's buffer
    Delivered,
    /// Buffer stayed full until the deadline; message dropped
    TimedOut,
    /// Receiver handle was dropped
    Disconnected,
}

/// A message waiting in a lane
#[derive(Debug)]
pub(crate) struct Queued {
    message: Bytes,
    deadline: Instant,
}

/// Dispatch-loop side of a receiver's delivery lane
#[derive(Debug)]
pub(crate) struct Lane {
    id: ReceiverId,
    queue: mpsc::UnboundedSender<Queued>,
    out: mpsc::Sender<Bytes>,
}

impl Lane {
    /// Start the worker for `sink` on `workers` and return its lane
    pub(crate) fn spawn(sink: Sink, workers: &mut JoinSet<()>, metrics: Arc<RelayMetrics>) -> Self {
        let (queue, pending) = mpsc::unbounded_channel();
        let id = sink.id();
        let out = sink.sender().clone();

        workers.spawn(run_lane(sink, pending, metrics));

        Self { id, queue, out }
    }

    pub(crate) fn id(&self) -> ReceiverId {
        self.id
    }

    /// True once the receiver was dropped or the worker stopped
    pub(crate) fn is_closed(&self) -> bool {
        self.out.is_closed() || self.queue.is_closed()
    }

    /// Queue `message` behind everything already queued for this receiver
    pub(crate) fn enqueue(&self, message: Bytes, deadline: Instant) {
        // Worker gone means the receiver is gone; the lane is pruned later
        let _ = self.queue.send(Queued { message, deadline });
    }
}

/// Queue `message` on every lane, in lane order
///
/// Never waits: the actual sends happen on the lane workers.
pub(crate) fn fan_out(lanes: &[Lane], message: Bytes, deadline: Instant) {
    for lane in lanes {
        lane.enqueue(message.clone(), deadline);
    }
}

/// Hand one message to one sink, giving up at `deadline`
///
/// The send is cancelled when the deadline wins, so a dropped message can
/// never show up later behind newer ones.
pub(crate) async fn deliver(sink: &Sink, message: Bytes, deadline: Instant) -> Delivery {
    let message = match sink.sender().try_send(message) {
        Ok(()) => return Delivery::Delivered,
        Err(TrySendError::Closed(_)) => return Delivery::Disconnected,
        Err(TrySendError::Full(message)) => message,
    };

    match tokio::time::timeout_at(deadline, sink.sender().send(message)).await {
        Ok(Ok(())) => Delivery::Delivered,
        Ok(Err(_)) => Delivery::Disconnected,
        Err(_) => Delivery::TimedOut,
    }
}

/// Lane worker: deliver queued messages strictly in order
async fn run_lane(sink: Sink, mut pending: mpsc::UnboundedReceiver<Queued>, metrics: Arc<RelayMetrics>) {
    while let Some(Queued { message, deadline }) = pending.recv().await {
        match deliver(&sink, message, deadline).await {
            Delivery::Delivered => metrics.delivered(),
            Delivery::TimedOut => {
                metrics.timed_out();
                tracing::debug!(receiver = %sink.id(), "Delivery timed out, message dropped");
            }
            Delivery::Disconnected => {
                metrics.disconnected();
                tracing::trace!(receiver = %sink.id(), "Receiver gone, stopping lane");
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::relay::receiver;

    fn deadline_in(ms: u64) -> Instant {
        Instant::now() + Duration::from_millis(ms)
    }

    #[tokio::test]
    async fn test_deliver_to_empty_slot() {
        let (sink, mut rx) = receiver::channel(1);

        let outcome = deliver(&sink, Bytes::from_static(b"hello"), deadline_in(5)).await;

        assert_eq!(outcome, Delivery::Delivered);
        assert_eq!(rx.recv().await.unwrap(), "hello");
    }

    #[tokio::test(start_paused = true)]
    async fn test_deliver_times_out_on_full_slot() {
        let (sink, mut rx) = receiver::channel(1);
        sink.sender().try_send(Bytes::from_static(b"first")).unwrap();

        let outcome = deliver(&sink, Bytes::from_static(b"second"), deadline_in(5)).await;
        assert_eq!(outcome, Delivery::TimedOut);

        // The abandoned send was cancelled, not left pending
        assert_eq!(rx.recv().await.unwrap(), "first");
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_deliver_to_dropped_receiver() {
        let (sink, rx) = receiver::channel(1);
        drop(rx);

        let outcome = deliver(&sink, Bytes::from_static(b"x"), deadline_in(5)).await;

        assert_eq!(outcome, Delivery::Disconnected);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_lane_keeps_input_order() {
        let metrics = Arc::new(RelayMetrics::new());
        let mut workers = JoinSet::new();
        let (sink, mut rx) = receiver::channel(1);
        let lane = Lane::spawn(sink, &mut workers, Arc::clone(&metrics));

        let deadline = deadline_in(10_000);
        for i in 0u32..1000 {
            lane.enqueue(Bytes::copy_from_slice(&i.to_be_bytes()), deadline);
        }

        for i in 0u32..1000 {
            let message = rx.recv().await.unwrap();
            assert_eq!(message.as_ref(), &i.to_be_bytes());
        }
        assert_eq!(metrics.snapshot().timed_out, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fan_out_isolates_full_receiver() {
        let metrics = Arc::new(RelayMetrics::new());
        let mut workers = JoinSet::new();
        let (fast_sink, mut fast) = receiver::channel(1);
        let (stuck_sink, _stuck) = receiver::channel(1);
        stuck_sink.sender().try_send(Bytes::from_static(b"backlog")).unwrap();

        let lanes = vec![
            Lane::spawn(fast_sink, &mut workers, Arc::clone(&metrics)),
            Lane::spawn(stuck_sink, &mut workers, Arc::clone(&metrics)),
        ];
        fan_out(&lanes, Bytes::from_static(b"payload"), deadline_in(5));

        assert_eq!(fast.recv().await.unwrap(), "payload");
        tokio::time::sleep(Duration::from_millis(10)).await;

        let stats = metrics.snapshot();
        assert_eq!(stats.delivered, 1);
        assert_eq!(stats.timed_out, 1);
    }

    #[tokio::test]
    async fn test_lane_closed_when_receiver_dropped() {
        let metrics = Arc::new(RelayMetrics::new());
        let mut workers = JoinSet::new();
        let (sink, rx) = receiver::channel(1);
        let lane = Lane::spawn(sink, &mut workers, metrics);
        assert!(!lane.is_closed());

        drop(rx);
        assert!(lane.is_closed());
    }

    #[tokio::test]
    async fn test_fan_out_no_lanes() {
        fan_out(&[], Bytes::from_static(b"nobody"), deadline_in(5));
    }
}
