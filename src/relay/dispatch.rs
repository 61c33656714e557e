//! Dispatch loop
//!
//! The only code that touches the receiver set once the relay runs. Input,
//! registrations and shutdown are served one at a time, so every message is
//! queued on exactly the lanes registered when it was read, in input order.

use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinSet;
use tokio::time::Instant;

use super::config::RelayConfig;
use super::delivery::{fan_out, Lane};
use super::receiver::Sink;
use crate::stats::RelayMetrics;

/// Request to add a sink to a running relay
pub(crate) struct Registration {
    pub(crate) sink: Sink,
    /// Fired once the sink is part of the collection
    pub(crate) ack: oneshot::Sender<()>,
}

/// State owned by the dispatch task
pub(crate) struct Dispatcher {
    input: mpsc::Receiver<Bytes>,
    registrations: mpsc::Receiver<Registration>,
    shutdown: oneshot::Receiver<()>,
    /// Sinks registered before the loop started
    initial: Vec<Sink>,
    lanes: Vec<Lane>,
    workers: JoinSet<()>,
    config: RelayConfig,
    metrics: Arc<RelayMetrics>,
}

impl Dispatcher {
    pub(crate) fn new(
        input: mpsc::Receiver<Bytes>,
        registrations: mpsc::Receiver<Registration>,
        shutdown: oneshot::Receiver<()>,
        sinks: Vec<Sink>,
        config: RelayConfig,
        metrics: Arc<RelayMetrics>,
    ) -> Self {
        Self {
            input,
            registrations,
            shutdown,
            initial: sinks,
            lanes: Vec::new(),
            workers: JoinSet::new(),
            config,
            metrics,
        }
    }

    /// Run until the shutdown signal fires or its sender is dropped
    pub(crate) async fn run(mut self) {
        for sink in std::mem::take(&mut self.initial) {
            self.add_lane(sink);
        }

        let mut input_open = true;

        loop {
            tokio::select! {
                message = self.input.recv(), if input_open => match message {
                    Some(message) => {
                        self.metrics.message_received();
                        self.prune();
                        let deadline = Instant::now() + self.config.delivery_timeout;
                        fan_out(&self.lanes, message, deadline);
                    }
                    None => {
                        input_open = false;
                        tracing::debug!("Input closed, relay idle until closed");
                    }
                },
                Some(registration) = self.registrations.recv() => {
                    self.register(registration);
                }
                Some(joined) = self.workers.join_next(), if !self.workers.is_empty() => {
                    if let Err(e) = joined {
                        if e.is_panic() {
                            tracing::warn!(error = %e, "Delivery lane panicked");
                        }
                    }
                }
                _ = &mut self.shutdown => break,
            }
        }

        // Stop lane workers so no sender clone outlives the relay
        self.workers.shutdown().await;

        let closed = self.lanes.len();
        self.lanes.clear();
        self.metrics.set_receivers(0);

        tracing::info!(receivers = closed, "Relay closed");
    }

    fn add_lane(&mut self, sink: Sink) {
        let lane = Lane::spawn(sink, &mut self.workers, Arc::clone(&self.metrics));
        self.lanes.push(lane);
        self.metrics.set_receivers(self.lanes.len());
    }

    fn register(&mut self, registration: Registration) {
        let Registration { sink, ack } = registration;
        let id = sink.id();

        self.add_lane(sink);

        tracing::debug!(
            receiver = %id,
            receivers = self.lanes.len(),
            "Receiver registered"
        );

        // Caller may have given up waiting; the lane stays registered and is
        // pruned once its receiver is dropped
        let _ = ack.send(());
    }

    /// Drop lanes whose receiver went away
    fn prune(&mut self) {
        if !self.lanes.iter().any(Lane::is_closed) {
            return;
        }

        self.lanes.retain(|lane| {
            let closed = lane.is_closed();
            if closed {
                tracing::debug!(receiver = %lane.id(), "Receiver dropped, pruning");
            }
            !closed
        });
        self.metrics.set_receivers(self.lanes.len());
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::relay::receiver;

    struct Harness {
        input: mpsc::Sender<Bytes>,
        registrations: mpsc::Sender<Registration>,
        shutdown: oneshot::Sender<()>,
        metrics: Arc<RelayMetrics>,
        task: tokio::task::JoinHandle<()>,
    }

    fn spawn_dispatcher(sinks: Vec<Sink>) -> Harness {
        let (input, input_rx) = mpsc::channel(1);
        let (registrations, registrations_rx) = mpsc::channel(1);
        let (shutdown, shutdown_rx) = oneshot::channel();
        let metrics = Arc::new(RelayMetrics::new());

        let dispatcher = Dispatcher::new(
            input_rx,
            registrations_rx,
            shutdown_rx,
            sinks,
            RelayConfig::default(),
            Arc::clone(&metrics),
        );
        let task = tokio::spawn(dispatcher.run());

        Harness {
            input,
            registrations,
            shutdown,
            metrics,
            task,
        }
    }

    #[tokio::test]
    async fn test_registration_acknowledged() {
        let harness = spawn_dispatcher(Vec::new());
        let (sink, mut rx) = receiver::channel(1);
        let (ack, acked) = oneshot::channel();

        harness
            .registrations
            .send(Registration { sink, ack })
            .await
            .unwrap();
        acked.await.unwrap();
        assert_eq!(harness.metrics.snapshot().receivers, 1);

        harness.input.send(Bytes::from_static(b"after")).await.unwrap();
        assert_eq!(rx.recv().await.unwrap(), "after");

        harness.shutdown.send(()).unwrap();
        harness.task.await.unwrap();
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_prunes_dropped_receivers() {
        let (kept_sink, mut kept) = receiver::channel(1);
        let (gone_sink, gone) = receiver::channel(1);
        let harness = spawn_dispatcher(vec![kept_sink, gone_sink]);
        drop(gone);

        harness.input.send(Bytes::from_static(b"msg")).await.unwrap();
        assert_eq!(kept.recv().await.unwrap(), "msg");
        tokio::time::sleep(Duration::from_millis(10)).await;

        let stats = harness.metrics.snapshot();
        assert_eq!(stats.receivers, 1);
        assert_eq!(stats.disconnected, 0);

        harness.shutdown.send(()).unwrap();
        harness.task.await.unwrap();
    }

    #[tokio::test]
    async fn test_shutdown_sender_dropped_stops_loop() {
        let (sink, mut rx) = receiver::channel(1);
        let harness = spawn_dispatcher(vec![sink]);

        drop(harness.shutdown);
        harness.task.await.unwrap();

        assert!(rx.recv().await.is_none());
        assert_eq!(harness.metrics.snapshot().receivers, 0);
    }
}
