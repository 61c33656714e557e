//! Relay lifecycle and registration
//!
//! `Relay` is the owner handle. Before `start` it keeps the sink list itself;
//! afterwards the list moves into the dispatch task and every change goes
//! through a registration request.

use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use super::config::RelayConfig;
use super::dispatch::{Dispatcher, Registration};
use super::receiver::{self, Receiver, Sink};
use super::state::RelayState;
use crate::error::{RelayError, Result};
use crate::stats::{RelayMetrics, RelayStats};

/// Channels into a running dispatch loop
struct Control {
    registrations: mpsc::Sender<Registration>,
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

/// Broadcast relay from one input channel to many receivers
///
/// Every message read from the input is copied to every receiver registered
/// at the time it is read. A delivery that cannot complete within
/// [`RelayConfig::delivery_timeout`] is dropped for that receiver only.
///
/// Dropping a running relay stops the dispatch loop the same way
/// [`close`](Relay::close) does, without waiting for it.
pub struct Relay {
    config: RelayConfig,
    state: RelayState,
    metrics: Arc<RelayMetrics>,

    /// Input, until `start` hands it to the dispatch loop
    input: Option<mpsc::Receiver<Bytes>>,

    /// Sinks registered before `start`
    pending: Vec<Sink>,

    control: Option<Control>,
}

impl Relay {
    /// Create a relay over `input` with default configuration
    pub fn new(input: mpsc::Receiver<Bytes>) -> Self {
        Self::with_config(input, RelayConfig::default())
    }

    /// Create a relay over `input` with custom configuration
    pub fn with_config(input: mpsc::Receiver<Bytes>, config: RelayConfig) -> Self {
        Self {
            config,
            state: RelayState::Created,
            metrics: Arc::new(RelayMetrics::new()),
            input: Some(input),
            pending: Vec::new(),
            control: None,
        }
    }

    /// Get the relay configuration
    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    /// Get the lifecycle state
    pub fn state(&self) -> RelayState {
        self.state
    }

    /// Check if the dispatch loop is running
    pub fn is_running(&self) -> bool {
        self.state.is_running()
    }

    /// Get a snapshot of relay statistics
    pub fn stats(&self) -> RelayStats {
        self.metrics.snapshot()
    }

    /// Register a new receiver
    ///
    /// While running this waits until the dispatch loop has added the
    /// receiver, so every message read after this returns reaches it.
    pub async fn add_receiver(&mut self) -> Result<Receiver> {
        let (sink, receiver) = receiver::channel(self.config.receiver_capacity);

        match self.state {
            RelayState::Created => {
                self.pending.retain(|pending| !pending.is_closed());
                self.pending.push(sink);
                self.metrics.set_receivers(self.pending.len());
            }
            RelayState::Running => {
                let control = self.control.as_ref().ok_or(RelayError::DispatchLost)?;
                let (ack, acked) = oneshot::channel();

                control
                    .registrations
                    .send(Registration { sink, ack })
                    .await
                    .map_err(|_| RelayError::DispatchLost)?;
                acked.await.map_err(|_| RelayError::DispatchLost)?;
            }
            RelayState::Closed => return Err(RelayError::Closed),
        }

        tracing::debug!(receiver = %receiver.id(), state = ?self.state, "Receiver added");

        Ok(receiver)
    }

    /// Start the dispatch loop
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&mut self) -> Result<()> {
        let next = self.state.start()?;
        let input = self.input.take().ok_or(RelayError::AlreadyStarted)?;

        let (registrations, registrations_rx) =
            mpsc::channel(self.config.registration_capacity.max(1));
        let (shutdown, shutdown_rx) = oneshot::channel();
        let sinks = std::mem::take(&mut self.pending);
        let receivers = sinks.len();

        let dispatcher = Dispatcher::new(
            input,
            registrations_rx,
            shutdown_rx,
            sinks,
            self.config.clone(),
            Arc::clone(&self.metrics),
        );
        let task = tokio::spawn(dispatcher.run());

        self.control = Some(Control {
            registrations,
            shutdown,
            task,
        });
        self.state = next;

        tracing::info!(
            receivers = receivers,
            delivery_timeout_ms = self.config.delivery_timeout.as_millis() as u64,
            "Relay started"
        );

        Ok(())
    }

    /// Stop the dispatch loop and close every receiver
    ///
    /// Returns once the loop has exited. Receivers still yield messages
    /// already in their buffers, then end-of-stream.
    pub async fn close(&mut self) -> Result<()> {
        let next = self.state.close()?;
        let control = self.control.take().ok_or(RelayError::NotStarted)?;
        self.state = next;

        if control.shutdown.send(()).is_err() {
            tracing::trace!("Dispatch loop already exited before shutdown signal");
        }
        drop(control.registrations);

        control.task.await.map_err(|e| {
            tracing::warn!(error = %e, "Dispatch loop failed");
            RelayError::DispatchLost
        })
    }
}

impl std::fmt::Debug for Relay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Relay")
            .field("state", &self.state)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
