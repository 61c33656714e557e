//! Receiver handles and their relay-owned sinks

use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;
use tokio::sync::mpsc;

/// Unique identifier for a receiver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ReceiverId(u64);

static NEXT_RECEIVER_ID: AtomicU64 = AtomicU64::new(1);

impl ReceiverId {
    fn next() -> Self {
        Self(NEXT_RECEIVER_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw id value
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for ReceiverId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "rx-{}", self.0)
    }
}

/// Consumer side of a relay output
///
/// Drain it at any pace. Messages that cannot be buffered within the relay's
/// delivery timeout are dropped for this receiver only. `recv` returns `None`
/// once the relay is closed and the buffer is drained.
#[derive(Debug)]
pub struct Receiver {
    id: ReceiverId,
    rx: mpsc::Receiver<Bytes>,
}

impl Receiver {
    /// Get the receiver ID
    pub fn id(&self) -> ReceiverId {
        self.id
    }

    /// Receive the next message, or `None` at end-of-stream
    pub async fn recv(&mut self) -> Option<Bytes> {
        self.rx.recv().await
    }

    /// Try to receive a message without waiting
    pub fn try_recv(&mut self) -> Result<Bytes, mpsc::error::TryRecvError> {
        self.rx.try_recv()
    }

    /// Unwrap into the underlying channel receiver
    pub fn into_inner(self) -> mpsc::Receiver<Bytes> {
        self.rx
    }
}

/// Relay side of a receiver's channel
#[derive(Debug, Clone)]
pub(crate) struct Sink {
    id: ReceiverId,
    tx: mpsc::Sender<Bytes>,
}

impl Sink {
    pub(crate) fn id(&self) -> ReceiverId {
        self.id
    }

    pub(crate) fn sender(&self) -> &mpsc::Sender<Bytes> {
        &self.tx
    }

    /// True once the consumer dropped its [`Receiver`]
    pub(crate) fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Create a connected sink/receiver pair with `capacity` buffer slots
pub(crate) fn channel(capacity: usize) -> (Sink, Receiver) {
    let id = ReceiverId::next();
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (Sink { id, tx }, Receiver { id, rx })
}
