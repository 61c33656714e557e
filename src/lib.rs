//! fanout-relay: single-input, multi-output broadcast relay
//!
//! One producer feeds byte messages into a [`Relay`] and every registered
//! [`Receiver`] gets its own copy of each message. A receiver that stops
//! draining only loses messages itself: each delivery gives up after
//! [`RelayConfig::delivery_timeout`].
//!
//! # Quick start
//!
//! ```rust,no_run
//! use bytes::Bytes;
//! use fanout_relay::Relay;
//! use tokio::sync::mpsc;
//!
//! # async fn example() -> fanout_relay::Result<()> {
//! let (producer, input) = mpsc::channel(16);
//! let mut relay = Relay::new(input);
//!
//! let mut rx = relay.add_receiver().await?;
//! relay.start()?;
//!
//! producer.send(Bytes::from_static(b"Hello World")).await.unwrap();
//! assert_eq!(rx.recv().await.unwrap(), "Hello World");
//!
//! relay.close().await?;
//! assert!(rx.recv().await.is_none());
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod relay;
pub mod stats;

pub use error::{RelayError, Result};
pub use relay::{Receiver, ReceiverId, Relay, RelayConfig, RelayState};
pub use stats::RelayStats;
