//! Broadcast relay from one input to many receivers
//!
//! The relay owns a single dispatch task that serializes everything touching
//! the receiver set: reading input, registering receivers and shutting down.
//! Each receiver has its own delivery lane, so a stalled receiver never holds
//! up the loop or its neighbours, and one receiver sees messages in input order.
//!
//! # Architecture
//!
//! ```text
//!   mpsc::Receiver<Bytes>                     Relay (owner handle)
//!            │                         add_receiver()      close()
//!            │                               │                │
//!            ▼                               ▼                ▼
//!   ┌──────────────────────────────────────────────────────────────┐
//!   │ dispatch loop (tokio::select!)                               │
//!   │   input ──► stamp deadline ──► enqueue on every lane         │
//!   │   registration ──► spawn lane worker, ack                    │
//!   │   shutdown ──► abort lane workers, drop lanes, exit          │
//!   └──────────────────────────────┬───────────────────────────────┘
//!                  ┌───────────────┼───────────────┐
//!                  ▼               ▼               ▼
//!             lane worker     lane worker     lane worker   (in order,
//!                  │               │               │         deadline each)
//!              Receiver        Receiver        Receiver
//! ```
//!
//! # Zero-Copy Design
//!
//! Messages are `bytes::Bytes`. Each receiver gets its own handle to the same
//! immutable allocation, so copies are reference-count bumps and no receiver
//! can observe another's mutation.

pub mod config;
mod controller;
mod delivery;
mod dispatch;
pub mod receiver;
pub mod state;

pub use config::RelayConfig;
pub use controller::Relay;
pub use receiver::{Receiver, ReceiverId};
pub use state::RelayState;
