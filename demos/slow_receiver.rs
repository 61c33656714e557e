//! Slow vs fast receiver on one relay
//!
//! Run with: cargo run --example slow_receiver
//!
//! A producer emits a message every 500ms. One receiver samples every 750ms
//! and falls behind; the other samples every 250ms and keeps up. The slow one
//! only loses its own messages.
//!
//! Set `RUST_LOG=fanout_relay=debug` to see dropped deliveries.

use std::time::Duration;

use bytes::Bytes;
use fanout_relay::{Receiver, Relay};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

async fn consume(name: &'static str, mut rx: Receiver, pause: Duration) -> u64 {
    let mut count = 0;
    while let Some(message) = rx.recv().await {
        count += 1;
        println!("[{}] {}", name, String::from_utf8_lossy(&message));
        tokio::time::sleep(pause).await;
    }
    count
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let (producer, input) = mpsc::channel(1);
    let mut relay = Relay::new(input);

    let slow = relay.add_receiver().await?;
    let fast = relay.add_receiver().await?;
    relay.start()?;

    let producing = tokio::spawn(async move {
        let mut sent = 0u64;
        let mut ticker = tokio::time::interval(Duration::from_millis(500));
        loop {
            ticker.tick().await;
            if producer.send(Bytes::from(format!("Testing{}", sent))).await.is_err() {
                break;
            }
            sent += 1;
        }
    });

    let slow = tokio::spawn(consume("slow", slow, Duration::from_millis(750)));
    let fast = tokio::spawn(consume("fast", fast, Duration::from_millis(250)));

    tokio::time::sleep(Duration::from_secs(6)).await;
    producing.abort();
    relay.close().await?;

    let stats = relay.stats();
    println!(
        "Stats: received={} delivered={} timed_out={} drop_rate={:.2}",
        stats.messages_received,
        stats.delivered,
        stats.timed_out,
        stats.drop_rate(),
    );
    println!("slow={} fast={}", slow.await?, fast.await?);

    Ok(())
}
