//! # Demo: fifo_consumers
//!
//! One producer, two competing consumers.
//!
//! Demonstrates how to:
//! - Share a queue by cloning the handle.
//! - Pull with a wait timeout so idle consumers drain out cleanly.
//! - Acknowledge each lease once the work is done.
//!
//! ## Run
//! ```bash
//! cargo run --example fifo_consumers
//! ```

use std::time::Duration;

use leaseq::{LeasedKeyQueue, QueueConfig, QueueError};

async fn consume(name: &str, queue: LeasedKeyQueue<String, u32>) -> Result<(), QueueError> {
    loop {
        match queue.get(Some(Duration::from_millis(200)), None).await {
            Ok((key, value, lease)) => {
                println!("[{name}] got {key} = {value}");
                tokio::time::sleep(Duration::from_millis(50)).await;
                queue.ack(&lease)?;
            }
            Err(QueueError::WaitTimeout { .. }) => {
                println!("[{name}] queue drained, exiting");
                return Ok(());
            }
            Err(err) => return Err(err),
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), QueueError> {
    let queue: LeasedKeyQueue<String, u32> = LeasedKeyQueue::new(QueueConfig::default());
    queue.start().await?;

    for n in 0..8 {
        queue.put(format!("job-{n}"), n)?;
    }

    let a = tokio::spawn(consume("consumer-a", queue.clone()));
    let b = tokio::spawn(consume("consumer-b", queue.clone()));
    let (a, b) = tokio::join!(a, b);
    a.expect("consumer-a panicked")?;
    b.expect("consumer-b panicked")?;

    queue.close().await;
    Ok(())
}
