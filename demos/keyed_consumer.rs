//! # Demo: keyed_consumer
//!
//! A consumer that waits for one specific key while a FIFO consumer
//! handles everything else.
//!
//! Demonstrates how to:
//! - Block on `take` until a named key becomes available.
//! - Mix keyed and FIFO consumption on the same queue.
//!
//! ## Run
//! ```bash
//! cargo run --example keyed_consumer
//! ```

use std::time::Duration;

use leaseq::{LeasedKeyQueue, QueueConfig, QueueError};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), QueueError> {
    let queue: LeasedKeyQueue<&str, u32> = LeasedKeyQueue::new(QueueConfig::default());
    queue.start().await?;

    let keyed = {
        let queue = queue.clone();
        tokio::spawn(async move {
            println!("[keyed] waiting for 'priority'...");
            let (key, value, lease) = queue.take(&"priority", None, None).await?;
            println!("[keyed] got {key} = {value}");
            queue.ack(&lease)?;
            Ok::<_, QueueError>(())
        })
    };

    // The keyed consumer is already parked before these arrive.
    tokio::time::sleep(Duration::from_millis(50)).await;
    queue.put("background-1", 1)?;
    queue.put("background-2", 2)?;
    queue.put("priority", 99)?;

    keyed.await.expect("keyed consumer panicked")?;

    // "priority" was taken out of FIFO order; the rest is untouched.
    while let Ok((key, value, lease)) = queue.get(Some(Duration::ZERO), None).await {
        println!("[fifo] got {key} = {value}");
        queue.ack(&lease)?;
    }

    queue.close().await;
    Ok(())
}
