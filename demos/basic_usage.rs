//! # Demo: basic_usage
//!
//! Minimal producer/consumer round trip on a single queue.
//!
//! Demonstrates how to:
//! - Put keyed items and inspect the available side.
//! - Drain the queue in FIFO order under leases.
//! - Acknowledge each lease to remove the item permanently.
//!
//! ## Run
//! ```bash
//! cargo run --example basic_usage
//! ```

use leaseq::{LeasedKeyQueue, QueueConfig, QueueError};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), QueueError> {
    let queue: LeasedKeyQueue<&str, &str> = LeasedKeyQueue::new(QueueConfig::default());
    queue.start().await?;

    println!("producer: adding tasks...");
    queue.put("task-1", "send_email")?;
    queue.put("task-2", "process_data")?;
    queue.put("task-3", "generate_report")?;

    println!("queue size: {}", queue.qsize());
    println!("available keys: {:?}", queue.available_keys());

    println!("consumer: processing tasks...");
    while queue.qsize() > 0 {
        let (key, action, lease) = queue.get(None, None).await?;
        println!("  processing {key}: {action}");
        queue.ack(&lease)?;
        println!("  done {key}");
    }

    println!("final queue size: {}", queue.qsize());
    println!("final in-flight: {}", queue.inflight_size());

    queue.close().await;
    Ok(())
}
