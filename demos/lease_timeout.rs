//! # Demo: lease_timeout
//!
//! A consumer that never acknowledges, and the reaper cleaning up after it.
//!
//! Demonstrates how to:
//! - Configure a default lease timeout.
//! - Observe an expired lease being requeued to the front.
//! - See the stale lease rejected on a late `ack`.
//!
//! ## Run
//! ```bash
//! cargo run --example lease_timeout
//! ```

use std::time::Duration;

use leaseq::{LeasedKeyQueue, QueueError};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), QueueError> {
    let queue: LeasedKeyQueue<&str, u32> =
        LeasedKeyQueue::with_lease_timeout(Duration::from_millis(300));
    queue.start().await?;

    queue.put("fragile-job", 42)?;

    // First consumer grabs the item and then stalls past the timeout.
    let (key, value, stale) = queue.get(None, None).await?;
    println!("[worker-1] got {key} = {value}, then hangs...");
    tokio::time::sleep(Duration::from_millis(600)).await;

    // The reaper returned the item; a fresh lease picks it up.
    let (key, value, lease) = queue.get(Some(Duration::from_secs(1)), None).await?;
    println!("[worker-2] retrying {key} = {value}");
    queue.ack(&lease)?;

    match queue.ack(&stale) {
        Err(QueueError::InvalidLease { token }) => {
            println!("[worker-1] woke up, lease {token} is long gone");
        }
        other => println!("[worker-1] unexpected: {other:?}"),
    }

    queue.close().await;
    Ok(())
}
