//! # leaseq
//!
//! **leaseq** is an async keyed leased queue: one structure that behaves
//! like a FIFO queue, a keyed map, and a lease-based work-distribution
//! primitive, with O(1) mutating operations throughout.
//!
//! ## Features
//!
//! | Area              | Description                                                            | Key types / traits                  |
//! |-------------------|------------------------------------------------------------------------|-------------------------------------|
//! | **Keyed FIFO**    | Insert/update by key, consume oldest-first, peek and introspect.       | [`LeasedKeyQueue`]                  |
//! | **Leases**        | Every pull is exclusive until `ack` (remove) or `release` (requeue).   | [`Lease`]                           |
//! | **Keyed consume** | Wait for one specific key to become available.                         | [`LeasedKeyQueue::take`]            |
//! | **Expiry**        | Background reaper auto-releases leases that outlive their timeout.     | [`QueueConfig::default_lease_timeout`] |
//! | **Policies**      | Choose what `put` does to an in-flight key: update, reject, or buffer. | [`InFlightPolicy`]                  |
//! | **Errors**        | Typed failure taxonomy for producers and consumers.                    | [`QueueError`]                      |
//! | **Observability** | Lifecycle events over a broadcast channel.                             | [`Observer`], [`Event`]             |
//!
//! ## Optional features
//! - `logging`: exports a simple built-in [`LoggerObserver`] _(demo/reference only)_.
//!
//! ```no_run
//! use std::time::Duration;
//! use leaseq::{LeasedKeyQueue, QueueError};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), QueueError> {
//!     // Leases not acknowledged within 30s go back to the front of the queue.
//!     let queue: LeasedKeyQueue<String, u32> =
//!         LeasedKeyQueue::with_lease_timeout(Duration::from_secs(30));
//!     queue.start().await?;
//!
//!     queue.put("job-1".to_string(), 1)?;
//!     queue.put("job-2".to_string(), 2)?;
//!
//!     // FIFO pull with an exclusive lease.
//!     let (key, value, lease) = queue.get(Some(Duration::from_secs(1)), None).await?;
//!     assert_eq!((key.as_str(), value), ("job-1", 1));
//!     queue.ack(&lease)?;
//!
//!     // Or wait for one specific key.
//!     let (_, _, lease) = queue.take(&"job-2".to_string(), None, None).await?;
//!     queue.release(&lease, false)?;
//!
//!     queue.close().await;
//!     Ok(())
//! }
//! ```
//!
//! The queue is built for a single cooperative scheduler: every operation
//! runs its whole state transition inside one critical section and only
//! `get`/`take` (and the reaper between sweeps) ever suspend.
//!
//! ---

mod bus;
mod config;
mod error;
mod event;
mod lease;
mod list;
mod observer;
mod policy;
mod queue;
mod reaper;

// ---- Public re-exports ----

pub use config::QueueConfig;
pub use error::QueueError;
pub use event::{Event, EventKind};
pub use lease::Lease;
pub use observer::Observer;
pub use policy::InFlightPolicy;
pub use queue::LeasedKeyQueue;

// Optional: expose a simple built-in logger observer (demo/reference).
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use observer::LoggerObserver;
