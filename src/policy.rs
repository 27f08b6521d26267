//! # Policies for `put` on a key that is currently in flight.
//!
//! [`InFlightPolicy`] determines what `put` does when the target key has
//! been handed to a consumer under a lease.
//!
//! # Variants
//! - [`InFlightPolicy::Update`] — overwrite the in-flight value (default).
//! - [`InFlightPolicy::Reject`] — fail with `KeyInFlight`.
//! - [`InFlightPolicy::Buffer`] — enqueue a fresh available copy alongside the lease.
//!
//! # Example
//! ```
//! use leaseq::InFlightPolicy;
//!
//! let p1 = InFlightPolicy::Reject;
//! let p2 = InFlightPolicy::Buffer;
//! let p3 = InFlightPolicy::default();
//!
//! assert!(matches!(p1, InFlightPolicy::Reject));
//! assert!(matches!(p2, InFlightPolicy::Buffer));
//! assert!(matches!(p3, InFlightPolicy::Update));
//! ```

/// Policy controlling how `put` treats a key that is currently leased out.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InFlightPolicy {
    /// Overwrite the value carried by the in-flight lease record (default).
    ///
    /// The consumer holding the lease keeps the value it already received;
    /// the update is observed on `release` or reaper requeue.
    Update,
    /// Fail the `put` with [`QueueError::KeyInFlight`](crate::QueueError::KeyInFlight).
    Reject,
    /// Enqueue a second, immediately available copy of the key.
    ///
    /// Releasing the original lease afterwards does not add another copy;
    /// the buffered one wins.
    Buffer,
}

impl Default for InFlightPolicy {
    /// Returns [`InFlightPolicy::Update`].
    fn default() -> Self {
        InFlightPolicy::Update
    }
}
