//! # Error types surfaced by the queue.
//!
//! All failures are reported to the caller as a [`QueueError`] variant;
//! nothing is recovered internally. The background reaper never raises to
//! callers: any lease it loses a race on is left to be observed through the
//! `ack`/`release` error paths.
//!
//! `as_label` provides a short stable label per variant for logs/metrics.

use std::time::Duration;

use thiserror::Error;
use uuid::Uuid;

/// # Errors produced by queue operations.
///
/// Every operation either completes fully and notifies waiters, or fails
/// with one of these variants and leaves the queue state untouched.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum QueueError {
    /// `put` with [`InFlightPolicy::Reject`](crate::InFlightPolicy::Reject)
    /// hit a key that is currently leased out.
    #[error("key {key} is currently in flight")]
    KeyInFlight {
        /// Debug rendering of the rejected key.
        key: String,
    },

    /// The lease token is not currently in flight.
    ///
    /// This is also what an `ack` sees after the reaper expired the lease
    /// and requeued its item.
    #[error("unknown lease token: {token}")]
    InvalidLease {
        /// The unrecognized token.
        token: Uuid,
    },

    /// The lease was already acknowledged.
    #[error("lease {token} was already acknowledged")]
    AlreadyAcknowledged {
        /// The token that was acknowledged earlier.
        token: Uuid,
    },

    /// `get`/`take` ran out of wait budget before its predicate held.
    #[error("timed out after {waited:?} waiting on the queue")]
    WaitTimeout {
        /// The wait budget that elapsed.
        waited: Duration,
    },

    /// The queue is closed, or was closed while the caller waited.
    #[error("queue is closed")]
    Closed,
}

impl QueueError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            QueueError::KeyInFlight { .. } => "key_in_flight",
            QueueError::InvalidLease { .. } => "invalid_lease",
            QueueError::AlreadyAcknowledged { .. } => "already_acknowledged",
            QueueError::WaitTimeout { .. } => "wait_timeout",
            QueueError::Closed => "closed",
        }
    }
}
