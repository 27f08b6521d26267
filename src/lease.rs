//! # Lease tokens and in-flight bookkeeping.
//!
//! A [`Lease`] is the exclusive handle a consumer receives from `get`/`take`
//! and must resolve with `ack` or `release`. Tokens are random 128-bit UUIDs,
//! unique for the lifetime of the queue, so a lease cannot be forged or
//! confused with a later lease on the same key.
//!
//! [`LeaseRecord`] is the queue's mutable bookkeeping for one in-flight
//! lease: the key, the value being processed, the issue instant, and the
//! effective timeout.

use std::time::Duration;

use tokio::time::Instant;
use uuid::Uuid;

/// Exclusive handle to an in-flight item.
///
/// Immutable once issued; equality and hashing cover the token and the key
/// it was issued for.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Lease<K> {
    token: Uuid,
    key: K,
}

impl<K> Lease<K> {
    /// Issues a fresh lease for `key` with a new random token.
    pub(crate) fn issue(key: K) -> Self {
        Self {
            token: Uuid::new_v4(),
            key,
        }
    }

    /// The opaque token identifying this lease.
    pub fn token(&self) -> Uuid {
        self.token
    }

    /// The key this lease was issued for.
    pub fn key(&self) -> &K {
        &self.key
    }
}

/// Per-lease state kept while the item is in flight.
#[derive(Debug, Clone)]
pub(crate) struct LeaseRecord<K, V> {
    pub(crate) key: K,
    /// Current value; `put` with the Update policy overwrites this while
    /// the lease is out.
    pub(crate) value: V,
    pub(crate) created_at: Instant,
    pub(crate) timeout: Option<Duration>,
    /// Set just before the record leaves `in_flight` on `ack`, so the
    /// reaper can tell a terminal lease from a live one.
    pub(crate) acknowledged: bool,
}

impl<K, V> LeaseRecord<K, V> {
    pub(crate) fn new(key: K, value: V, timeout: Option<Duration>) -> Self {
        Self {
            key,
            value,
            created_at: Instant::now(),
            timeout,
            acknowledged: false,
        }
    }

    /// Whether the lease has outlived its timeout as of `now`.
    ///
    /// A lease without a timeout never expires; a zero timeout is expired
    /// from the moment of issuance.
    pub(crate) fn is_expired(&self, now: Instant) -> bool {
        match self.timeout {
            None => false,
            Some(timeout) => now.saturating_duration_since(self.created_at) >= timeout,
        }
    }
}
