//! # Lease-timeout reaper.
//!
//! A cooperative background task that periodically scans in-flight leases
//! and returns expired ones to the front of the queue, so a crashed or
//! stalled consumer cannot strand an item forever.
//!
//! Each sweep runs entirely inside one critical section: snapshot the
//! expired tokens, internally release each one, broadcast once if anything
//! was requeued. The mutex is never held across the inter-sweep sleep, and
//! the loop yields promptly to cancellation and to `close`.
//!
//! Errors from individual releases are suppressed: a lease that an `ack`
//! or `release` won the race on is simply no longer the reaper's problem.

use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

use tokio::time::{self, Instant};
use uuid::Uuid;

use crate::event::{Event, EventKind};
use crate::queue::Shared;

pub(crate) async fn run<K, V>(shared: Arc<Shared<K, V>>)
where
    K: Clone + Eq + Hash + fmt::Debug + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    let interval = shared.config.reaper_interval;
    loop {
        {
            let mut state = shared.lock_state();
            if state.closed {
                break;
            }
            let now = Instant::now();
            let expired: Vec<Uuid> = state
                .in_flight
                .iter()
                .filter(|(_, record)| !record.acknowledged && record.is_expired(now))
                .map(|(&token, _)| token)
                .collect();
            let mut requeued = false;
            for token in expired {
                if let Ok(key) = state.release_locked(token, true) {
                    requeued = true;
                    shared.bus.publish(
                        Event::now(EventKind::LeaseExpired)
                            .with_key(key)
                            .with_token(token),
                    );
                }
            }
            if requeued {
                shared.changed.notify_waiters();
            }
        }
        tokio::select! {
            _ = shared.cancel.cancelled() => break,
            _ = time::sleep(interval) => {}
        }
    }
}
