//! Event bus for broadcasting queue lifecycle events.
//!
//! [`Bus`] is a thin wrapper around [`tokio::sync::broadcast`] through which
//! the queue core and the reaper publish [`Event`]s to observers.
//!
//! - [`Bus::publish`] sends an event to all subscribers (non-blocking).
//! - [`Bus::subscribe`] creates a new receiver for consuming events.

use tokio::sync::broadcast;

use crate::event::Event;

/// Broadcast channel for queue lifecycle events.
pub(crate) struct Bus<K> {
    tx: broadcast::Sender<Event<K>>,
}

impl<K: Clone> Bus<K> {
    /// Creates a new bus with the given channel capacity.
    pub(crate) fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Publishes an event to all subscribers.
    ///
    /// Errors are ignored if there are no active subscribers.
    pub(crate) fn publish(&self, ev: Event<K>) {
        let _ = self.tx.send(ev);
    }

    /// Subscribes to the bus and returns a new receiver.
    pub(crate) fn subscribe(&self) -> broadcast::Receiver<Event<K>> {
        self.tx.subscribe()
    }
}
