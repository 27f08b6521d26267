//! # The keyed leased queue core.
//!
//! [`LeasedKeyQueue`] behaves like a FIFO queue, a keyed map, and a
//! lease-based work-distribution primitive at the same time. Producers
//! insert or update items by key; consumers pull the oldest available item
//! (`get`) or wait for a named key (`take`). Every pull yields an exclusive
//! [`Lease`]; the item stays invisible to other consumers until the lease is
//! acknowledged (`ack`, permanent removal) or released (`release`,
//! re-enqueued). A background reaper auto-releases leases that outlive
//! their timeout.
//!
//! # Key lifecycle
//!
//! ```text
//!             put (new key)              get / take
//!   ABSENT ─────────────────► AVAILABLE ─────────────► IN_FLIGHT
//!     ▲                           ▲                        │
//!     │                           │  release / reaper      │
//!     │                           └────────────────────────┤
//!     │                                ack                 │
//!     └────────────────────────────────────────────────────┘
//! ```
//!
//! # Coordination
//!
//! One mutex guards all queue state; every operation performs its whole
//! transition inside a single critical section and never awaits while
//! holding it. A single [`Notify`] serves as the broadcast change
//! condition: `get`/`take` arm their wakeup with the enable-before-unlock
//! pattern, re-test their predicate on every wake, and tolerate spurious
//! wakes. Dropping a waiting `get`/`take` future leaves the queue state
//! unchanged.
//!
//! All operations are O(1), including take-by-key and the requeue paths.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::future::Future;
use std::hash::Hash;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures::FutureExt;
use tokio::sync::{broadcast, Notify};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::bus::Bus;
use crate::config::QueueConfig;
use crate::error::QueueError;
use crate::event::{Event, EventKind};
use crate::lease::{Lease, LeaseRecord};
use crate::list::{NodeRef, OrderedList};
use crate::observer::Observer;
use crate::policy::InFlightPolicy;
use crate::reaper;

/// Async keyed leased queue with FIFO semantics and O(1) operations.
///
/// The handle is cheap to clone; every clone addresses the same queue.
/// Keys must have stable equality and hashing; values travel by clone
/// between the queue and consumers.
///
/// See the [module docs](self) for the state machine and the
/// [crate docs](crate) for a full example.
pub struct LeasedKeyQueue<K, V> {
    shared: Arc<Shared<K, V>>,
}

impl<K, V> Clone for LeasedKeyQueue<K, V> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

pub(crate) struct Shared<K, V> {
    state: Mutex<State<K, V>>,
    pub(crate) changed: Notify,
    pub(crate) cancel: CancellationToken,
    pub(crate) bus: Bus<K>,
    pub(crate) config: QueueConfig,
}

impl<K, V> Shared<K, V> {
    /// A poisoned guard still holds consistent state: transitions are
    /// single critical sections with no await inside, so carry on.
    pub(crate) fn lock_state(&self) -> MutexGuard<'_, State<K, V>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

pub(crate) struct State<K, V> {
    list: OrderedList<K, V>,
    available: HashMap<K, NodeRef>,
    pub(crate) in_flight: HashMap<Uuid, LeaseRecord<K, V>>,
    leases_by_key: HashMap<K, Uuid>,
    /// Tokens that were acknowledged at some point, kept for the queue's
    /// lifetime so a late `ack`/`release` can be told apart from a forged
    /// or reaper-expired lease.
    acknowledged: HashSet<Uuid>,
    reaper: Option<JoinHandle<()>>,
    pub(crate) closed: bool,
}

impl<K, V> State<K, V>
where
    K: Clone + Eq + Hash,
{
    /// Moves the lease identified by `token` back to the available side.
    ///
    /// Returns the key on success. Caller holds the mutex and decides
    /// whether to notify; no notification happens here.
    pub(crate) fn release_locked(
        &mut self,
        token: Uuid,
        requeue_front: bool,
    ) -> Result<K, QueueError> {
        if self.acknowledged.contains(&token) {
            return Err(QueueError::AlreadyAcknowledged { token });
        }
        match self.in_flight.get(&token) {
            None => return Err(QueueError::InvalidLease { token }),
            Some(record) if record.acknowledged => {
                return Err(QueueError::AlreadyAcknowledged { token })
            }
            Some(_) => {}
        }
        let Some(record) = self.in_flight.remove(&token) else {
            return Err(QueueError::InvalidLease { token });
        };
        let LeaseRecord { key, value, .. } = record;
        if self.leases_by_key.get(&key) == Some(&token) {
            self.leases_by_key.remove(&key);
        }
        // A copy buffered while the lease was out wins; the value the
        // record carried is dropped.
        if self.available.contains_key(&key) {
            return Ok(key);
        }
        let node = if requeue_front {
            self.list.push_front(key.clone(), value)
        } else {
            self.list.push_back(key.clone(), value)
        };
        self.available.insert(key.clone(), node);
        Ok(key)
    }
}

impl<K, V> LeasedKeyQueue<K, V>
where
    K: Clone + Eq + Hash + fmt::Debug + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Creates a queue with the given configuration.
    pub fn new(config: QueueConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(State {
                    list: OrderedList::new(),
                    available: HashMap::new(),
                    in_flight: HashMap::new(),
                    leases_by_key: HashMap::new(),
                    acknowledged: HashSet::new(),
                    reaper: None,
                    closed: false,
                }),
                changed: Notify::new(),
                cancel: CancellationToken::new(),
                bus: Bus::new(config.bus_capacity),
                config,
            }),
        }
    }

    /// Creates a queue whose leases expire after `timeout` by default.
    pub fn with_lease_timeout(timeout: Duration) -> Self {
        Self::new(QueueConfig {
            default_lease_timeout: Some(timeout),
            ..QueueConfig::default()
        })
    }

    /// Arms the background reaper when a default lease timeout is set.
    ///
    /// Idempotent. The reaper is also armed lazily by the first `get`/`take`
    /// that issues a bounded lease, so calling `start` is only required to
    /// have expiry running before any lease is handed out.
    ///
    /// # Errors
    /// Fails with [`QueueError::Closed`] on a closed queue.
    pub async fn start(&self) -> Result<(), QueueError> {
        let mut state = self.shared.lock_state();
        if state.closed {
            return Err(QueueError::Closed);
        }
        if self.shared.config.default_lease_timeout.is_some() {
            self.arm_reaper(&mut state);
        }
        Ok(())
    }

    /// Closes the queue. Terminal and idempotent.
    ///
    /// Every remaining in-flight lease is returned to the front of the
    /// queue, the reaper is cancelled and joined, and all waiters are woken
    /// to fail with [`QueueError::Closed`]. Introspection keeps working on
    /// a closed queue; mutating operations fail.
    pub async fn close(&self) {
        let reaper = {
            let mut state = self.shared.lock_state();
            if state.closed {
                return;
            }
            state.closed = true;
            let tokens: Vec<Uuid> = state.in_flight.keys().copied().collect();
            for token in tokens {
                let _ = state.release_locked(token, true);
            }
            state.reaper.take()
        };
        self.shared.changed.notify_waiters();
        self.shared.bus.publish(Event::now(EventKind::Closed));
        self.shared.cancel.cancel();
        if let Some(handle) = reaper {
            let _ = handle.await;
        }
    }

    /// Runs `f` with a started queue and closes it on every exit path.
    ///
    /// This is the scoped-acquisition form: `start` on entry, `close` on
    /// exit, including when the future fails or panics (the panic is
    /// resumed after the queue is closed).
    pub async fn scope<T, F, Fut>(&self, f: F) -> Result<T, QueueError>
    where
        F: FnOnce(Self) -> Fut,
        Fut: Future<Output = Result<T, QueueError>>,
    {
        self.start().await?;
        let result = AssertUnwindSafe(f(self.clone())).catch_unwind().await;
        self.close().await;
        match result {
            Ok(output) => output,
            Err(payload) => panic::resume_unwind(payload),
        }
    }

    /// Inserts or updates `key`, treating an in-flight key per the
    /// [`Update`](InFlightPolicy::Update) policy.
    ///
    /// # Errors
    /// Fails with [`QueueError::Closed`] on a closed queue.
    pub fn put(&self, key: K, value: V) -> Result<(), QueueError> {
        self.put_with(key, value, InFlightPolicy::default())
    }

    /// Inserts or updates `key` with an explicit in-flight policy.
    ///
    /// - Absent key: enqueued at the back.
    /// - Available key: value overwritten in place, FIFO position kept.
    /// - In-flight key: per `if_in_flight`. With
    ///   [`Update`](InFlightPolicy::Update), the consumer holding the lease
    ///   keeps the value it already received; the new value is observed
    ///   only when the lease is released or expires and the item is
    ///   requeued.
    ///
    /// # Errors
    /// Fails with [`QueueError::KeyInFlight`] under
    /// [`Reject`](InFlightPolicy::Reject), and with [`QueueError::Closed`]
    /// on a closed queue.
    pub fn put_with(
        &self,
        key: K,
        value: V,
        if_in_flight: InFlightPolicy,
    ) -> Result<(), QueueError> {
        let mut state = self.shared.lock_state();
        if state.closed {
            return Err(QueueError::Closed);
        }

        if let Some(&token) = state.leases_by_key.get(&key) {
            match if_in_flight {
                InFlightPolicy::Update => {
                    if let Some(record) = state.in_flight.get_mut(&token) {
                        record.value = value;
                    }
                    self.shared
                        .bus
                        .publish(Event::now(EventKind::Updated).with_key(key).with_token(token));
                    self.shared.changed.notify_waiters();
                    return Ok(());
                }
                InFlightPolicy::Reject => {
                    return Err(QueueError::KeyInFlight {
                        key: format!("{key:?}"),
                    });
                }
                // Fall through to the enqueue path below.
                InFlightPolicy::Buffer => {}
            }
        }

        if let Some(&node) = state.available.get(&key) {
            if let Some(slot) = state.list.value_mut(node) {
                *slot = value;
            }
            self.shared
                .bus
                .publish(Event::now(EventKind::Updated).with_key(key));
            self.shared.changed.notify_waiters();
            return Ok(());
        }

        let node = state.list.push_back(key.clone(), value);
        state.available.insert(key.clone(), node);
        self.shared
            .bus
            .publish(Event::now(EventKind::Queued).with_key(key));
        self.shared.changed.notify_waiters();
        Ok(())
    }

    /// Pulls the oldest available item and leases it to the caller.
    ///
    /// Waits up to `wait_timeout` for an item (`None` waits forever).
    /// `lease_timeout` overrides the queue's default lease timeout for
    /// this lease only.
    ///
    /// # Errors
    /// Fails with [`QueueError::WaitTimeout`] when the wait budget runs
    /// out, and with [`QueueError::Closed`] if the queue is closed or
    /// closes while waiting.
    pub async fn get(
        &self,
        wait_timeout: Option<Duration>,
        lease_timeout: Option<Duration>,
    ) -> Result<(K, V, Lease<K>), QueueError> {
        let deadline = wait_timeout.map(|d| Instant::now() + d);
        loop {
            let notified = self.shared.changed.notified();
            tokio::pin!(notified);
            {
                let mut state = self.shared.lock_state();
                if state.closed {
                    return Err(QueueError::Closed);
                }
                if let Some((key, value)) = state.list.pop_front() {
                    state.available.remove(&key);
                    let lease = self.admit(&mut state, key.clone(), value.clone(), lease_timeout);
                    self.shared.changed.notify_waiters();
                    return Ok((key, value, lease));
                }
                notified.as_mut().enable();
            }
            wait_for_change(notified, deadline, wait_timeout).await?;
        }
    }

    /// Pulls a specific key once it is available (present and not leased
    /// out) and leases it to the caller.
    ///
    /// Timeout and closed semantics match [`get`](Self::get).
    pub async fn take(
        &self,
        key: &K,
        wait_timeout: Option<Duration>,
        lease_timeout: Option<Duration>,
    ) -> Result<(K, V, Lease<K>), QueueError> {
        let deadline = wait_timeout.map(|d| Instant::now() + d);
        loop {
            let notified = self.shared.changed.notified();
            tokio::pin!(notified);
            {
                let mut state = self.shared.lock_state();
                if state.closed {
                    return Err(QueueError::Closed);
                }
                if let Some(&node) = state.available.get(key) {
                    state.available.remove(key);
                    let (key, value) = state.list.unlink(node);
                    let lease = self.admit(&mut state, key.clone(), value.clone(), lease_timeout);
                    self.shared.changed.notify_waiters();
                    return Ok((key, value, lease));
                }
                notified.as_mut().enable();
            }
            wait_for_change(notified, deadline, wait_timeout).await?;
        }
    }

    /// Acknowledges a lease, permanently removing the item.
    ///
    /// # Errors
    /// Fails with [`QueueError::InvalidLease`] for an unknown token (which
    /// includes a lease the reaper already expired),
    /// [`QueueError::AlreadyAcknowledged`] for a repeat `ack`, and
    /// [`QueueError::Closed`] on a closed queue.
    pub fn ack(&self, lease: &Lease<K>) -> Result<(), QueueError> {
        let token = lease.token();
        let mut state = self.shared.lock_state();
        if state.closed {
            return Err(QueueError::Closed);
        }
        if state.acknowledged.contains(&token) {
            return Err(QueueError::AlreadyAcknowledged { token });
        }
        match state.in_flight.get_mut(&token) {
            None => return Err(QueueError::InvalidLease { token }),
            Some(record) if record.acknowledged => {
                return Err(QueueError::AlreadyAcknowledged { token })
            }
            Some(record) => record.acknowledged = true,
        }
        state.acknowledged.insert(token);
        if let Some(record) = state.in_flight.remove(&token) {
            if state.leases_by_key.get(&record.key) == Some(&token) {
                state.leases_by_key.remove(&record.key);
            }
            self.shared.bus.publish(
                Event::now(EventKind::LeaseAcked)
                    .with_key(record.key)
                    .with_token(token),
            );
        }
        self.shared.changed.notify_waiters();
        Ok(())
    }

    /// Releases a lease, returning the item to the queue.
    ///
    /// The requeued item carries the record's current value, which an
    /// in-flight `put` may have updated. Appends to the back unless
    /// `requeue_front` is set. If a copy of the key was buffered while the
    /// lease was out, no second copy is added.
    ///
    /// # Errors
    /// Same taxonomy as [`ack`](Self::ack).
    pub fn release(&self, lease: &Lease<K>, requeue_front: bool) -> Result<(), QueueError> {
        let token = lease.token();
        let mut state = self.shared.lock_state();
        if state.closed {
            return Err(QueueError::Closed);
        }
        let key = state.release_locked(token, requeue_front)?;
        self.shared.bus.publish(
            Event::now(EventKind::LeaseReleased)
                .with_key(key)
                .with_token(token)
                .with_requeued_front(requeue_front),
        );
        self.shared.changed.notify_waiters();
        Ok(())
    }

    /// Returns the value for `key` if it is available, without leasing it.
    pub fn peek(&self, key: &K) -> Option<V> {
        let state = self.shared.lock_state();
        state
            .available
            .get(key)
            .and_then(|&node| state.list.value(node))
            .cloned()
    }

    /// Whether `key` is currently available (present and not in flight).
    pub fn contains(&self, key: &K) -> bool {
        self.shared.lock_state().available.contains_key(key)
    }

    /// All currently available keys.
    pub fn available_keys(&self) -> HashSet<K> {
        self.shared.lock_state().available.keys().cloned().collect()
    }

    /// All currently in-flight keys.
    pub fn inflight_keys(&self) -> HashSet<K> {
        self.shared
            .lock_state()
            .leases_by_key
            .keys()
            .cloned()
            .collect()
    }

    /// Number of available items.
    pub fn qsize(&self) -> usize {
        self.shared.lock_state().list.len()
    }

    /// Number of in-flight leases.
    pub fn inflight_size(&self) -> usize {
        self.shared.lock_state().in_flight.len()
    }

    /// Spawns a background listener that feeds lifecycle events to
    /// `observer` until the queue closes.
    ///
    /// Must be called from within a tokio runtime.
    pub fn observe(&self, observer: Arc<dyn Observer<K>>) {
        let mut rx = self.shared.bus.subscribe();
        let cancel = self.shared.cancel.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    received = rx.recv() => match received {
                        Ok(ev) => observer.on_event(&ev).await,
                        Err(broadcast::error::RecvError::Lagged(_)) => continue,
                        Err(broadcast::error::RecvError::Closed) => break,
                    },
                    _ = cancel.cancelled() => {
                        // Drain what was published before the shutdown.
                        while let Ok(ev) = rx.try_recv() {
                            observer.on_event(&ev).await;
                        }
                        break;
                    }
                }
            }
        });
    }

    /// Subscribes to the raw lifecycle event stream.
    pub fn subscribe(&self) -> broadcast::Receiver<Event<K>> {
        self.shared.bus.subscribe()
    }

    /// Converts a popped node into an in-flight lease. Caller holds the
    /// mutex and has already detached the node from `available`/`list`.
    fn admit(
        &self,
        state: &mut State<K, V>,
        key: K,
        value: V,
        lease_timeout: Option<Duration>,
    ) -> Lease<K> {
        let effective = lease_timeout.or(self.shared.config.default_lease_timeout);
        let lease = Lease::issue(key.clone());
        state
            .leases_by_key
            .insert(key.clone(), lease.token());
        state
            .in_flight
            .insert(lease.token(), LeaseRecord::new(key.clone(), value, effective));
        if effective.is_some() {
            self.arm_reaper(state);
        }
        let mut event = Event::now(EventKind::LeaseIssued)
            .with_key(key)
            .with_token(lease.token());
        if let Some(timeout) = effective {
            event = event.with_lease_timeout(timeout);
        }
        self.shared.bus.publish(event);
        lease
    }

    fn arm_reaper(&self, state: &mut State<K, V>) {
        if state.reaper.is_some() || state.closed {
            return;
        }
        state.reaper = Some(tokio::spawn(reaper::run(Arc::clone(&self.shared))));
    }
}

/// One bounded (or unbounded) wait on the change condition.
///
/// The caller enabled `notified` before dropping the state lock, so a
/// broadcast between unlock and this await is not lost.
async fn wait_for_change<F>(
    notified: F,
    deadline: Option<Instant>,
    wait_timeout: Option<Duration>,
) -> Result<(), QueueError>
where
    F: Future<Output = ()>,
{
    match deadline {
        Some(at) => match time::timeout_at(at, notified).await {
            Ok(()) => Ok(()),
            Err(_) => Err(QueueError::WaitTimeout {
                waited: wait_timeout.unwrap_or_default(),
            }),
        },
        None => {
            notified.await;
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    impl<K, V> State<K, V>
    where
        K: Clone + Eq + Hash + fmt::Debug,
    {
        /// Keys present on both sides at once; only the Buffer policy may
        /// produce a non-empty result, and only transiently.
        fn overlap_keys(&self) -> Vec<K> {
            self.available
                .keys()
                .filter(|key| self.leases_by_key.contains_key(*key))
                .cloned()
                .collect()
        }

        /// Structural invariants over the maps and the ordered list.
        fn assert_coherent(&self) {
            assert_eq!(self.in_flight.len(), self.leases_by_key.len());
            for (key, token) in &self.leases_by_key {
                let record = self
                    .in_flight
                    .get(token)
                    .expect("reverse index points at a live record");
                assert_eq!(&record.key, key);
            }
            let mut linked = 0;
            for (node, key, _) in self.list.iter() {
                assert_eq!(self.available.get(key), Some(&node));
                linked += 1;
            }
            assert_eq!(linked, self.available.len());
            assert_eq!(self.list.len(), self.available.len());
            assert_eq!(self.list.is_empty(), self.available.is_empty());
        }
    }

    fn check(queue: &LeasedKeyQueue<&'static str, i32>) -> Vec<&'static str> {
        let state = queue.shared.lock_state();
        state.assert_coherent();
        state.overlap_keys()
    }

    #[tokio::test]
    async fn invariants_hold_across_transitions() {
        let queue: LeasedKeyQueue<&str, i32> = LeasedKeyQueue::new(QueueConfig::default());
        assert!(check(&queue).is_empty());

        queue.put("a", 1).unwrap();
        queue.put("b", 2).unwrap();
        assert!(check(&queue).is_empty());

        let (_, _, lease_a) = queue.get(None, None).await.unwrap();
        assert!(check(&queue).is_empty());

        queue.release(&lease_a, false).unwrap();
        assert!(check(&queue).is_empty());

        let (_, _, lease_b) = queue.take(&"b", None, None).await.unwrap();
        assert!(check(&queue).is_empty());

        queue.ack(&lease_b).unwrap();
        assert!(check(&queue).is_empty());
        assert_eq!(queue.qsize(), 1);
        assert_eq!(queue.inflight_size(), 0);
    }

    #[tokio::test]
    async fn buffer_overlap_is_transient() {
        let queue: LeasedKeyQueue<&str, i32> = LeasedKeyQueue::new(QueueConfig::default());
        queue.put("a", 1).unwrap();
        let (_, _, lease) = queue.get(None, None).await.unwrap();

        queue.put_with("a", 2, InFlightPolicy::Buffer).unwrap();
        assert_eq!(check(&queue), vec!["a"]);

        queue.release(&lease, false).unwrap();
        assert!(check(&queue).is_empty());

        let (_, value, _) = queue.get(None, None).await.unwrap();
        assert_eq!(value, 2);
    }

    #[tokio::test]
    async fn tokens_never_repeat() {
        let queue: LeasedKeyQueue<&str, i32> = LeasedKeyQueue::new(QueueConfig::default());
        let mut seen = HashSet::new();
        for _ in 0..32 {
            queue.put("a", 1).unwrap();
            let (_, _, lease) = queue.get(None, None).await.unwrap();
            assert!(seen.insert(lease.token()));
            queue.ack(&lease).unwrap();
        }
    }
}
