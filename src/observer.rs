use async_trait::async_trait;

use crate::event::Event;
#[cfg(feature = "logging")]
use crate::event::EventKind;

/// Hook into queue lifecycle events (logging, metrics, custom observers).
///
/// Attach one with
/// [`LeasedKeyQueue::observe`](crate::LeasedKeyQueue::observe); events are
/// delivered in state-transition order on a background listener task.
#[async_trait]
pub trait Observer<K>: Send + Sync {
    async fn on_event(&self, event: &Event<K>);
}

/// Built-in observer that prints every event (demo/reference only).
#[cfg(feature = "logging")]
pub struct LoggerObserver;

#[cfg(feature = "logging")]
#[async_trait]
impl<K: std::fmt::Debug + Send + Sync> Observer<K> for LoggerObserver {
    async fn on_event(&self, e: &Event<K>) {
        match e.kind {
            EventKind::Queued => {
                println!("[queued] key={:?}", e.key);
            }
            EventKind::Updated => {
                println!("[updated] key={:?}", e.key);
            }
            EventKind::LeaseIssued => {
                println!(
                    "[lease-issued] key={:?} token={:?} timeout={:?}",
                    e.key, e.token, e.lease_timeout
                );
            }
            EventKind::LeaseAcked => {
                println!("[lease-acked] key={:?} token={:?}", e.key, e.token);
            }
            EventKind::LeaseReleased => {
                println!(
                    "[lease-released] key={:?} token={:?} front={:?}",
                    e.key, e.token, e.requeued_front
                );
            }
            EventKind::LeaseExpired => {
                println!("[lease-expired] key={:?} token={:?}", e.key, e.token);
            }
            EventKind::Closed => {
                println!("[closed]");
            }
        }
    }
}
