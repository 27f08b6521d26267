use std::time::{Duration, SystemTime};

use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Queued,
    Updated,
    LeaseIssued,
    LeaseAcked,
    LeaseReleased,
    LeaseExpired,
    Closed,
}

#[derive(Debug, Clone)]
pub struct Event<K> {
    pub kind: EventKind,
    pub at: SystemTime,
    pub key: Option<K>,
    pub token: Option<Uuid>,
    pub lease_timeout: Option<Duration>,
    pub requeued_front: Option<bool>,
}

impl<K> Event<K> {
    pub fn now(kind: EventKind) -> Self {
        Self {
            kind,
            at: SystemTime::now(),
            key: None,
            token: None,
            lease_timeout: None,
            requeued_front: None,
        }
    }

    pub fn with_key(mut self, key: K) -> Self {
        self.key = Some(key);
        self
    }

    pub fn with_token(mut self, token: Uuid) -> Self {
        self.token = Some(token);
        self
    }

    pub fn with_lease_timeout(mut self, d: Duration) -> Self {
        self.lease_timeout = Some(d);
        self
    }

    pub fn with_requeued_front(mut self, front: bool) -> Self {
        self.requeued_front = Some(front);
        self
    }
}
