//! # Queue construction options.
//!
//! [`QueueConfig`] controls lease expiry, the reaper's scan cadence, and the
//! capacity of the event channel.
//!
//! # Example
//! ```
//! use std::time::Duration;
//! use leaseq::QueueConfig;
//!
//! let mut cfg = QueueConfig::default();
//! cfg.default_lease_timeout = Some(Duration::from_secs(30));
//!
//! assert_eq!(cfg.reaper_interval, Duration::from_millis(100));
//! assert_eq!(cfg.bus_capacity, 1024);
//! ```

use std::time::Duration;

/// Construction options for a [`LeasedKeyQueue`](crate::LeasedKeyQueue).
#[derive(Clone, Debug)]
pub struct QueueConfig {
    /// Default timeout applied to every lease that does not override it.
    ///
    /// When set, the background reaper auto-releases leases older than this
    /// back to the front of the queue. `None` means leases never expire.
    /// A zero duration is permitted and expires leases on issuance.
    pub default_lease_timeout: Option<Duration>,
    /// Interval between reaper scans over in-flight leases.
    pub reaper_interval: Duration,
    /// Capacity of the lifecycle event channel.
    pub bus_capacity: usize,
}

impl Default for QueueConfig {
    /// Provides a default configuration:
    /// - `default_lease_timeout = None` (leases never expire)
    /// - `reaper_interval = 100ms`
    /// - `bus_capacity = 1024`
    fn default() -> Self {
        Self {
            default_lease_timeout: None,
            reaper_interval: Duration::from_millis(100),
            bus_capacity: 1024,
        }
    }
}
