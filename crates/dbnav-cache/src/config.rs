//! Cache configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default lifetime of a populated snapshot: five minutes
pub const DEFAULT_TTL_SECS: u64 = 300;

/// Default capacity of the population event channel
pub const DEFAULT_EVENT_CAPACITY: usize = 64;

/// Tuning for [`crate::ResourceDetailCache`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Seconds a populated snapshot stays servable
    pub ttl_secs: u64,
    /// Buffered population events per subscriber before it lags
    pub event_capacity: usize,
}

impl CacheConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With snapshot lifetime in seconds
    #[inline]
    #[must_use]
    pub fn with_ttl_secs(mut self, ttl_secs: u64) -> Self {
        self.ttl_secs = ttl_secs;
        self
    }

    /// With event channel capacity (at least one)
    #[inline]
    #[must_use]
    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity;
        self
    }

    /// Snapshot lifetime
    #[inline]
    #[must_use]
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: DEFAULT_TTL_SECS,
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}
