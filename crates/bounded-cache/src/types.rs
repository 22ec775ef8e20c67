//! Cache types

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

/// A cached value with its insertion and access timestamps
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry<V> {
    pub value: V,
    /// Set on insertion; the only input to TTL expiry
    pub created_at: DateTime<Utc>,
    /// Refreshed on every successful read
    pub last_accessed_at: DateTime<Utc>,
}

impl<V> CacheEntry<V> {
    pub(crate) fn new(value: V, now: DateTime<Utc>) -> Self {
        Self {
            value,
            created_at: now,
            last_accessed_at: now,
        }
    }

    /// Age of the entry relative to `now`
    pub fn age(&self, now: DateTime<Utc>) -> TimeDelta {
        now - self.created_at
    }

    /// A zero expiration expires every entry on its next read.
    pub fn is_expired(&self, now: DateTime<Utc>, expiration: TimeDelta) -> bool {
        expiration.is_zero() || self.age(now) > expiration
    }
}

/// Statistics about the cache
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    pub entries: usize,
    pub capacity: usize,
    pub hits: u64,
    pub misses: u64,
    /// Entries dropped to make room for a new key
    pub evictions: u64,
    /// Entries dropped because they outlived the expiration
    pub expirations: u64,
}

impl CacheStats {
    /// Fraction of lookups that hit, 0.0 when nothing was looked up
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}
