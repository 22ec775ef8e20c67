//! LRU + TTL cache backed by an access-ordered map

use crate::error::{CacheError, Result};
use crate::types::{CacheEntry, CacheStats};
use chrono::{DateTime, TimeDelta, Utc};
use lru::LruCache;
use std::fmt;
use std::hash::Hash;
use std::num::NonZeroUsize;
use std::time::Duration;
use tracing::debug;

/// A capacity- and age-bounded key-value store
///
/// The cache never holds more than `max_size` entries. Reads mark an entry
/// as most recently used; inserting a new key at capacity evicts the least
/// recently used entry first. Expiry is measured from insertion time only,
/// so frequently read entries still expire.
pub struct BoundedCache<K, V> {
    /// Entries in access order (most recent first)
    entries: LruCache<K, CacheEntry<V>>,
    max_size: NonZeroUsize,
    expiration: TimeDelta,
    hits: u64,
    misses: u64,
    evictions: u64,
    expirations: u64,
}

impl<K, V> BoundedCache<K, V>
where
    K: Hash + Eq + Clone + fmt::Debug,
    V: Clone,
{
    /// Create a new cache holding at most `max_size` entries, each valid
    /// for `expiration` after insertion
    pub fn new(max_size: usize, expiration: Duration) -> Result<Self> {
        let capacity = NonZeroUsize::new(max_size).ok_or(CacheError::InvalidCapacity(max_size))?;
        let expiration = TimeDelta::from_std(expiration)
            .map_err(|e| CacheError::InvalidExpiration(e.to_string()))?;

        Ok(Self {
            entries: LruCache::new(capacity),
            max_size: capacity,
            expiration,
            hits: 0,
            misses: 0,
            evictions: 0,
            expirations: 0,
        })
    }

    /// Get a value, marking it most recently used
    ///
    /// Expired entries are removed and reported as absent.
    pub fn get(&mut self, key: &K) -> Option<V> {
        self.get_at(key, Utc::now())
    }

    pub(crate) fn get_at(&mut self, key: &K, now: DateTime<Utc>) -> Option<V> {
        let expired = match self.entries.peek(key) {
            Some(entry) => entry.is_expired(now, self.expiration),
            None => {
                self.misses += 1;
                return None;
            }
        };

        if expired {
            self.entries.pop(key);
            self.expirations += 1;
            self.misses += 1;
            debug!(key = ?key, "Cache entry expired");
            return None;
        }

        let entry = self.entries.get_mut(key)?;
        entry.last_accessed_at = now;
        self.hits += 1;
        Some(entry.value.clone())
    }

    /// Store a value, returning the key evicted to make room for it
    ///
    /// Overwriting an existing key never evicts; it restarts the entry's
    /// expiry clock and marks it most recently used.
    pub fn set(&mut self, key: K, value: V) -> Option<K> {
        self.set_at(key, value, Utc::now())
    }

    pub(crate) fn set_at(&mut self, key: K, value: V, now: DateTime<Utc>) -> Option<K> {
        let existed = self.entries.contains(&key);
        let displaced = self.entries.push(key, CacheEntry::new(value, now));

        if existed {
            return None;
        }

        let (evicted, _) = displaced?;
        self.evictions += 1;
        debug!(key = ?evicted, "Evicted least recently used cache entry");
        Some(evicted)
    }

    /// Check whether a live entry exists without touching recency
    pub fn has(&self, key: &K) -> bool {
        self.has_at(key, Utc::now())
    }

    pub(crate) fn has_at(&self, key: &K, now: DateTime<Utc>) -> bool {
        self.entries
            .peek(key)
            .is_some_and(|entry| !entry.is_expired(now, self.expiration))
    }

    /// Inspect an entry without touching recency or expiry
    pub fn peek_entry(&self, key: &K) -> Option<&CacheEntry<V>> {
        self.entries.peek(key)
    }

    /// Remove every expired entry, returning how many were dropped
    pub fn clean_expired(&mut self) -> usize {
        self.clean_expired_at(Utc::now())
    }

    pub(crate) fn clean_expired_at(&mut self, now: DateTime<Utc>) -> usize {
        let expired: Vec<K> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired(now, self.expiration))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired {
            self.entries.pop(key);
        }

        let removed = expired.len();
        self.expirations += removed as u64;
        if removed > 0 {
            debug!(removed, remaining = self.entries.len(), "Removed expired cache entries");
        }
        removed
    }

    /// Drop every entry. Counters are kept.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of entries currently stored, expired or not
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn max_size(&self) -> usize {
        self.max_size.get()
    }

    pub fn expiration(&self) -> TimeDelta {
        self.expiration
    }

    /// Get current cache statistics
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.entries.len(),
            capacity: self.max_size.get(),
            hits: self.hits,
            misses: self.misses,
            evictions: self.evictions,
            expirations: self.expirations,
        }
    }
}

impl<K: Hash + Eq, V> fmt::Debug for BoundedCache<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundedCache")
            .field("len", &self.entries.len())
            .field("max_size", &self.max_size)
            .field("expiration", &self.expiration)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOUR: Duration = Duration::from_secs(3600);

    fn cache(max_size: usize) -> BoundedCache<String, u32> {
        BoundedCache::new(max_size, HOUR).unwrap()
    }

    fn key(s: &str) -> String {
        s.to_string()
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let result = BoundedCache::<String, u32>::new(0, HOUR);
        assert_eq!(result.unwrap_err(), CacheError::InvalidCapacity(0));
    }

    #[test]
    fn test_oversized_expiration_rejected() {
        let result = BoundedCache::<String, u32>::new(10, Duration::MAX);
        assert!(matches!(result, Err(CacheError::InvalidExpiration(_))));
    }

    #[test]
    fn test_set_and_get() {
        let mut cache = cache(10);
        assert_eq!(cache.set(key("a"), 1), None);
        assert_eq!(cache.get(&key("a")), Some(1));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_miss() {
        let mut cache = cache(10);
        assert_eq!(cache.get(&key("missing")), None);
        assert_eq!(cache.stats().misses, 1);
    }

    #[test]
    fn test_eviction_scenario() {
        let mut cache = cache(3);
        cache.set(key("k1"), 1);
        cache.set(key("k2"), 2);
        cache.set(key("k3"), 3);
        let evicted = cache.set(key("k4"), 4);

        assert_eq!(evicted, Some(key("k1")));
        assert!(!cache.has(&key("k1")));
        assert!(cache.has(&key("k4")));
        assert_eq!(cache.len(), 3);
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn test_read_refreshes_recency() {
        let mut cache = cache(3);
        cache.set(key("k1"), 1);
        cache.set(key("k2"), 2);
        cache.set(key("k3"), 3);

        // k1 becomes most recent, leaving k2 as the oldest
        assert_eq!(cache.get(&key("k1")), Some(1));
        let evicted = cache.set(key("k4"), 4);

        assert_eq!(evicted, Some(key("k2")));
        assert!(cache.has(&key("k1")));
        assert!(!cache.has(&key("k2")));
    }

    #[test]
    fn test_has_does_not_refresh_recency() {
        let mut cache = cache(2);
        cache.set(key("k1"), 1);
        cache.set(key("k2"), 2);

        assert!(cache.has(&key("k1")));
        cache.set(key("k3"), 3);

        assert!(!cache.has(&key("k1")));
        assert!(cache.has(&key("k2")));
    }

    #[test]
    fn test_size_never_exceeds_capacity() {
        let mut cache = cache(4);
        for i in 0..50u32 {
            cache.set(format!("k{}", i % 9), i);
            if i % 3 == 0 {
                cache.get(&format!("k{}", i % 5));
            }
            assert!(cache.len() <= 4);
        }
    }

    #[test]
    fn test_overwrite_does_not_evict() {
        let mut cache = cache(2);
        cache.set(key("k1"), 1);
        cache.set(key("k2"), 2);
        assert_eq!(cache.set(key("k1"), 10), None);

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get(&key("k1")), Some(10));
        assert_eq!(cache.stats().evictions, 0);
        // Overwrite made k1 most recent, so k2 goes next
        assert_eq!(cache.set(key("k3"), 3), Some(key("k2")));
    }

    #[test]
    fn test_capacity_one() {
        let mut cache = cache(1);
        cache.set(key("k1"), 1);
        assert_eq!(cache.set(key("k2"), 2), Some(key("k1")));
        assert_eq!(cache.set(key("k3"), 3), Some(key("k2")));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(&key("k3")), Some(3));
    }

    #[test]
    fn test_get_updates_last_accessed_only() {
        let mut cache = cache(2);
        let inserted = Utc::now();
        cache.set_at(key("k1"), 1, inserted);

        let later = inserted + TimeDelta::seconds(30);
        assert_eq!(cache.get_at(&key("k1"), later), Some(1));

        let entry = cache.peek_entry(&key("k1")).unwrap();
        assert_eq!(entry.created_at, inserted);
        assert_eq!(entry.last_accessed_at, later);
    }

    #[test]
    fn test_overwrite_restarts_expiry_clock() {
        let mut cache = BoundedCache::<String, u32>::new(2, Duration::from_secs(60)).unwrap();
        let start = Utc::now();
        cache.set_at(key("k1"), 1, start);
        cache.set_at(key("k1"), 2, start + TimeDelta::seconds(50));

        assert_eq!(cache.get_at(&key("k1"), start + TimeDelta::seconds(100)), Some(2));
    }

    #[test]
    fn test_frequent_reads_do_not_extend_ttl() {
        let mut cache = BoundedCache::<String, u32>::new(2, Duration::from_secs(60)).unwrap();
        let start = Utc::now();
        cache.set_at(key("k1"), 1, start);

        for secs in [10, 20, 30, 40, 50] {
            assert!(cache.get_at(&key("k1"), start + TimeDelta::seconds(secs)).is_some());
        }
        assert_eq!(cache.get_at(&key("k1"), start + TimeDelta::seconds(61)), None);
    }

    #[test]
    fn test_ttl_expiration_removes_entry() {
        let mut cache = BoundedCache::<String, u32>::new(10, Duration::from_millis(100)).unwrap();
        cache.set(key("k1"), 1);

        std::thread::sleep(Duration::from_millis(150));

        assert_eq!(cache.get(&key("k1")), None);
        assert_eq!(cache.len(), 0);
        assert!(cache.peek_entry(&key("k1")).is_none());
        assert_eq!(cache.stats().expirations, 1);
    }

    #[test]
    fn test_zero_expiration_expires_on_next_read() {
        let mut cache = BoundedCache::<String, u32>::new(10, Duration::ZERO).unwrap();
        cache.set(key("k1"), 1);
        assert_eq!(cache.get(&key("k1")), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_has_reports_expired_without_removing() {
        let mut cache = BoundedCache::<String, u32>::new(10, Duration::from_secs(10)).unwrap();
        let start = Utc::now();
        cache.set_at(key("k1"), 1, start);

        let later = start + TimeDelta::seconds(11);
        assert!(!cache.has_at(&key("k1"), later));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_clean_expired_counts_removed() {
        let mut cache = BoundedCache::<String, u32>::new(10, Duration::from_secs(10)).unwrap();
        let start = Utc::now();
        cache.set_at(key("old1"), 1, start);
        cache.set_at(key("old2"), 2, start);
        cache.set_at(key("fresh"), 3, start + TimeDelta::seconds(8));

        let removed = cache.clean_expired_at(start + TimeDelta::seconds(12));

        assert_eq!(removed, 2);
        assert_eq!(cache.len(), 1);
        assert!(cache.peek_entry(&key("fresh")).is_some());
        assert_eq!(cache.clean_expired_at(start + TimeDelta::seconds(12)), 0);
    }

    #[test]
    fn test_clear() {
        let mut cache = cache(5);
        cache.set(key("k1"), 1);
        cache.set(key("k2"), 2);

        cache.clear();
        assert!(cache.is_empty());
        assert!(!cache.has(&key("k1")));
        assert_eq!(cache.max_size(), 5);
    }

    #[test]
    fn test_debug_output() {
        let mut cache = cache(3);
        cache.set(key("k1"), 1);

        let debug = format!("{:?}", cache);
        assert!(debug.starts_with("BoundedCache"));
        assert!(debug.contains("len: 1"));
        assert!(debug.contains("max_size: 3"));
    }

    #[test]
    fn test_stats() {
        let mut cache = cache(5);
        cache.get(&key("k1"));
        cache.set(key("k1"), 1);
        cache.get(&key("k1"));

        let stats = cache.stats();
        assert_eq!(stats.entries, 1);
        assert_eq!(stats.capacity, 5);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
    }
}
