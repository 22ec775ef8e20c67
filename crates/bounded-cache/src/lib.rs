//! Bounded in-memory cache with TTL expiration and LRU eviction
//!
//! Entries are ordered by access recency. Inserting a new key into a full
//! cache evicts the least recently used entry, and entries older than the
//! configured expiration are dropped on read or by an explicit sweep.

mod cache;
mod error;
mod types;

pub use cache::BoundedCache;
pub use error::{CacheError, Result};
pub use types::{CacheEntry, CacheStats};
