use crate::events::Event;
use bounded_cache::CacheStats;
use nominatim_address::{RawAddress, StandardizedAddress};
use serde::Serialize;
use std::sync::Arc;

/// Value stored per cache key: the standardized address and the record it
/// was computed from
#[derive(Debug, Clone)]
pub struct CachedAddress {
    pub address: Arc<StandardizedAddress>,
    pub raw: Arc<RawAddress>,
}

/// Events broadcast to address observers
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum AddressEvent {
    /// Sent after every successful lookup, cached or computed
    #[serde(rename_all = "camelCase")]
    AddressUpdated {
        address: Arc<StandardizedAddress>,
        cache_size: usize,
    },
}

impl Event for AddressEvent {
    fn event_type(&self) -> &'static str {
        match self {
            AddressEvent::AddressUpdated { .. } => "addressUpdated",
        }
    }
}

/// Statistics about the address cache service
#[derive(Debug, Clone, Default, Serialize)]
pub struct ServiceStats {
    pub cache: CacheStats,
    /// Addresses produced by the standardizer (cache misses and bypasses)
    pub computed: u64,
    /// Lookups whose record had no key fields and skipped the cache
    pub uncacheable: u64,
    pub subscribers: usize,
    /// Number of fields with a registered change callback
    pub callbacks: usize,
}
