//! Address lookup caching with change detection and notification

use crate::change::{ChangeDetails, ChangeTracker, FieldPhase, TrackedField};
use crate::config::AddressCacheConfig;
use crate::error::{AddressCacheError, Result};
use crate::events::{guarded, Dispatch, EventBus, ListenerResult, Observer, SubscriptionId};
use crate::key::CacheKey;
use crate::sweep::Sweeper;
use crate::types::{AddressEvent, CachedAddress, ServiceStats};
use bounded_cache::BoundedCache;
use nominatim_address::{
    AddressStandardizer, NominatimStandardizer, RawAddress, StandardizedAddress,
};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::runtime::Handle;
use tracing::{debug, info, warn};

/// Callback invoked when a tracked field changes
pub type ChangeCallback = Arc<dyn Fn(&ChangeDetails) -> ListenerResult + Send + Sync>;

/// Wrap a closure as a [`ChangeCallback`]
pub fn change_callback<F>(callback: F) -> ChangeCallback
where
    F: Fn(&ChangeDetails) -> ListenerResult + Send + Sync + 'static,
{
    Arc::new(callback)
}

/// Build a service and share it with the rest of the application
pub fn create_address_cache_service(
    config: AddressCacheConfig,
    standardizer: Arc<dyn AddressStandardizer>,
) -> Result<Arc<AddressCacheService>> {
    AddressCacheService::new(config, standardizer).map(Arc::new)
}

/// Caches standardized addresses and reports street, neighborhood and city
/// transitions between successive computed addresses
///
/// All state lives behind a single lock. Callbacks and observers run after
/// the lock is released, so they may call back into the service.
///
/// After [`destroy`](Self::destroy) every operation except `destroy`,
/// `shutdown`, `is_destroyed` and `config` fails with
/// [`AddressCacheError::Destroyed`].
pub struct AddressCacheService {
    shared: Arc<Shared>,
    sweeper: Mutex<Option<Sweeper>>,
}

pub(crate) struct Shared {
    config: AddressCacheConfig,
    standardizer: Arc<dyn AddressStandardizer>,
    /// `None` once destroyed
    state: Mutex<Option<ServiceState>>,
}

struct ServiceState {
    cache: BoundedCache<CacheKey, CachedAddress>,
    snapshots: SnapshotPair,
    tracker: ChangeTracker,
    callbacks: FieldCallbacks,
    bus: EventBus<AddressEvent>,
    computed: u64,
    uncacheable: u64,
}

/// The latest computed address and the one before it
#[derive(Default)]
struct SnapshotPair {
    current: Option<Arc<StandardizedAddress>>,
    previous: Option<Arc<StandardizedAddress>>,
}

impl SnapshotPair {
    fn push(&mut self, next: Arc<StandardizedAddress>) {
        self.previous = self.current.replace(next);
    }

    fn pair(&self) -> (Option<&StandardizedAddress>, Option<&StandardizedAddress>) {
        (self.previous.as_deref(), self.current.as_deref())
    }
}

#[derive(Default)]
struct FieldCallbacks {
    street: Option<ChangeCallback>,
    neighborhood: Option<ChangeCallback>,
    city: Option<ChangeCallback>,
}

impl FieldCallbacks {
    fn slot(&self, field: TrackedField) -> &Option<ChangeCallback> {
        match field {
            TrackedField::Street => &self.street,
            TrackedField::Neighborhood => &self.neighborhood,
            TrackedField::City => &self.city,
        }
    }

    fn slot_mut(&mut self, field: TrackedField) -> &mut Option<ChangeCallback> {
        match field {
            TrackedField::Street => &mut self.street,
            TrackedField::Neighborhood => &mut self.neighborhood,
            TrackedField::City => &mut self.city,
        }
    }

    fn count(&self) -> usize {
        TrackedField::ALL
            .into_iter()
            .filter(|field| self.slot(*field).is_some())
            .count()
    }
}

/// Notifications collected under the lock, delivered after it is released
struct Notifications {
    address: Arc<StandardizedAddress>,
    changes: Vec<(ChangeDetails, ChangeCallback)>,
    event: AddressEvent,
    observers: Dispatch<AddressEvent>,
}

impl Notifications {
    fn deliver(&self) {
        for (details, callback) in &self.changes {
            let context = format!("{} change callback", details.field);
            guarded(&context, || callback(details));
        }
        self.observers.deliver(&self.event);
    }
}

impl ServiceState {
    fn lookup_or_compute(
        &mut self,
        key: Option<CacheKey>,
        raw: &RawAddress,
        standardizer: &dyn AddressStandardizer,
    ) -> Notifications {
        if let Some(ref key) = key {
            if let Some(hit) = self.cache.get(key) {
                debug!(key = %key, "Address cache hit");
                return self.notifications(hit.address, Vec::new());
            }
        }

        let address = Arc::new(standardizer.standardize(raw));
        self.computed += 1;

        match key {
            Some(key) => {
                debug!(key = %key, "Address cache miss");
                let entry = CachedAddress {
                    address: Arc::clone(&address),
                    raw: Arc::new(raw.clone()),
                };
                self.cache.set(key, entry);
            }
            None => {
                self.uncacheable += 1;
                debug!("Raw address has no key fields, bypassing cache");
            }
        }

        self.snapshots.push(Arc::clone(&address));
        let changes = self.detect_changes();
        self.notifications(address, changes)
    }

    /// Consume the transition of every field that has a callback
    fn detect_changes(&mut self) -> Vec<(ChangeDetails, ChangeCallback)> {
        let (previous, current) = self.snapshots.pair();
        let mut changes = Vec::new();

        for field in TrackedField::ALL {
            let Some(callback) = self.callbacks.slot(field) else {
                continue;
            };
            if !self.tracker.check(field, previous, current) {
                continue;
            }

            let details = ChangeTracker::details(field, previous, current);
            info!(
                field = %field,
                previous = details.previous.value.as_deref().unwrap_or(""),
                current = details.current.value.as_deref().unwrap_or(""),
                "Address field changed"
            );
            changes.push((details, Arc::clone(callback)));
        }

        changes
    }

    fn notifications(
        &self,
        address: Arc<StandardizedAddress>,
        changes: Vec<(ChangeDetails, ChangeCallback)>,
    ) -> Notifications {
        let event = AddressEvent::AddressUpdated {
            address: Arc::clone(&address),
            cache_size: self.cache.len(),
        };
        Notifications {
            address,
            changes,
            event,
            observers: self.bus.snapshot(),
        }
    }
}

impl Shared {
    fn with_state<T>(&self, f: impl FnOnce(&mut ServiceState) -> T) -> Result<T> {
        let mut guard = self.state.lock();
        let state = guard.as_mut().ok_or(AddressCacheError::Destroyed)?;
        Ok(f(state))
    }

    /// Remove expired entries; `None` once the service is destroyed
    pub(crate) fn sweep(&self) -> Option<usize> {
        let mut guard = self.state.lock();
        let state = guard.as_mut()?;
        let removed = state.cache.clean_expired();
        if removed > 0 {
            info!(removed, remaining = state.cache.len(), "Swept expired addresses");
        }
        Some(removed)
    }
}

impl AddressCacheService {
    /// Create a service and start its background sweep
    ///
    /// Must be called inside a tokio runtime.
    pub fn new(
        config: AddressCacheConfig,
        standardizer: Arc<dyn AddressStandardizer>,
    ) -> Result<Self> {
        config.validate()?;
        let runtime = Handle::try_current().map_err(|_| AddressCacheError::NoRuntime)?;
        let cache = BoundedCache::new(config.max_size, config.expiration)?;

        let state = ServiceState {
            cache,
            snapshots: SnapshotPair::default(),
            tracker: ChangeTracker::new(),
            callbacks: FieldCallbacks::default(),
            bus: EventBus::new(),
            computed: 0,
            uncacheable: 0,
        };

        let shared = Arc::new(Shared {
            config,
            standardizer,
            state: Mutex::new(Some(state)),
        });

        let sweeper = Sweeper::spawn(
            &runtime,
            Arc::downgrade(&shared),
            shared.config.sweep_interval,
        );

        info!(
            max_size = shared.config.max_size,
            expiration_ms = shared.config.expiration.as_millis() as u64,
            sweep_interval_ms = shared.config.sweep_interval.as_millis() as u64,
            "Address cache service started"
        );

        Ok(Self {
            shared,
            sweeper: Mutex::new(Some(sweeper)),
        })
    }

    /// Create a service with default limits and the Nominatim standardizer
    pub fn with_defaults() -> Result<Self> {
        Self::new(AddressCacheConfig::default(), Arc::new(NominatimStandardizer))
    }

    pub fn config(&self) -> &AddressCacheConfig {
        &self.shared.config
    }

    /// Return the standardized address for `raw`, computing and caching it
    /// on a miss
    ///
    /// Only computed addresses advance the snapshot pair and run change
    /// detection; a cache hit is not movement. Observers are notified in
    /// both cases.
    pub fn get_or_compute(&self, raw: &RawAddress) -> Result<Arc<StandardizedAddress>> {
        let key = CacheKey::derive(raw);
        let standardizer = self.shared.standardizer.as_ref();
        let notifications = self
            .shared
            .with_state(|state| state.lookup_or_compute(key, raw, standardizer))?;

        notifications.deliver();
        Ok(notifications.address)
    }

    /// Whether `field` changed since it was last reported. Consuming: a
    /// second call for the same transition returns `false`.
    pub fn has_changed(&self, field: TrackedField) -> Result<bool> {
        self.shared.with_state(|state| {
            let (previous, current) = state.snapshots.pair();
            state.tracker.check(field, previous, current)
        })
    }

    pub fn has_street_changed(&self) -> Result<bool> {
        self.has_changed(TrackedField::Street)
    }

    pub fn has_neighborhood_changed(&self) -> Result<bool> {
        self.has_changed(TrackedField::Neighborhood)
    }

    pub fn has_city_changed(&self) -> Result<bool> {
        self.has_changed(TrackedField::City)
    }

    /// Describe the current transition of `field` without consuming it
    pub fn change_details(&self, field: TrackedField) -> Result<ChangeDetails> {
        self.shared.with_state(|state| {
            let (previous, current) = state.snapshots.pair();
            ChangeTracker::details(field, previous, current)
        })
    }

    pub fn street_change_details(&self) -> Result<ChangeDetails> {
        self.change_details(TrackedField::Street)
    }

    pub fn neighborhood_change_details(&self) -> Result<ChangeDetails> {
        self.change_details(TrackedField::Neighborhood)
    }

    pub fn city_change_details(&self) -> Result<ChangeDetails> {
        self.change_details(TrackedField::City)
    }

    pub fn field_phase(&self, field: TrackedField) -> Result<FieldPhase> {
        self.shared.with_state(|state| {
            let (previous, current) = state.snapshots.pair();
            state.tracker.phase(field, previous, current)
        })
    }

    /// Register the callback for `field`, replacing any previous one.
    /// `None` removes it.
    pub fn set_change_callback(
        &self,
        field: TrackedField,
        callback: Option<ChangeCallback>,
    ) -> Result<()> {
        let replaced = self.shared.with_state(|state| {
            let slot = state.callbacks.slot_mut(field);
            std::mem::replace(slot, callback)
        })?;
        debug!(field = %field, replaced = replaced.is_some(), "Change callback updated");
        Ok(())
    }

    pub fn set_street_change_callback(&self, callback: Option<ChangeCallback>) -> Result<()> {
        self.set_change_callback(TrackedField::Street, callback)
    }

    pub fn set_neighborhood_change_callback(&self, callback: Option<ChangeCallback>) -> Result<()> {
        self.set_change_callback(TrackedField::Neighborhood, callback)
    }

    pub fn set_city_change_callback(&self, callback: Option<ChangeCallback>) -> Result<()> {
        self.set_change_callback(TrackedField::City, callback)
    }

    /// Register an observer for `addressUpdated` events
    pub fn subscribe(&self, observer: Arc<dyn Observer<AddressEvent>>) -> Result<SubscriptionId> {
        self.shared.with_state(|state| state.bus.subscribe(observer))
    }

    /// Register a callback for `addressUpdated` events
    pub fn subscribe_fn<F>(&self, callback: F) -> Result<SubscriptionId>
    where
        F: Fn(&AddressEvent) -> ListenerResult + Send + Sync + 'static,
    {
        self.shared.with_state(|state| state.bus.subscribe_fn(callback))
    }

    /// Remove an observer; returns whether it was subscribed
    pub fn unsubscribe<O: ?Sized>(&self, observer: &Arc<O>) -> Result<bool> {
        self.shared.with_state(|state| state.bus.unsubscribe(observer))
    }

    pub fn unsubscribe_id(&self, id: SubscriptionId) -> Result<bool> {
        self.shared.with_state(|state| state.bus.unsubscribe_id(id))
    }

    pub fn subscriber_count(&self) -> Result<usize> {
        self.shared.with_state(|state| state.bus.len())
    }

    /// Look up the cached entry for `raw` without computing, promoting it
    /// or touching hit/miss counters. Expired entries are reported as absent.
    pub fn peek(&self, raw: &RawAddress) -> Result<Option<CachedAddress>> {
        let Some(key) = CacheKey::derive(raw) else {
            return Ok(None);
        };
        self.shared.with_state(|state| {
            if !state.cache.has(&key) {
                return None;
            }
            state.cache.peek_entry(&key).map(|entry| entry.value.clone())
        })
    }

    pub fn cache_size(&self) -> Result<usize> {
        self.shared.with_state(|state| state.cache.len())
    }

    pub fn current_address(&self) -> Result<Option<Arc<StandardizedAddress>>> {
        self.shared.with_state(|state| state.snapshots.current.clone())
    }

    pub fn previous_address(&self) -> Result<Option<Arc<StandardizedAddress>>> {
        self.shared.with_state(|state| state.snapshots.previous.clone())
    }

    /// Drop every cached address. Snapshots and callbacks are kept.
    pub fn clear_cache(&self) -> Result<()> {
        self.shared.with_state(|state| state.cache.clear())
    }

    /// Run the expired-entry sweep now
    pub fn clean_expired(&self) -> Result<usize> {
        self.shared.sweep().ok_or(AddressCacheError::Destroyed)
    }

    pub fn stats(&self) -> Result<ServiceStats> {
        self.shared.with_state(|state| ServiceStats {
            cache: state.cache.stats(),
            computed: state.computed,
            uncacheable: state.uncacheable,
            subscribers: state.bus.len(),
            callbacks: state.callbacks.count(),
        })
    }

    pub fn is_destroyed(&self) -> bool {
        self.shared.state.lock().is_none()
    }

    /// Stop the sweep, clear the cache and release snapshots, callbacks and
    /// observers. Calling it again does nothing.
    ///
    /// Once this returns no sweep can touch the cache: the sweep checks for
    /// a destroyed state under the same lock before doing any work.
    pub fn destroy(&self) {
        if let Some(sweeper) = self.sweeper.lock().take() {
            drop(sweeper.cancel());
        }

        // Released state is dropped outside the lock
        let released = self.shared.state.lock().take();
        match released {
            Some(mut state) => {
                state.cache.clear();
                info!(computed = state.computed, "Address cache service destroyed");
            }
            None => debug!("Address cache service already destroyed"),
        }
    }

    /// Destroy the service and wait for the sweep task to finish
    pub async fn shutdown(&self) {
        let handle = self.sweeper.lock().take().map(Sweeper::cancel);
        self.destroy();

        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                warn!(error = %e, "Address cache sweep task failed");
            }
        }
    }
}

impl Drop for AddressCacheService {
    fn drop(&mut self) {
        self.destroy();
    }
}
