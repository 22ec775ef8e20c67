//! Address lookup cache with change detection
//!
//! Raw reverse geocoding records are standardized once and cached by their
//! address fields. Every computed address becomes the new current snapshot,
//! and the street, neighborhood and city of the current snapshot are compared
//! with the previous one. A transition is reported once, either through a
//! registered per-field callback or a consuming `has_*_changed` check.
//!
//! ```no_run
//! use address_cache::{change_callback, AddressCacheService};
//! use nominatim_address::RawAddress;
//!
//! # async fn run(records: Vec<RawAddress>) -> address_cache::Result<()> {
//! let service = AddressCacheService::with_defaults()?;
//! service.set_city_change_callback(Some(change_callback(|details| {
//!     println!("entered {:?}", details.current.combined_label);
//!     Ok(())
//! })))?;
//!
//! for record in &records {
//!     service.get_or_compute(record)?;
//! }
//! service.shutdown().await;
//! # Ok(())
//! # }
//! ```

pub mod change;
pub mod config;
pub mod error;
pub mod events;
pub mod key;
pub mod service;
mod sweep;
pub mod types;

pub use change::{
    ChangeDetails, ChangeSignature, ChangeTracker, FieldPhase, FieldState, FieldValue, TrackedField,
};
pub use config::AddressCacheConfig;
pub use error::{AddressCacheError, Result};
pub use events::{Event, EventBus, ListenerError, ListenerResult, Observer, SubscriptionId};
pub use key::CacheKey;
pub use service::{
    change_callback, create_address_cache_service, AddressCacheService, ChangeCallback,
};
pub use types::{AddressEvent, CachedAddress, ServiceStats};
