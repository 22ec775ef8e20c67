//! Nominatim Address Records
//!
//! Serde model of [Nominatim](https://nominatim.org/) reverse geocoding
//! records and the standardization step that turns one into a flat,
//! display-ready address.

mod standardize;
mod types;

pub use standardize::{AddressStandardizer, NominatimStandardizer};
pub use types::{NominatimAddress, RawAddress, StandardizedAddress};
