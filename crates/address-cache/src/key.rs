//! Cache key derivation from raw geocoding fields

use nominatim_address::RawAddress;
use std::fmt;

const DELIMITER: &str = "|";

/// Cache key built from the address fields that identify a location
///
/// Components, in order: street, house number, neighborhood, city, postal
/// code, country code. Empty components are dropped before joining, so
/// two records differing only in which fields are blank may share a key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    /// Derive a key, or `None` when every component is empty
    pub fn derive(raw: &RawAddress) -> Option<Self> {
        let components = [
            raw.street(),
            raw.house_number(),
            raw.neighborhood(),
            raw.city(),
            raw.postcode(),
            raw.country_code(),
        ];

        let parts: Vec<&str> = components
            .into_iter()
            .map(|c| c.unwrap_or_default())
            .filter(|c| !c.is_empty())
            .collect();

        if parts.is_empty() {
            None
        } else {
            Some(Self(parts.join(DELIMITER)))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
