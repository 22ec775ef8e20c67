use crate::types::{NominatimAddress, RawAddress, StandardizedAddress};

/// Turns a raw geocoding record into a standardized address
///
/// Implementations must be pure: the same record always yields the same
/// address, since results are cached by record fields.
pub trait AddressStandardizer: Send + Sync {
    fn standardize(&self, raw: &RawAddress) -> StandardizedAddress;
}

impl<F> AddressStandardizer for F
where
    F: Fn(&RawAddress) -> StandardizedAddress + Send + Sync,
{
    fn standardize(&self, raw: &RawAddress) -> StandardizedAddress {
        self(raw)
    }
}

/// Standardizer for Nominatim `addressdetails` records
#[derive(Debug, Clone, Copy, Default)]
pub struct NominatimStandardizer;

impl AddressStandardizer for NominatimStandardizer {
    fn standardize(&self, raw: &RawAddress) -> StandardizedAddress {
        match raw.address {
            Some(ref addr) => standardize_address(addr),
            None => StandardizedAddress::default(),
        }
    }
}

fn standardize_address(addr: &NominatimAddress) -> StandardizedAddress {
    let mut result = StandardizedAddress {
        house_number: non_empty(&addr.house_number),
        state: non_empty(&addr.state),
        postal_code: non_empty(&addr.postcode),
        country: non_empty(&addr.country),
        ..Default::default()
    };

    // Street - try road, then street, then pedestrian
    result.street = first_present(&[&addr.road, &addr.street, &addr.pedestrian]);

    // Neighborhood - try neighbourhood, then suburb, then quarter
    result.neighborhood = first_present(&[&addr.neighbourhood, &addr.suburb, &addr.quarter]);

    // City - try city, then town, then village, then municipality
    result.city = first_present(&[&addr.city, &addr.town, &addr.village, &addr.municipality]);

    // State abbreviation from the subdivision code ("BR-MG" -> "MG")
    result.state_code = addr
        .iso3166_2_lvl4
        .as_deref()
        .and_then(|code| code.split_once('-'))
        .map(|(_, subdivision)| subdivision.trim())
        .filter(|subdivision| !subdivision.is_empty())
        .map(str::to_uppercase);

    result.country_code = addr
        .country_code
        .as_deref()
        .map(str::trim)
        .filter(|cc| !cc.is_empty())
        .map(str::to_uppercase);

    result
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn first_present(candidates: &[&Option<String>]) -> Option<String> {
    candidates.iter().find_map(|candidate| non_empty(candidate))
}
