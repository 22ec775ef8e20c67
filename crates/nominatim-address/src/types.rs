use serde::{Deserialize, Serialize};

/// A reverse geocoding record as returned by Nominatim (`format=json`,
/// `addressdetails=1`)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawAddress {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub place_id: Option<u64>,
    /// Nominatim sends coordinates as strings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lat: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<NominatimAddress>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NominatimAddress {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub road: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub street: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pedestrian: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub house_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub neighbourhood: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suburb: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quarter: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub town: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub village: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub municipality: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    /// Subdivision code such as `BR-MG`
    #[serde(
        rename = "ISO3166-2-lvl4",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub iso3166_2_lvl4: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postcode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country_code: Option<String>,
}

impl RawAddress {
    /// Street name: `road`, falling back to `street`
    pub fn street(&self) -> Option<&str> {
        self.field(|a| a.road.as_deref().or(a.street.as_deref()))
    }

    pub fn house_number(&self) -> Option<&str> {
        self.field(|a| a.house_number.as_deref())
    }

    /// Neighborhood: `neighbourhood`, falling back to `suburb`
    pub fn neighborhood(&self) -> Option<&str> {
        self.field(|a| a.neighbourhood.as_deref().or(a.suburb.as_deref()))
    }

    /// City: `city`, then `town`, then `village`, then `municipality`
    pub fn city(&self) -> Option<&str> {
        self.field(|a| {
            a.city
                .as_deref()
                .or(a.town.as_deref())
                .or(a.village.as_deref())
                .or(a.municipality.as_deref())
        })
    }

    pub fn postcode(&self) -> Option<&str> {
        self.field(|a| a.postcode.as_deref())
    }

    pub fn country_code(&self) -> Option<&str> {
        self.field(|a| a.country_code.as_deref())
    }

    fn field<'a>(
        &'a self,
        pick: impl FnOnce(&'a NominatimAddress) -> Option<&'a str>,
    ) -> Option<&'a str> {
        self.address.as_ref().and_then(pick)
    }
}

/// Flat address produced by standardization
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StandardizedAddress {
    pub street: Option<String>,
    pub house_number: Option<String>,
    pub neighborhood: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    /// Two-letter state abbreviation, e.g. `MG`
    pub state_code: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
    /// Upper-cased ISO 3166-1 alpha-2 code
    pub country_code: Option<String>,
}

impl StandardizedAddress {
    /// City with its state abbreviation, e.g. `Serro, MG`
    pub fn city_label(&self) -> Option<String> {
        let city = self.city.as_deref()?;
        Some(match self.state_code.as_deref() {
            Some(uf) => format!("{}, {}", city, uf),
            None => city.to_string(),
        })
    }
}
