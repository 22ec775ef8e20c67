//! Street, neighborhood and city change detection
//!
//! Each tracked field remembers the last transition it reported. A check
//! reports a transition between the previous and current address once;
//! asking again before the next distinct transition reports nothing.

use chrono::{DateTime, Utc};
use nominatim_address::StandardizedAddress;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Address fields whose transitions are tracked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackedField {
    Street,
    Neighborhood,
    City,
}

impl TrackedField {
    pub const ALL: [TrackedField; 3] = [
        TrackedField::Street,
        TrackedField::Neighborhood,
        TrackedField::City,
    ];

    pub fn name(self) -> &'static str {
        match self {
            TrackedField::Street => "street",
            TrackedField::Neighborhood => "neighborhood",
            TrackedField::City => "city",
        }
    }

    /// The field's value in a standardized address
    pub fn value(self, address: &StandardizedAddress) -> Option<&str> {
        match self {
            TrackedField::Street => address.street.as_deref(),
            TrackedField::Neighborhood => address.neighborhood.as_deref(),
            TrackedField::City => address.city.as_deref(),
        }
    }

    fn combined_label(self, address: &StandardizedAddress) -> Option<String> {
        match self {
            TrackedField::City => address.city_label(),
            _ => None,
        }
    }
}

impl fmt::Display for TrackedField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A before/after value pair for one field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeSignature {
    previous: Option<String>,
    current: Option<String>,
}

impl ChangeSignature {
    pub fn new(previous: Option<&str>, current: Option<&str>) -> Self {
        Self {
            previous: previous.map(str::to_string),
            current: current.map(str::to_string),
        }
    }
}

impl fmt::Display for ChangeSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}=>{}",
            self.previous.as_deref().unwrap_or_default(),
            self.current.as_deref().unwrap_or_default()
        )
    }
}

/// What a field remembers between checks
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum FieldState {
    #[default]
    NeverNotified,
    /// The last transition reported by a consuming check
    Notified(ChangeSignature),
}

/// Where a field stands relative to the current snapshot pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum FieldPhase {
    /// No previous address to compare against yet
    NoPriorValue,
    /// Previous and current values are equal
    Unchanged,
    /// A transition that has not been reported yet
    ChangedUnnotified,
    /// The current transition has already been reported
    ChangedNotified,
}

/// One side of a field transition
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldValue {
    pub value: Option<String>,
    /// Display form combining related fields, e.g. `Serro, MG` for a city
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub combined_label: Option<String>,
}

impl FieldValue {
    fn of(field: TrackedField, address: Option<&StandardizedAddress>) -> Self {
        match address {
            Some(address) => Self {
                value: field.value(address).map(str::to_string),
                combined_label: field.combined_label(address),
            },
            None => Self::default(),
        }
    }
}

/// Payload handed to field change callbacks
///
/// The field name is carried once in `field`; `previous` and `current` hold
/// that field's value on each side of the transition:
///
/// ```json
/// {
///   "field": "city",
///   "hasChanged": true,
///   "current": { "value": "Bela Vista", "combinedLabel": "Bela Vista, SP" },
///   "previous": { "value": "Centro", "combinedLabel": "Centro, SP" },
///   "timestamp": "2024-05-01T12:00:00Z"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeDetails {
    pub field: TrackedField,
    /// Whether the previous and current values differ
    pub has_changed: bool,
    pub current: FieldValue,
    pub previous: FieldValue,
    pub timestamp: DateTime<Utc>,
}

/// Per-field memory of reported transitions
#[derive(Debug, Clone, Default)]
pub struct ChangeTracker {
    street: FieldState,
    neighborhood: FieldState,
    city: FieldState,
}

impl ChangeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report whether `field` changed between the two snapshots, consuming
    /// the transition
    ///
    /// Returns `true` at most once per distinct transition.
    pub fn check(
        &mut self,
        field: TrackedField,
        previous: Option<&StandardizedAddress>,
        current: Option<&StandardizedAddress>,
    ) -> bool {
        let Some(signature) = transition(field, previous, current) else {
            return false;
        };

        let state = self.state_mut(field);
        if matches!(state, FieldState::Notified(last) if *last == signature) {
            return false;
        }

        *state = FieldState::Notified(signature);
        true
    }

    /// Classify `field` without consuming anything
    pub fn phase(
        &self,
        field: TrackedField,
        previous: Option<&StandardizedAddress>,
        current: Option<&StandardizedAddress>,
    ) -> FieldPhase {
        if previous.is_none() {
            return FieldPhase::NoPriorValue;
        }

        match transition(field, previous, current) {
            None => FieldPhase::Unchanged,
            Some(signature) => match self.state(field) {
                FieldState::Notified(last) if *last == signature => FieldPhase::ChangedNotified,
                _ => FieldPhase::ChangedUnnotified,
            },
        }
    }

    /// Describe the transition of `field` without consuming it
    pub fn details(
        field: TrackedField,
        previous: Option<&StandardizedAddress>,
        current: Option<&StandardizedAddress>,
    ) -> ChangeDetails {
        ChangeDetails {
            field,
            has_changed: transition(field, previous, current).is_some(),
            current: FieldValue::of(field, current),
            previous: FieldValue::of(field, previous),
            timestamp: Utc::now(),
        }
    }

    pub fn state(&self, field: TrackedField) -> &FieldState {
        match field {
            TrackedField::Street => &self.street,
            TrackedField::Neighborhood => &self.neighborhood,
            TrackedField::City => &self.city,
        }
    }

    fn state_mut(&mut self, field: TrackedField) -> &mut FieldState {
        match field {
            TrackedField::Street => &mut self.street,
            TrackedField::Neighborhood => &mut self.neighborhood,
            TrackedField::City => &mut self.city,
        }
    }
}

/// The signature of a real transition, or `None` when there is no previous
/// address or the value did not change
fn transition(
    field: TrackedField,
    previous: Option<&StandardizedAddress>,
    current: Option<&StandardizedAddress>,
) -> Option<ChangeSignature> {
    let previous = field.value(previous?);
    let current = current.and_then(|address| field.value(address));
    if previous == current {
        return None;
    }
    Some(ChangeSignature::new(previous, current))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn address(street: &str, neighborhood: &str, city: &str) -> StandardizedAddress {
        StandardizedAddress {
            street: Some(street.to_string()),
            neighborhood: Some(neighborhood.to_string()),
            city: Some(city.to_string()),
            state_code: Some("SP".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_no_previous_is_no_change() {
        let mut tracker = ChangeTracker::new();
        let current = address("Rua Augusta", "Consolação", "São Paulo");

        for field in TrackedField::ALL {
            assert!(!tracker.check(field, None, Some(&current)));
            assert_eq!(
                tracker.phase(field, None, Some(&current)),
                FieldPhase::NoPriorValue
            );
        }
    }

    #[test]
    fn test_check_is_consuming() {
        let mut tracker = ChangeTracker::new();
        let previous = address("Rua Augusta", "Consolação", "São Paulo");
        let current = address("Avenida Paulista", "Consolação", "São Paulo");

        assert!(tracker.check(TrackedField::Street, Some(&previous), Some(&current)));
        assert!(!tracker.check(TrackedField::Street, Some(&previous), Some(&current)));
    }

    #[test]
    fn test_fields_tracked_independently() {
        let mut tracker = ChangeTracker::new();
        let previous = address("Rua Augusta", "Consolação", "São Paulo");
        let current = address("Rua Augusta", "Bela Vista", "São Paulo");

        assert!(!tracker.check(TrackedField::Street, Some(&previous), Some(&current)));
        assert!(tracker.check(TrackedField::Neighborhood, Some(&previous), Some(&current)));
        assert!(!tracker.check(TrackedField::City, Some(&previous), Some(&current)));
        assert_eq!(tracker.state(TrackedField::Street), &FieldState::NeverNotified);
    }

    #[test]
    fn test_new_transition_reported_again() {
        let mut tracker = ChangeTracker::new();
        let a = address("Rua A", "Centro", "Serro");
        let b = address("Rua B", "Centro", "Serro");

        assert!(tracker.check(TrackedField::Street, Some(&a), Some(&b)));
        // Moving back is a different transition
        assert!(tracker.check(TrackedField::Street, Some(&b), Some(&a)));
        // And repeating the first one after it is reported again
        assert!(tracker.check(TrackedField::Street, Some(&a), Some(&b)));
    }

    #[test]
    fn test_equal_values_never_reported() {
        let mut tracker = ChangeTracker::new();
        let a = address("Rua A", "Centro", "Serro");
        let same = address("Rua A", "Centro", "Serro");

        assert!(!tracker.check(TrackedField::Street, Some(&a), Some(&same)));
        assert_eq!(
            tracker.phase(TrackedField::Street, Some(&a), Some(&same)),
            FieldPhase::Unchanged
        );
    }

    #[test]
    fn test_value_disappearing_is_a_change() {
        let mut tracker = ChangeTracker::new();
        let a = address("Rua A", "Centro", "Serro");
        let no_street = StandardizedAddress {
            street: None,
            ..a.clone()
        };

        assert!(tracker.check(TrackedField::Street, Some(&a), Some(&no_street)));
        let details = ChangeTracker::details(TrackedField::Street, Some(&a), Some(&no_street));
        assert!(details.has_changed);
        assert_eq!(details.current.value, None);
    }

    #[test]
    fn test_phase_transitions() {
        let mut tracker = ChangeTracker::new();
        let a = address("Rua A", "Centro", "Serro");
        let b = address("Rua A", "Centro", "Diamantina");

        assert_eq!(
            tracker.phase(TrackedField::City, Some(&a), Some(&b)),
            FieldPhase::ChangedUnnotified
        );
        assert!(tracker.check(TrackedField::City, Some(&a), Some(&b)));
        assert_eq!(
            tracker.phase(TrackedField::City, Some(&a), Some(&b)),
            FieldPhase::ChangedNotified
        );
    }

    #[test]
    fn test_details_do_not_consume() {
        let mut tracker = ChangeTracker::new();
        let previous = address("Rua A", "Centro", "Centro");
        let current = address("Rua A", "Centro", "Bela Vista");

        let details = ChangeTracker::details(TrackedField::City, Some(&previous), Some(&current));
        assert!(details.has_changed);
        assert_eq!(details.previous.value.as_deref(), Some("Centro"));
        assert_eq!(details.current.value.as_deref(), Some("Bela Vista"));
        assert_eq!(details.current.combined_label.as_deref(), Some("Bela Vista, SP"));

        assert!(tracker.check(TrackedField::City, Some(&previous), Some(&current)));
    }

    #[test]
    fn test_combined_label_only_for_city() {
        let a = address("Rua A", "Centro", "Serro");
        let details = ChangeTracker::details(TrackedField::Street, None, Some(&a));
        assert!(!details.has_changed);
        assert_eq!(details.current.value.as_deref(), Some("Rua A"));
        assert_eq!(details.current.combined_label, None);
        assert_eq!(details.previous, FieldValue::default());
    }

    #[test]
    fn test_signature_display() {
        let signature = ChangeSignature::new(Some("Centro"), Some("Bela Vista"));
        assert_eq!(signature.to_string(), "Centro=>Bela Vista");

        let vanished = ChangeSignature::new(Some("Centro"), None);
        assert_eq!(vanished.to_string(), "Centro=>");
        assert_ne!(vanished, ChangeSignature::new(Some("Centro"), Some("")));
    }

    #[test]
    fn test_details_serialization() {
        let previous = address("Rua A", "Centro", "Centro");
        let current = address("Rua A", "Centro", "Bela Vista");
        let details = ChangeTracker::details(TrackedField::City, Some(&previous), Some(&current));

        let json = serde_json::to_value(&details).unwrap();
        assert_eq!(json["field"], "city");
        assert_eq!(json["hasChanged"], true);
        assert_eq!(json["previous"]["value"], "Centro");
        assert_eq!(json["current"]["value"], "Bela Vista");
        assert_eq!(json["current"]["combinedLabel"], "Bela Vista, SP");
        // The field name is not repeated inside either side
        assert!(json["previous"].get("city").is_none());

        let parsed: ChangeDetails = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, details);
    }
}
