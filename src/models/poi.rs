//! Point-of-interest data models.

use serde::{Deserialize, Serialize};

use super::geometry::Geometry;
use super::identity::{effective_category, identity_of, Identity};

/// Status string that feeds use to mark a place as visited.
pub const VISITED_STATUS: &str = "visited";
pub const BUCKET_LIST_STATUS: &str = "bucket_list";

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinates {
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }
}

/// Visited marker as carried by a source feed: parks use a boolean, generic
/// locations use a status string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VisitedSignal {
    Flag(bool),
    Status(String),
}

impl VisitedSignal {
    pub fn is_visited(&self) -> bool {
        match self {
            VisitedSignal::Flag(flag) => *flag,
            VisitedSignal::Status(status) => status == VISITED_STATUS,
        }
    }

    pub fn from_feed(visited: Option<bool>, status: Option<String>) -> Option<Self> {
        visited
            .map(VisitedSignal::Flag)
            .or_else(|| status.map(VisitedSignal::Status))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChecklistItem {
    pub task: String,
    #[serde(default)]
    pub completed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MustSee {
    pub text: String,
    #[serde(default)]
    pub checked: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PointOfInterest {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(flatten)]
    pub coordinates: Coordinates,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, alias = "image_url", skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visited_signal: Option<VisitedSignal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geometry: Option<Geometry>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub checklist: Vec<ChecklistItem>,
    /// Identity of the feed entry this override replaces. Only set on
    /// modified-preset overrides.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_identity: Option<Identity>,
}

impl PointOfInterest {
    pub fn new(name: impl Into<String>, category: Option<String>, coordinates: Coordinates) -> Self {
        Self {
            name: name.into(),
            category,
            coordinates,
            notes: None,
            image_url: None,
            visited_signal: None,
            geometry: None,
            checklist: Vec::new(),
            original_identity: None,
        }
    }

    pub fn identity(&self) -> Identity {
        identity_of(&self.name, self.category.as_deref())
    }

    pub fn effective_category(&self) -> &str {
        effective_category(self.category.as_deref())
    }

    /// Visited flag implied by the record itself, used when no stored flag exists.
    pub fn signals_visited(&self) -> bool {
        self.visited_signal
            .as_ref()
            .map(VisitedSignal::is_visited)
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn visited_signal_interpretation() {
        assert!(VisitedSignal::Flag(true).is_visited());
        assert!(!VisitedSignal::Flag(false).is_visited());
        assert!(VisitedSignal::Status("visited".into()).is_visited());
        assert!(!VisitedSignal::Status("bucket_list".into()).is_visited());
        assert!(!VisitedSignal::Status("Visited".into()).is_visited());
    }

    #[test]
    fn boolean_wins_when_feed_carries_both() {
        let signal = VisitedSignal::from_feed(Some(false), Some("visited".into()));
        assert_eq!(signal, Some(VisitedSignal::Flag(false)));
        assert_eq!(
            VisitedSignal::from_feed(None, Some("visited".into())),
            Some(VisitedSignal::Status("visited".into()))
        );
        assert_eq!(VisitedSignal::from_feed(None, None), None);
    }

    #[test]
    fn visited_signal_is_untagged_on_the_wire() {
        let flag: VisitedSignal = serde_json::from_str("true").unwrap();
        let status: VisitedSignal = serde_json::from_str("\"visited\"").unwrap();
        assert_eq!(flag, VisitedSignal::Flag(true));
        assert_eq!(status, VisitedSignal::Status("visited".into()));
    }

    #[test]
    fn coordinates_range_check() {
        assert!(Coordinates { lat: 90.0, lng: -180.0 }.is_valid());
        assert!(!Coordinates { lat: 90.5, lng: 0.0 }.is_valid());
        assert!(!Coordinates { lat: 0.0, lng: 181.0 }.is_valid());
        assert!(!Coordinates { lat: f64::NAN, lng: 0.0 }.is_valid());
    }

    #[test]
    fn record_without_signal_is_not_visited() {
        let poi = PointOfInterest::new("Lisbon", None, Coordinates { lat: 38.7, lng: -9.1 });
        assert!(!poi.signals_visited());
        assert_eq!(poi.effective_category(), "Uncategorized");
        assert_eq!(poi.identity().as_str(), "Lisbon_Uncategorized");
    }

    #[test]
    fn stored_record_layout() {
        let mut poi = PointOfInterest::new(
            "Yosemite",
            Some("National Park".into()),
            Coordinates { lat: 37.8, lng: -119.5 },
        );
        poi.visited_signal = Some(VisitedSignal::Flag(false));
        let value = serde_json::to_value(&poi).unwrap();
        assert_eq!(value["lat"], 37.8);
        assert_eq!(value["visitedSignal"], false);
        assert!(value.get("originalIdentity").is_none());

        let back: PointOfInterest = serde_json::from_value(value).unwrap();
        assert_eq!(back, poi);
    }
}
