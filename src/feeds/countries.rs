//! Conversion of a world-boundaries GeoJSON `FeatureCollection` into the
//! countries feed format.

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::Value;

use crate::models::{poi::BUCKET_LIST_STATUS, Geometry};

pub const COUNTRY_CATEGORY: &str = "Countries to Visit";
const UNKNOWN_COUNTRY: &str = "Unknown Country";

/// Property names that may carry the country name, in lookup order.
const NAME_PROPERTIES: &[&str] = &[
    "NAME",
    "name",
    "NAME_LONG",
    "ADMIN",
    "admin",
    "NAME_EN",
    "NAME_ENGLISH",
];

#[derive(Debug, Serialize)]
struct CountryEntry {
    name: String,
    lat: f64,
    lng: f64,
    category: &'static str,
    status: &'static str,
    visited: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    geometry: Option<Geometry>,
}

pub fn is_feature_collection(document: &Value) -> bool {
    document.get("type").and_then(Value::as_str) == Some("FeatureCollection")
}

fn country_name(properties: Option<&Value>) -> String {
    properties
        .and_then(|props| {
            NAME_PROPERTIES
                .iter()
                .filter_map(|key| props.get(*key).and_then(Value::as_str))
                .find(|name| !name.is_empty())
        })
        .unwrap_or(UNKNOWN_COUNTRY)
        .to_string()
}

fn round6(value: f64) -> f64 {
    (value * 1_000_000.0).round() / 1_000_000.0
}

/// Converts each feature into a countries-feed entry: simplified geometry,
/// centroid coordinates and a bucket-list status. Features whose geometry is
/// missing or not a (multi)polygon are kept without a boundary at (0, 0).
/// Entries are sorted by name.
pub fn from_feature_collection(document: &Value) -> Result<Vec<Value>> {
    let features = document
        .get("features")
        .and_then(Value::as_array)
        .context("FeatureCollection has no features array")?;

    let mut entries: Vec<CountryEntry> = features
        .iter()
        .map(|feature| {
            let geometry = feature
                .get("geometry")
                .cloned()
                .and_then(|raw| serde_json::from_value::<Geometry>(raw).ok());
            let centroid = geometry.as_ref().and_then(Geometry::centroid);
            CountryEntry {
                name: country_name(feature.get("properties")),
                lat: centroid.map(|c| round6(c.lat)).unwrap_or(0.0),
                lng: centroid.map(|c| round6(c.lng)).unwrap_or(0.0),
                category: COUNTRY_CATEGORY,
                status: BUCKET_LIST_STATUS,
                visited: false,
                geometry: geometry.map(|g| g.decimated()),
            }
        })
        .collect();

    entries.sort_by(|a, b| a.name.cmp(&b.name));

    entries
        .into_iter()
        .map(|entry| serde_json::to_value(entry).context("failed to encode country entry"))
        .collect()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::feeds::{parse_feed, FeedKind};

    fn collection() -> Value {
        json!({
            "type": "FeatureCollection",
            "features": [
                {
                    "type": "Feature",
                    "properties": {"ADMIN": "Zedland"},
                    "geometry": {"type": "Polygon", "coordinates": [[[0,0],[4,0],[4,4],[0,4],[0,0]]]}
                },
                {
                    "type": "Feature",
                    "properties": {"name": "Archipelago"},
                    "geometry": {"type": "MultiPolygon", "coordinates": [
                        [[[10,10],[20,10],[20,20],[10,20],[10,10]]],
                        [[[50,50],[50.1,50],[50.1,50.1],[50,50.1],[50,50]]]
                    ]}
                },
                {
                    "type": "Feature",
                    "properties": {},
                    "geometry": null
                }
            ]
        })
    }

    #[test]
    fn converts_and_sorts_features() {
        let entries = from_feature_collection(&collection()).unwrap();
        let names: Vec<_> = entries.iter().map(|e| e["name"].as_str().unwrap()).collect();
        assert_eq!(names, vec!["Archipelago", "Unknown Country", "Zedland"]);

        let zed = &entries[2];
        assert_eq!(zed["lat"], 2.0);
        assert_eq!(zed["lng"], 2.0);
        assert_eq!(zed["category"], COUNTRY_CATEGORY);
        assert_eq!(zed["status"], "bucket_list");
        assert_eq!(zed["visited"], false);
    }

    #[test]
    fn name_lookup_prefers_upper_case_name() {
        let props = json!({"name": "lower", "NAME": "Upper", "ADMIN": "admin"});
        assert_eq!(country_name(Some(&props)), "Upper");
        assert_eq!(country_name(None), UNKNOWN_COUNTRY);
    }

    #[test]
    fn feature_collection_loads_as_countries_feed() {
        let text = collection().to_string();
        let records = parse_feed(FeedKind::Countries, &text).unwrap();
        assert_eq!(records.len(), 3);

        let archipelago = &records[0];
        assert!(archipelago.coordinates.lat > 10.0 && archipelago.coordinates.lat < 20.0);
        assert!(archipelago.geometry.is_some());
        assert!(!archipelago.signals_visited());
    }

    #[test]
    fn feature_collection_is_rejected_for_other_feeds() {
        let text = collection().to_string();
        assert!(parse_feed(FeedKind::Locations, &text).is_err());
    }
}
