//! Bundled read-only feeds: generic locations, national parks and countries.
//!
//! A feed is a JSON array of place records. Each record is checked on its own;
//! a malformed one is skipped with a warning and the rest of the batch still
//! loads. A feed that cannot be fetched or is not an array fails as a whole.

pub mod countries;

use std::{
    fmt,
    path::{Path, PathBuf},
};

use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::{ChecklistItem, Coordinates, Geometry, PointOfInterest, VisitedSignal};
use crate::{log_info, log_warn};

const ENABLE_LOGS: bool = true;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FeedKind {
    Locations,
    Parks,
    Countries,
}

impl FeedKind {
    /// Fixed reconciliation order, independent of arrival order.
    pub const ALL: [FeedKind; 3] = [FeedKind::Locations, FeedKind::Parks, FeedKind::Countries];

    pub fn as_str(&self) -> &'static str {
        match self {
            FeedKind::Locations => "locations",
            FeedKind::Parks => "parks",
            FeedKind::Countries => "countries",
        }
    }
}

impl fmt::Display for FeedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FeedSource {
    Path(PathBuf),
    Url(String),
}

impl FeedSource {
    /// Anchors a relative path at `base`. URLs and absolute paths are kept.
    pub fn resolved_against(&self, base: &Path) -> FeedSource {
        match self {
            FeedSource::Path(path) if path.is_relative() => FeedSource::Path(base.join(path)),
            other => other.clone(),
        }
    }
}

/// A record as it appears in a feed file, before any checks.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FeedRecord {
    pub name: Option<String>,
    pub category: Option<String>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub notes: Option<String>,
    #[serde(alias = "imageUrl")]
    pub image_url: Option<String>,
    pub status: Option<String>,
    pub visited: Option<bool>,
    pub geometry: Option<Geometry>,
    pub checklist: Option<Vec<ChecklistItem>>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl FeedRecord {
    /// Normalizes a feed record. Records with geometry are placed at the
    /// area-weighted centroid of their boundary.
    pub fn into_point(self) -> Result<PointOfInterest> {
        let name = non_empty(self.name).ok_or_else(|| anyhow!("missing name"))?;

        let centroid = self.geometry.as_ref().and_then(Geometry::centroid);
        let coordinates = match (centroid, self.lat, self.lng) {
            (Some(centroid), _, _) => centroid,
            (None, Some(lat), Some(lng)) => Coordinates { lat, lng },
            _ => bail!("'{name}' has no coordinates"),
        };
        if !coordinates.is_valid() {
            bail!(
                "'{name}' has out-of-range coordinates ({}, {})",
                coordinates.lat,
                coordinates.lng
            );
        }

        let mut poi = PointOfInterest::new(name, non_empty(self.category), coordinates);
        poi.notes = non_empty(self.notes);
        poi.image_url = non_empty(self.image_url);
        poi.visited_signal = VisitedSignal::from_feed(self.visited, self.status);
        poi.geometry = self.geometry;
        poi.checklist = self.checklist.unwrap_or_default();
        Ok(poi)
    }
}

/// Parses a feed document. The countries feed may also be a raw GeoJSON
/// `FeatureCollection`, which is converted on the fly.
pub fn parse_feed(kind: FeedKind, text: &str) -> Result<Vec<PointOfInterest>> {
    let document: Value = serde_json::from_str(text)
        .with_context(|| format!("{kind} feed is not valid JSON"))?;

    let entries = match document {
        Value::Array(entries) => entries,
        other if kind == FeedKind::Countries && countries::is_feature_collection(&other) => {
            countries::from_feature_collection(&other)?
        }
        _ => bail!("{kind} feed must be a JSON array"),
    };

    let total = entries.len();
    let mut records = Vec::with_capacity(total);
    for (index, entry) in entries.into_iter().enumerate() {
        let parsed = serde_json::from_value::<FeedRecord>(entry)
            .map_err(anyhow::Error::from)
            .and_then(FeedRecord::into_point);
        match parsed {
            Ok(poi) => records.push(poi),
            Err(err) => log_warn!("Skipping {kind} record #{index}: {err:#}"),
        }
    }

    log_info!("Parsed {} of {} {kind} records", records.len(), total);
    Ok(records)
}

#[derive(Clone, Default)]
pub struct FeedLoader {
    client: reqwest::Client,
}

impl FeedLoader {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    async fn fetch(&self, source: &FeedSource) -> Result<String> {
        match source {
            FeedSource::Path(path) => tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("failed to read feed {}", path.display())),
            FeedSource::Url(url) => {
                let response = self
                    .client
                    .get(url)
                    .send()
                    .await
                    .with_context(|| format!("failed to fetch feed {url}"))?
                    .error_for_status()
                    .with_context(|| format!("feed {url} returned an error status"))?;
                response
                    .text()
                    .await
                    .with_context(|| format!("failed to read body of feed {url}"))
            }
        }
    }

    pub async fn load(&self, kind: FeedKind, source: &FeedSource) -> Result<Vec<PointOfInterest>> {
        let text = self.fetch(source).await?;
        parse_feed(kind, &text)
    }
}
