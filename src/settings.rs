use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    fs,
    path::PathBuf,
    sync::{PoisonError, RwLock},
};

use crate::feeds::{FeedKind, FeedSource};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeocoderSettings {
    pub endpoint: String,
    /// Nominatim rejects requests without an identifying agent.
    pub user_agent: String,
}

impl Default for GeocoderSettings {
    fn default() -> Self {
        Self {
            endpoint: "https://nominatim.openstreetmap.org/search".into(),
            user_agent: concat!("travel-map/", env!("CARGO_PKG_VERSION")).into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageSettings {
    pub summary_endpoint: String,
    /// `{query}` is replaced with the place name.
    pub fallback_template: String,
    pub probe_timeout_ms: u64,
}

impl Default for ImageSettings {
    fn default() -> Self {
        Self {
            summary_endpoint: "https://en.wikipedia.org/api/rest_v1/page/summary/".into(),
            fallback_template: "https://source.unsplash.com/800x600/?{query}".into(),
            probe_timeout_ms: 5_000,
        }
    }
}

fn default_feeds() -> BTreeMap<FeedKind, FeedSource> {
    FeedKind::ALL
        .into_iter()
        .map(|kind| (kind, FeedSource::Path(format!("data/{kind}.json").into())))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Relative paths are resolved against the bundled resource directory.
    pub feeds: BTreeMap<FeedKind, FeedSource>,
    pub geocoder: GeocoderSettings,
    pub images: ImageSettings,
    /// Upper bound for any outbound HTTP request: feeds, geocoding, images.
    pub request_timeout_ms: u64,
    pub retain_visited_on_delete: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            feeds: default_feeds(),
            geocoder: GeocoderSettings::default(),
            images: ImageSettings::default(),
            request_timeout_ms: 15_000,
            retain_visited_on_delete: true,
        }
    }
}

pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<Settings>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_default()
        } else {
            Settings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn snapshot(&self) -> Settings {
        self.data
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn update(&self, settings: Settings) -> Result<()> {
        let mut guard = self.data.write().unwrap_or_else(PoisonError::into_inner);
        self.persist(&settings)?;
        *guard = settings;
        Ok(())
    }

    fn persist(&self, data: &Settings) -> Result<()> {
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }

    pub fn reload(&self) -> Result<()> {
        let contents = fs::read_to_string(&self.path)?;
        let data: Settings = serde_json::from_str(&contents)?;
        let mut guard = self.data.write().unwrap_or_else(PoisonError::into_inner);
        *guard = data;
        Ok(())
    }
}
