use std::time::Duration;

use reqwest::Url;
use serde_json::Value;

use super::LookupError;
use crate::settings::ImageSettings;
use crate::{log_info, log_warn};

const ENABLE_LOGS: bool = true;

/// Picks the picture out of a Wikipedia page-summary document: the thumbnail,
/// else the original image.
pub fn parse_summary_thumbnail(summary: &Value) -> Option<String> {
    ["thumbnail", "originalimage"]
        .iter()
        .filter_map(|key| summary.get(*key)?.get("source")?.as_str())
        .find(|source| !source.is_empty())
        .map(str::to_string)
}

/// True when `bytes` start like an image format we can decode.
pub fn is_image(bytes: &[u8]) -> bool {
    ::image::guess_format(bytes).is_ok()
}

/// Resolves a place name to a picture URL that actually loads.
///
/// Candidates are tried in order: the Wikipedia summary thumbnail, then the
/// configured fallback template. Each one is downloaded under a timeout and
/// kept only if the body is an image.
#[derive(Clone)]
pub struct ImageResolver {
    client: reqwest::Client,
    settings: ImageSettings,
}

impl ImageResolver {
    pub fn new(client: reqwest::Client, settings: ImageSettings) -> Self {
        Self { client, settings }
    }

    fn summary_url(&self, name: &str) -> Result<Url, LookupError> {
        let mut url = Url::parse(&self.settings.summary_endpoint)
            .map_err(|err| LookupError::InvalidUrl(err.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| LookupError::InvalidUrl(self.settings.summary_endpoint.clone()))?
            .pop_if_empty()
            .push(&name.trim().replace(' ', "_"));
        Ok(url)
    }

    fn fallback_url(&self, name: &str) -> Result<Url, LookupError> {
        let filled = self.settings.fallback_template.replace("{query}", name.trim());
        Url::parse(&filled).map_err(|err| LookupError::InvalidUrl(err.to_string()))
    }

    async fn summary_candidate(&self, name: &str) -> Result<String, LookupError> {
        let summary: Value = self
            .client
            .get(self.summary_url(name)?)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        parse_summary_thumbnail(&summary).ok_or_else(|| LookupError::NoResult(name.to_string()))
    }

    /// Downloads `url` and checks the body is an image. A probe that outlives
    /// the timeout is abandoned and counts as a failure.
    pub async fn probe(&self, url: &str) -> Result<(), LookupError> {
        let timeout_ms = self.settings.probe_timeout_ms;
        let download = async {
            let bytes = self
                .client
                .get(url)
                .send()
                .await?
                .error_for_status()?
                .bytes()
                .await?;
            Ok::<_, LookupError>(bytes)
        };

        let bytes = tokio::time::timeout(Duration::from_millis(timeout_ms), download)
            .await
            .map_err(|_| LookupError::Timeout(timeout_ms))??;

        if is_image(&bytes) {
            Ok(())
        } else {
            Err(LookupError::NotAnImage(url.to_string()))
        }
    }

    pub async fn resolve(&self, name: &str) -> Result<String, LookupError> {
        match self.summary_candidate(name).await {
            Ok(candidate) => match self.probe(&candidate).await {
                Ok(()) => {
                    log_info!("Resolved image for '{}' from summary", name);
                    return Ok(candidate);
                }
                Err(err) => log_warn!("Summary image for '{}' rejected: {}", name, err),
            },
            Err(err) => log_warn!("No summary image for '{}': {}", name, err),
        }

        let fallback = self.fallback_url(name)?.to_string();
        match self.probe(&fallback).await {
            Ok(()) => Ok(fallback),
            Err(err) => {
                log_warn!("Fallback image for '{}' rejected: {}", name, err);
                Err(LookupError::NoImage(name.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    const PNG_HEADER: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0x0D];

    fn resolver() -> ImageResolver {
        ImageResolver::new(reqwest::Client::new(), ImageSettings::default())
    }

    #[test]
    fn thumbnail_preferred_over_original() {
        let summary = json!({
            "title": "Yosemite",
            "thumbnail": {"source": "https://upload.example/thumb.jpg"},
            "originalimage": {"source": "https://upload.example/full.jpg"}
        });
        assert_eq!(
            parse_summary_thumbnail(&summary).as_deref(),
            Some("https://upload.example/thumb.jpg")
        );

        let original_only = json!({"originalimage": {"source": "https://upload.example/full.jpg"}});
        assert_eq!(
            parse_summary_thumbnail(&original_only).as_deref(),
            Some("https://upload.example/full.jpg")
        );
        assert_eq!(parse_summary_thumbnail(&json!({"type": "disambiguation"})), None);
    }

    #[test]
    fn recognises_image_bytes() {
        assert!(is_image(PNG_HEADER));
        assert!(is_image(&[0xFF, 0xD8, 0xFF, 0xE0]));
        assert!(!is_image(b"<!DOCTYPE html><html>"));
        assert!(!is_image(&[]));
    }

    #[test]
    fn summary_url_encodes_title() {
        let url = resolver().summary_url("Grand Canyon").unwrap();
        assert!(url.as_str().ends_with("/page/summary/Grand_Canyon"));

        let accented = resolver().summary_url("Côte d'Azur").unwrap();
        assert!(accented.as_str().contains("C%C3%B4te"));
    }

    #[test]
    fn fallback_template_is_filled() {
        let url = resolver().fallback_url("Secret Cove").unwrap();
        assert!(!url.as_str().contains("{query}"));
        assert!(url.as_str().contains("Secret%20Cove"));
    }

    #[tokio::test]
    async fn unreachable_probe_fails_without_panicking() {
        let settings = ImageSettings {
            probe_timeout_ms: 200,
            ..ImageSettings::default()
        };
        let resolver = ImageResolver::new(reqwest::Client::new(), settings);
        assert!(resolver.probe("http://127.0.0.1:9/nothing.png").await.is_err());
    }
}
