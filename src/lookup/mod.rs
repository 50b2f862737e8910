//! Lookups against third-party HTTP services: free-text geocoding and image
//! resolution for places without a usable picture. Every failure here is
//! recoverable and only ever surfaces as a notification.

mod geocode;
mod images;

use std::time::Duration;

use thiserror::Error;

pub use geocode::{parse_geocode_response, NominatimGeocoder};
pub use images::{is_image, parse_summary_thumbnail, ImageResolver};

#[derive(Debug, Error)]
pub enum LookupError {
    #[error("request failed: {0}")]
    Network(#[from] reqwest::Error),
    #[error("invalid lookup url: {0}")]
    InvalidUrl(String),
    #[error("no result for '{0}'")]
    NoResult(String),
    #[error("malformed response: {0}")]
    Malformed(String),
    #[error("timed out after {0} ms")]
    Timeout(u64),
    #[error("'{0}' is not an image")]
    NotAnImage(String),
    #[error("no image found for '{0}'")]
    NoImage(String),
}

/// Shared client for every outbound request. Each request, including reading
/// the body, gives up after `timeout_ms`.
pub fn http_client(timeout_ms: u64) -> Result<reqwest::Client, LookupError> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_millis(timeout_ms))
        .connect_timeout(Duration::from_millis(timeout_ms))
        .build()?;
    Ok(client)
}
