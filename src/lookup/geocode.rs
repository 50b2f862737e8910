use serde::Deserialize;
use serde_json::Value;

use super::LookupError;
use crate::models::validation::validate_coordinates;
use crate::models::Coordinates;
use crate::settings::GeocoderSettings;
use crate::log_info;

const ENABLE_LOGS: bool = true;

/// One hit as returned by a Nominatim `/search?format=json` call. Coordinates
/// come back as strings.
#[derive(Debug, Deserialize)]
struct NominatimHit {
    lat: String,
    lon: String,
}

/// Takes the first hit of a Nominatim search response.
pub fn parse_geocode_response(query: &str, body: &Value) -> Result<Coordinates, LookupError> {
    let hits = body
        .as_array()
        .ok_or_else(|| LookupError::Malformed("expected a JSON array".into()))?;
    let first = hits
        .first()
        .ok_or_else(|| LookupError::NoResult(query.to_string()))?;

    let hit: NominatimHit = serde_json::from_value(first.clone())
        .map_err(|err| LookupError::Malformed(err.to_string()))?;
    let lat: f64 = hit
        .lat
        .trim()
        .parse()
        .map_err(|_| LookupError::Malformed(format!("latitude '{}'", hit.lat)))?;
    let lng: f64 = hit
        .lon
        .trim()
        .parse()
        .map_err(|_| LookupError::Malformed(format!("longitude '{}'", hit.lon)))?;

    validate_coordinates(lat, lng).map_err(|err| LookupError::Malformed(err.to_string()))
}

#[derive(Clone)]
pub struct NominatimGeocoder {
    client: reqwest::Client,
    settings: GeocoderSettings,
}

impl NominatimGeocoder {
    pub fn new(client: reqwest::Client, settings: GeocoderSettings) -> Self {
        Self { client, settings }
    }

    /// Resolves free text to the coordinates of the first match.
    pub async fn geocode(&self, query: &str) -> Result<Coordinates, LookupError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(LookupError::NoResult(String::new()));
        }

        let body: Value = self
            .client
            .get(&self.settings.endpoint)
            .query(&[("q", query), ("format", "json"), ("limit", "1")])
            .header(reqwest::header::USER_AGENT, self.settings.user_agent.as_str())
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let coordinates = parse_geocode_response(query, &body)?;
        log_info!(
            "Geocoded '{}' to ({}, {})",
            query,
            coordinates.lat,
            coordinates.lng
        );
        Ok(coordinates)
    }
}
