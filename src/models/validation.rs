//! Validation at the form boundary. Nothing is written unless these pass.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::poi::{ChecklistItem, Coordinates, PointOfInterest};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("Name is required")]
    EmptyName,
    #[error("Latitude and longitude are required")]
    MissingCoordinates,
    #[error("Latitude {0} is outside -90..90")]
    LatitudeOutOfRange(f64),
    #[error("Longitude {0} is outside -180..180")]
    LongitudeOutOfRange(f64),
    #[error("Invalid color format. Must be hex (#RRGGBB or #RRGGBBAA)")]
    InvalidColor,
    #[error("Text must not be empty")]
    EmptyText,
    #[error("A place named '{0}' already exists")]
    AlreadyExists(String),
}

/// Fields submitted by the add/edit form. `None` keeps the current value; an
/// empty string clears an optional field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoiFields {
    pub name: Option<String>,
    pub category: Option<String>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub notes: Option<String>,
    pub image_url: Option<String>,
    pub checklist: Option<Vec<ChecklistItem>>,
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

pub fn validate_coordinates(lat: f64, lng: f64) -> Result<Coordinates, ValidationError> {
    if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
        return Err(ValidationError::LatitudeOutOfRange(lat));
    }
    if !lng.is_finite() || !(-180.0..=180.0).contains(&lng) {
        return Err(ValidationError::LongitudeOutOfRange(lng));
    }
    Ok(Coordinates { lat, lng })
}

pub fn validate_color(color: &str) -> Result<(), ValidationError> {
    let hex_part = color.strip_prefix('#').ok_or(ValidationError::InvalidColor)?;
    if hex_part.len() != 6 && hex_part.len() != 8 {
        return Err(ValidationError::InvalidColor);
    }
    if !hex_part.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(ValidationError::InvalidColor);
    }
    Ok(())
}

pub fn validate_text(text: &str) -> Result<String, ValidationError> {
    non_empty(text.to_string()).ok_or(ValidationError::EmptyText)
}

impl PoiFields {
    /// Builds a brand-new record. Name and both coordinates are mandatory.
    pub fn into_new_record(self) -> Result<PointOfInterest, ValidationError> {
        let name = self
            .name
            .clone()
            .and_then(non_empty)
            .ok_or(ValidationError::EmptyName)?;
        let (Some(lat), Some(lng)) = (self.lat, self.lng) else {
            return Err(ValidationError::MissingCoordinates);
        };
        let coordinates = validate_coordinates(lat, lng)?;
        let base = PointOfInterest::new(name, None, coordinates);
        self.apply_to(&base)
    }

    /// Merges the submitted fields over `base`. Fields left as `None` keep
    /// their current value, including the checklist.
    pub fn apply_to(self, base: &PointOfInterest) -> Result<PointOfInterest, ValidationError> {
        let mut record = base.clone();

        if let Some(name) = self.name {
            record.name = non_empty(name).ok_or(ValidationError::EmptyName)?;
        }
        if let Some(category) = self.category {
            record.category = non_empty(category);
        }
        let lat = self.lat.unwrap_or(record.coordinates.lat);
        let lng = self.lng.unwrap_or(record.coordinates.lng);
        record.coordinates = validate_coordinates(lat, lng)?;
        if let Some(notes) = self.notes {
            record.notes = non_empty(notes);
        }
        if let Some(image_url) = self.image_url {
            record.image_url = non_empty(image_url);
        }
        if let Some(checklist) = self.checklist {
            record.checklist = checklist
                .into_iter()
                .filter(|item| !item.task.trim().is_empty())
                .collect();
        }

        Ok(record)
    }
}
