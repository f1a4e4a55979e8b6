//! World map pin models.
//!
//! Pin coordinates are fractions of the campaign's map image (`0.0` is the
//! left/top edge, `1.0` the right/bottom edge) so they survive image
//! resizing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::AppError,
    validation::{optional_text, patch_text, required_text},
};

pub const LABEL_MAX: usize = 120;
pub const DESCRIPTION_MAX: usize = 5_000;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PinKind {
    City,
    Dungeon,
    Landmark,
    Encounter,
    #[default]
    Other,
}

impl PinKind {
    pub fn as_str(self) -> &'static str {
        match self {
            PinKind::City => "city",
            PinKind::Dungeon => "dungeon",
            PinKind::Landmark => "landmark",
            PinKind::Encounter => "encounter",
            PinKind::Other => "other",
        }
    }

    fn from_stored(stored: &str) -> Self {
        match stored {
            "city" => PinKind::City,
            "dungeon" => PinKind::Dungeon,
            "landmark" => PinKind::Landmark,
            "encounter" => PinKind::Encounter,
            _ => PinKind::Other,
        }
    }
}

/// Represents a map pin record from the database.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct MapPin {
    pub id: Uuid,
    pub campaign_id: Uuid,
    pub label: String,
    pub description: Option<String>,
    pub kind: String,
    pub x: f64,
    pub y: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// ```json
/// { "label": "Vallaki", "kind": "city", "x": 0.42, "y": 0.37 }
/// ```
#[derive(Debug, Deserialize)]
pub struct CreateMapPinRequest {
    pub label: String,
    pub description: Option<String>,
    #[serde(default)]
    pub kind: PinKind,
    pub x: f64,
    pub y: f64,
}

/// Partial update; sending only `x`/`y` moves the pin.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateMapPinRequest {
    pub label: Option<String>,
    pub description: Option<String>,
    pub kind: Option<PinKind>,
    pub x: Option<f64>,
    pub y: Option<f64>,
}

#[derive(Debug, PartialEq)]
pub struct MapPinFields {
    pub label: String,
    pub description: Option<String>,
    pub kind: PinKind,
    pub x: f64,
    pub y: f64,
}

fn coordinate(field: &str, value: f64) -> Result<f64, AppError> {
    if !value.is_finite() || !(0.0..=1.0).contains(&value) {
        return Err(AppError::invalid(format!(
            "{field} must be a fraction between 0 and 1"
        )));
    }
    Ok(value)
}

impl CreateMapPinRequest {
    pub fn validate(self) -> Result<MapPinFields, AppError> {
        Ok(MapPinFields {
            label: required_text("label", &self.label, LABEL_MAX)?,
            description: optional_text("description", self.description, DESCRIPTION_MAX)?,
            kind: self.kind,
            x: coordinate("x", self.x)?,
            y: coordinate("y", self.y)?,
        })
    }
}

impl UpdateMapPinRequest {
    pub fn apply(self, current: MapPin) -> Result<MapPinFields, AppError> {
        let label = match self.label {
            Some(label) => required_text("label", &label, LABEL_MAX)?,
            None => current.label,
        };

        Ok(MapPinFields {
            label,
            description: patch_text(
                "description",
                current.description,
                self.description,
                DESCRIPTION_MAX,
            )?,
            kind: self
                .kind
                .unwrap_or_else(|| PinKind::from_stored(&current.kind)),
            x: coordinate("x", self.x.unwrap_or(current.x))?,
            y: coordinate("y", self.y.unwrap_or(current.y))?,
        })
    }
}
