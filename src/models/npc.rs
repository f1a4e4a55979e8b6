//! NPC roster models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::AppError,
    validation::{optional_text, patch_text, required_text},
};

pub const NAME_MAX: usize = 120;
pub const ROLE_MAX: usize = 120;
pub const LOCATION_MAX: usize = 200;
pub const NOTES_MAX: usize = 20_000;

/// How an NPC feels about the party.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Disposition {
    Friendly,
    #[default]
    Neutral,
    Hostile,
}

impl Disposition {
    pub fn as_str(self) -> &'static str {
        match self {
            Disposition::Friendly => "friendly",
            Disposition::Neutral => "neutral",
            Disposition::Hostile => "hostile",
        }
    }
}

/// Represents an NPC record from the database.
///
/// `disposition` is stored as text and constrained by a CHECK to the
/// values of [`Disposition`].
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct Npc {
    pub id: Uuid,
    pub campaign_id: Uuid,
    pub name: String,
    pub role: Option<String>,
    pub disposition: String,
    pub location: Option<String>,
    pub notes: Option<String>,
    pub is_alive: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// ```json
/// {
///   "name": "Ireena Kolyana",
///   "role": "Burgomaster's daughter",
///   "disposition": "friendly",
///   "location": "Village of Barovia"
/// }
/// ```
#[derive(Debug, Deserialize)]
pub struct CreateNpcRequest {
    pub name: String,
    pub role: Option<String>,
    #[serde(default)]
    pub disposition: Disposition,
    pub location: Option<String>,
    pub notes: Option<String>,
    #[serde(default = "default_alive")]
    pub is_alive: bool,
}

fn default_alive() -> bool {
    true
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateNpcRequest {
    pub name: Option<String>,
    pub role: Option<String>,
    pub disposition: Option<Disposition>,
    pub location: Option<String>,
    pub notes: Option<String>,
    pub is_alive: Option<bool>,
}

/// Query string for `GET .../npcs`.
#[derive(Debug, Default, Deserialize)]
pub struct NpcFilter {
    pub disposition: Option<Disposition>,
}

#[derive(Debug, PartialEq)]
pub struct NpcFields {
    pub name: String,
    pub role: Option<String>,
    pub disposition: Disposition,
    pub location: Option<String>,
    pub notes: Option<String>,
    pub is_alive: bool,
}

impl CreateNpcRequest {
    pub fn validate(self) -> Result<NpcFields, AppError> {
        Ok(NpcFields {
            name: required_text("name", &self.name, NAME_MAX)?,
            role: optional_text("role", self.role, ROLE_MAX)?,
            disposition: self.disposition,
            location: optional_text("location", self.location, LOCATION_MAX)?,
            notes: optional_text("notes", self.notes, NOTES_MAX)?,
            is_alive: self.is_alive,
        })
    }
}

impl UpdateNpcRequest {
    pub fn apply(self, current: Npc) -> Result<NpcFields, AppError> {
        let name = match self.name {
            Some(name) => required_text("name", &name, NAME_MAX)?,
            None => current.name,
        };
        let disposition = match self.disposition {
            Some(d) => d,
            None => parse_disposition(&current.disposition),
        };

        Ok(NpcFields {
            name,
            role: patch_text("role", current.role, self.role, ROLE_MAX)?,
            disposition,
            location: patch_text("location", current.location, self.location, LOCATION_MAX)?,
            notes: patch_text("notes", current.notes, self.notes, NOTES_MAX)?,
            is_alive: self.is_alive.unwrap_or(current.is_alive),
        })
    }
}

/// Stored values are CHECK-constrained; anything unexpected reads as neutral.
fn parse_disposition(stored: &str) -> Disposition {
    match stored {
        "friendly" => Disposition::Friendly,
        "hostile" => Disposition::Hostile,
        _ => Disposition::Neutral,
    }
}
