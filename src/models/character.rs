//! Player character models.
//!
//! Characters belong to a user and may optionally be attached to one of that
//! user's campaigns. Ability scores use the usual 1-30 scale and responses
//! carry the derived modifiers so clients don't have to compute them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::AppError,
    validation::{in_range, optional_text, patch_text, required_text},
};

pub const NAME_MAX: usize = 120;
pub const LABEL_MAX: usize = 80;
pub const NOTES_MAX: usize = 20_000;
pub const MIN_LEVEL: i16 = 1;
pub const MAX_LEVEL: i16 = 20;
pub const MIN_SCORE: i16 = 1;
pub const MAX_SCORE: i16 = 30;
pub const MAX_HIT_POINTS: i32 = 10_000;

/// Represents a character record from the database.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Character {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub campaign_id: Option<Uuid>,
    pub name: String,
    pub ancestry: Option<String>,
    pub class_name: Option<String>,
    pub level: i16,
    pub strength: i16,
    pub dexterity: i16,
    pub constitution: i16,
    pub intelligence: i16,
    pub wisdom: i16,
    pub charisma: i16,
    pub max_hit_points: i32,
    pub current_hit_points: i32,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The six ability scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbilityScores {
    pub strength: i16,
    pub dexterity: i16,
    pub constitution: i16,
    pub intelligence: i16,
    pub wisdom: i16,
    pub charisma: i16,
}

impl Default for AbilityScores {
    fn default() -> Self {
        Self {
            strength: 10,
            dexterity: 10,
            constitution: 10,
            intelligence: 10,
            wisdom: 10,
            charisma: 10,
        }
    }
}

impl AbilityScores {
    fn validate(self) -> Result<Self, AppError> {
        for (field, score) in [
            ("strength", self.strength),
            ("dexterity", self.dexterity),
            ("constitution", self.constitution),
            ("intelligence", self.intelligence),
            ("wisdom", self.wisdom),
            ("charisma", self.charisma),
        ] {
            in_range(field, score, MIN_SCORE, MAX_SCORE)?;
        }
        Ok(self)
    }

    pub fn modifiers(&self) -> AbilityScores {
        AbilityScores {
            strength: ability_modifier(self.strength),
            dexterity: ability_modifier(self.dexterity),
            constitution: ability_modifier(self.constitution),
            intelligence: ability_modifier(self.intelligence),
            wisdom: ability_modifier(self.wisdom),
            charisma: ability_modifier(self.charisma),
        }
    }
}

/// `floor((score - 10) / 2)`
pub fn ability_modifier(score: i16) -> i16 {
    (score - 10).div_euclid(2)
}

/// Request body for creating a character.
///
/// ```json
/// {
///   "name": "Vex",
///   "ancestry": "Half-elf",
///   "class_name": "Ranger",
///   "level": 3,
///   "abilities": { "strength": 12, "dexterity": 17, "constitution": 14,
///                  "intelligence": 10, "wisdom": 15, "charisma": 11 },
///   "max_hit_points": 28
/// }
/// ```
///
/// `level` defaults to 1, `abilities` to all 10s and `current_hit_points`
/// to `max_hit_points`.
#[derive(Debug, Deserialize)]
pub struct CreateCharacterRequest {
    pub name: String,
    pub campaign_id: Option<Uuid>,
    pub ancestry: Option<String>,
    pub class_name: Option<String>,
    pub level: Option<i16>,
    pub abilities: Option<AbilityScores>,
    pub max_hit_points: i32,
    pub current_hit_points: Option<i32>,
    pub notes: Option<String>,
}

/// Partial update. Absent fields are kept, blank strings clear text fields.
///
/// `campaign_id: null` is indistinguishable from absent, so detaching uses
/// the explicit `detach_campaign` flag.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateCharacterRequest {
    pub name: Option<String>,
    pub campaign_id: Option<Uuid>,
    #[serde(default)]
    pub detach_campaign: bool,
    pub ancestry: Option<String>,
    pub class_name: Option<String>,
    pub level: Option<i16>,
    pub abilities: Option<AbilityScores>,
    pub max_hit_points: Option<i32>,
    pub current_hit_points: Option<i32>,
    pub notes: Option<String>,
}

/// Query string for listing characters.
#[derive(Debug, Default, Deserialize)]
pub struct CharacterFilter {
    pub campaign_id: Option<Uuid>,
}

/// Validated column values.
#[derive(Debug, Clone, PartialEq)]
pub struct CharacterFields {
    pub campaign_id: Option<Uuid>,
    pub name: String,
    pub ancestry: Option<String>,
    pub class_name: Option<String>,
    pub level: i16,
    pub abilities: AbilityScores,
    pub max_hit_points: i32,
    pub current_hit_points: i32,
    pub notes: Option<String>,
}

fn check_hit_points(max: i32, current: i32) -> Result<(), AppError> {
    in_range("max_hit_points", max, 1, MAX_HIT_POINTS)?;
    if current < 0 || current > max {
        return Err(AppError::invalid(
            "current_hit_points must be between 0 and max_hit_points",
        ));
    }
    Ok(())
}

impl CreateCharacterRequest {
    pub fn validate(self) -> Result<CharacterFields, AppError> {
        let level = in_range("level", self.level.unwrap_or(MIN_LEVEL), MIN_LEVEL, MAX_LEVEL)?;
        let abilities = self.abilities.unwrap_or_default().validate()?;
        let current_hit_points = self.current_hit_points.unwrap_or(self.max_hit_points);
        check_hit_points(self.max_hit_points, current_hit_points)?;

        Ok(CharacterFields {
            campaign_id: self.campaign_id,
            name: required_text("name", &self.name, NAME_MAX)?,
            ancestry: optional_text("ancestry", self.ancestry, LABEL_MAX)?,
            class_name: optional_text("class_name", self.class_name, LABEL_MAX)?,
            level,
            abilities,
            max_hit_points: self.max_hit_points,
            current_hit_points,
            notes: optional_text("notes", self.notes, NOTES_MAX)?,
        })
    }
}

impl UpdateCharacterRequest {
    /// Merge onto the stored character and validate the result.
    ///
    /// Lowering `max_hit_points` below the current value clamps current
    /// hit points unless the request sets them explicitly.
    pub fn apply(self, current: Character) -> Result<CharacterFields, AppError> {
        let abilities = current.abilities();

        let name = match self.name {
            Some(name) => required_text("name", &name, NAME_MAX)?,
            None => current.name,
        };
        let campaign_id = if self.detach_campaign {
            None
        } else {
            self.campaign_id.or(current.campaign_id)
        };
        let level = in_range(
            "level",
            self.level.unwrap_or(current.level),
            MIN_LEVEL,
            MAX_LEVEL,
        )?;
        let abilities = self.abilities.unwrap_or(abilities).validate()?;
        let max_hit_points = self.max_hit_points.unwrap_or(current.max_hit_points);
        let current_hit_points = self
            .current_hit_points
            .unwrap_or(current.current_hit_points.min(max_hit_points));
        check_hit_points(max_hit_points, current_hit_points)?;

        Ok(CharacterFields {
            campaign_id,
            name,
            ancestry: patch_text("ancestry", current.ancestry, self.ancestry, LABEL_MAX)?,
            class_name: patch_text("class_name", current.class_name, self.class_name, LABEL_MAX)?,
            level,
            abilities,
            max_hit_points,
            current_hit_points,
            notes: patch_text("notes", current.notes, self.notes, NOTES_MAX)?,
        })
    }
}

impl Character {
    pub fn abilities(&self) -> AbilityScores {
        AbilityScores {
            strength: self.strength,
            dexterity: self.dexterity,
            constitution: self.constitution,
            intelligence: self.intelligence,
            wisdom: self.wisdom,
            charisma: self.charisma,
        }
    }
}

/// Character as returned to clients.
#[derive(Debug, Serialize)]
pub struct CharacterResponse {
    pub id: Uuid,
    pub campaign_id: Option<Uuid>,
    pub name: String,
    pub ancestry: Option<String>,
    pub class_name: Option<String>,
    pub level: i16,
    pub abilities: AbilityScores,
    pub ability_modifiers: AbilityScores,
    pub max_hit_points: i32,
    pub current_hit_points: i32,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Character> for CharacterResponse {
    fn from(character: Character) -> Self {
        let abilities = character.abilities();
        Self {
            id: character.id,
            campaign_id: character.campaign_id,
            name: character.name,
            ancestry: character.ancestry,
            class_name: character.class_name,
            level: character.level,
            abilities,
            ability_modifiers: abilities.modifiers(),
            max_hit_points: character.max_hit_points,
            current_hit_points: character.current_hit_points,
            notes: character.notes,
            created_at: character.created_at,
            updated_at: character.updated_at,
        }
    }
}
