//! Campaign data models and API request/response types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::AppError,
    validation::{optional_http_url, optional_text, patch_text, required_text},
};

pub const NAME_MAX: usize = 120;
pub const DESCRIPTION_MAX: usize = 10_000;
pub const SETTING_MAX: usize = 200;

/// Represents a campaign record from the database.
///
/// Every other campaign resource (NPCs, session logs, pins, rolls) hangs off
/// a campaign and is deleted with it.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct Campaign {
    pub id: Uuid,

    /// The user who runs the campaign. Queries always filter on it.
    pub owner_id: Uuid,

    pub name: String,
    pub description: Option<String>,

    /// Free-form setting name, e.g. "Forgotten Realms"
    pub setting: Option<String>,

    /// Image used as the backdrop for map pins
    pub map_image_url: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request body for creating a campaign.
///
/// ```json
/// {
///   "name": "Curse of Strahd",
///   "setting": "Barovia",
///   "map_image_url": "https://maps.example/barovia.png"
/// }
/// ```
#[derive(Debug, Deserialize)]
pub struct CreateCampaignRequest {
    pub name: String,
    pub description: Option<String>,
    pub setting: Option<String>,
    pub map_image_url: Option<String>,
}

/// Partial update. Absent fields are kept, blank strings clear.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateCampaignRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub setting: Option<String>,
    pub map_image_url: Option<String>,
}

/// Validated column values for an insert or update.
#[derive(Debug, PartialEq)]
pub struct CampaignFields {
    pub name: String,
    pub description: Option<String>,
    pub setting: Option<String>,
    pub map_image_url: Option<String>,
}

impl CreateCampaignRequest {
    pub fn validate(self) -> Result<CampaignFields, AppError> {
        Ok(CampaignFields {
            name: required_text("name", &self.name, NAME_MAX)?,
            description: optional_text("description", self.description, DESCRIPTION_MAX)?,
            setting: optional_text("setting", self.setting, SETTING_MAX)?,
            map_image_url: optional_http_url("map_image_url", self.map_image_url)?,
        })
    }
}

impl UpdateCampaignRequest {
    /// Merge onto the stored campaign and validate the result.
    pub fn apply(self, current: Campaign) -> Result<CampaignFields, AppError> {
        let name = match self.name {
            Some(name) => required_text("name", &name, NAME_MAX)?,
            None => current.name,
        };
        let map_image_url = match self.map_image_url {
            Some(url) => optional_http_url("map_image_url", Some(url))?,
            None => current.map_image_url,
        };

        Ok(CampaignFields {
            name,
            description: patch_text(
                "description",
                current.description,
                self.description,
                DESCRIPTION_MAX,
            )?,
            setting: patch_text("setting", current.setting, self.setting, SETTING_MAX)?,
            map_image_url,
        })
    }
}

/// Campaign as returned to clients (owner id omitted).
#[derive(Debug, Serialize)]
pub struct CampaignResponse {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub setting: Option<String>,
    pub map_image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Campaign> for CampaignResponse {
    fn from(campaign: Campaign) -> Self {
        Self {
            id: campaign.id,
            name: campaign.name,
            description: campaign.description,
            setting: campaign.setting,
            map_image_url: campaign.map_image_url,
            created_at: campaign.created_at,
            updated_at: campaign.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stored() -> Campaign {
        Campaign {
            id: Uuid::new_v4(),
            owner_id: Uuid::new_v4(),
            name: "Curse of Strahd".into(),
            description: Some("Gothic horror".into()),
            setting: Some("Barovia".into()),
            map_image_url: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn create_requires_a_name() {
        let req = CreateCampaignRequest {
            name: "  ".into(),
            description: None,
            setting: None,
            map_image_url: None,
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn create_trims_and_drops_blanks() {
        let fields = CreateCampaignRequest {
            name: " Tomb of Annihilation ".into(),
            description: Some("".into()),
            setting: Some(" Chult ".into()),
            map_image_url: Some("https://maps.example/chult.jpg".into()),
        }
        .validate()
        .unwrap();

        assert_eq!(fields.name, "Tomb of Annihilation");
        assert_eq!(fields.description, None);
        assert_eq!(fields.setting.as_deref(), Some("Chult"));
    }

    #[test]
    fn create_rejects_non_http_map_url() {
        let req = CreateCampaignRequest {
            name: "X".into(),
            description: None,
            setting: None,
            map_image_url: Some("javascript:alert(1)".into()),
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn update_merges_partial_fields() {
        let fields = UpdateCampaignRequest {
            setting: Some("".into()),
            map_image_url: Some("https://maps.example/barovia.png".into()),
            ..Default::default()
        }
        .apply(stored())
        .unwrap();

        assert_eq!(fields.name, "Curse of Strahd");
        assert_eq!(fields.description.as_deref(), Some("Gothic horror"));
        assert_eq!(fields.setting, None);
        assert_eq!(
            fields.map_image_url.as_deref(),
            Some("https://maps.example/barovia.png")
        );
    }

    #[test]
    fn update_cannot_blank_the_name() {
        let result = UpdateCampaignRequest {
            name: Some("".into()),
            ..Default::default()
        }
        .apply(stored());
        assert!(result.is_err());
    }
}
