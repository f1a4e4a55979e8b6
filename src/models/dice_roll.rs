//! Dice roll request bodies and the per-campaign roll log.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::services::dice::{RollMode, RollResult};

pub const LABEL_MAX: usize = 120;
pub const DEFAULT_HISTORY_LIMIT: i64 = 20;
pub const MAX_HISTORY_LIMIT: i64 = 100;

/// Body for both roll endpoints.
///
/// ```json
/// { "expression": "1d20+5", "mode": "advantage", "label": "Stealth" }
/// ```
///
/// `label` is only kept when the roll is logged to a campaign.
#[derive(Debug, Deserialize)]
pub struct RollRequest {
    pub expression: String,
    #[serde(default)]
    pub mode: RollMode,
    pub label: Option<String>,
}

/// Represents a logged roll from the `dice_rolls` table.
///
/// The full [`RollResult`] is kept as JSONB; `total` is duplicated into its
/// own column for querying.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct DiceRoll {
    pub id: Uuid,
    pub campaign_id: Uuid,
    pub user_id: Uuid,
    pub label: Option<String>,
    pub expression: String,
    pub mode: String,
    pub result: sqlx::types::Json<RollResult>,
    pub total: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct RollHistoryQuery {
    pub limit: Option<i64>,
}

impl RollHistoryQuery {
    /// Requested limit clamped to `1..=100`, defaulting to 20.
    pub fn effective_limit(&self) -> i64 {
        self.limit
            .unwrap_or(DEFAULT_HISTORY_LIMIT)
            .clamp(1, MAX_HISTORY_LIMIT)
    }
}

#[derive(Debug, Serialize)]
pub struct LoggedRollResponse {
    pub id: Uuid,
    pub label: Option<String>,
    pub rolled_by: Uuid,
    #[serde(flatten)]
    pub result: RollResult,
    pub created_at: DateTime<Utc>,
}

impl From<DiceRoll> for LoggedRollResponse {
    fn from(roll: DiceRoll) -> Self {
        Self {
            id: roll.id,
            label: roll.label,
            rolled_by: roll.user_id,
            result: roll.result.0,
            created_at: roll.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn history_limit_is_clamped() {
        assert_eq!(RollHistoryQuery { limit: None }.effective_limit(), 20);
        assert_eq!(RollHistoryQuery { limit: Some(0) }.effective_limit(), 1);
        assert_eq!(RollHistoryQuery { limit: Some(5000) }.effective_limit(), 100);
        assert_eq!(RollHistoryQuery { limit: Some(42) }.effective_limit(), 42);
    }

    #[test]
    fn mode_defaults_to_normal() {
        let req: RollRequest = serde_json::from_str(r#"{"expression": "2d6"}"#).unwrap();
        assert_eq!(req.mode, RollMode::Normal);
    }

    #[test]
    fn logged_roll_flattens_result() {
        let roll = DiceRoll {
            id: Uuid::new_v4(),
            campaign_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            label: Some("Initiative".into()),
            expression: "1d20+2".into(),
            mode: "normal".into(),
            result: sqlx::types::Json(RollResult {
                expression: "1d20+2".into(),
                count: 1,
                sides: 20,
                modifier: 2,
                mode: RollMode::Normal,
                rolls: vec![14],
                dropped_rolls: None,
                subtotal: 14,
                total: 16,
            }),
            total: 16,
            created_at: Utc::now(),
        };

        let json = serde_json::to_value(LoggedRollResponse::from(roll)).unwrap();
        assert_eq!(json["label"], "Initiative");
        assert_eq!(json["total"], 16);
        assert_eq!(json["rolls"], serde_json::json!([14]));
        assert!(json.get("dropped_rolls").is_none());
    }
}
