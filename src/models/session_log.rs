//! Session log models: one entry per play session of a campaign.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::AppError,
    validation::{nullable, optional_text, patch_text, required_text},
};

pub const TITLE_MAX: usize = 200;
pub const SUMMARY_MAX: usize = 50_000;

/// Represents a session log record from the database.
///
/// `session_number` is unique within a campaign.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct SessionLog {
    pub id: Uuid,
    pub campaign_id: Uuid,
    pub session_number: i32,
    pub title: String,
    pub played_on: Option<NaiveDate>,
    pub summary: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// ```json
/// {
///   "title": "Into the Mists",
///   "played_on": "2026-10-09",
///   "summary": "The party arrived in Barovia..."
/// }
/// ```
///
/// `session_number` is assigned as the next free number when omitted.
#[derive(Debug, Deserialize)]
pub struct CreateSessionLogRequest {
    pub session_number: Option<i32>,
    pub title: String,
    pub played_on: Option<NaiveDate>,
    pub summary: Option<String>,
}

/// `"played_on": null` clears the date; leaving the field out keeps it.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateSessionLogRequest {
    pub session_number: Option<i32>,
    pub title: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub played_on: Option<Option<NaiveDate>>,
    pub summary: Option<String>,
}

#[derive(Debug, PartialEq)]
pub struct SessionLogFields {
    /// `None` means "next free number" (create only).
    pub session_number: Option<i32>,
    pub title: String,
    pub played_on: Option<NaiveDate>,
    pub summary: Option<String>,
}

fn check_number(number: Option<i32>) -> Result<Option<i32>, AppError> {
    match number {
        Some(n) if n < 1 => Err(AppError::invalid("session_number must be at least 1")),
        other => Ok(other),
    }
}

impl CreateSessionLogRequest {
    pub fn validate(self) -> Result<SessionLogFields, AppError> {
        Ok(SessionLogFields {
            session_number: check_number(self.session_number)?,
            title: required_text("title", &self.title, TITLE_MAX)?,
            played_on: self.played_on,
            summary: optional_text("summary", self.summary, SUMMARY_MAX)?,
        })
    }
}

impl UpdateSessionLogRequest {
    pub fn apply(self, current: SessionLog) -> Result<SessionLogFields, AppError> {
        let title = match self.title {
            Some(title) => required_text("title", &title, TITLE_MAX)?,
            None => current.title,
        };

        Ok(SessionLogFields {
            session_number: Some(
                check_number(self.session_number)?.unwrap_or(current.session_number),
            ),
            title,
            played_on: self.played_on.unwrap_or(current.played_on),
            summary: patch_text("summary", current.summary, self.summary, SUMMARY_MAX)?,
        })
    }
}
