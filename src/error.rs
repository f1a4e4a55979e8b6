//! Error types and HTTP error response handling.
//!
//! Every handler returns `Result<T, AppError>`; this module decides which
//! status code and JSON body each failure becomes.

use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::services::dice::DiceError;

/// Application-wide error type.
///
/// # Error Categories
///
/// - **Database Errors**: Any sqlx::Error from database operations
/// - **Authentication Errors**: Missing sessions, bad credentials, spent tokens
/// - **Resource Errors**: Requested resources not found (or not owned)
/// - **Validation Errors**: Invalid request data or dice expressions
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Database operation failed (e.g., connection error, query error).
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Hashing or parsing a stored password hash failed.
    #[error("Password hashing failed: {0}")]
    PasswordHash(String),

    /// Session token is missing, unknown, or expired.
    ///
    /// Returns HTTP 401 Unauthorized.
    #[error("Authentication required")]
    Unauthorized,

    /// Email/password pair did not match.
    ///
    /// Unknown emails and wrong passwords share this variant so that the
    /// response does not reveal which accounts exist.
    #[error("Invalid email or password")]
    InvalidCredentials,

    /// Password-reset or magic-link token is unknown, expired, or already used.
    #[error("Token is invalid or has expired")]
    InvalidToken,

    /// An account with this email already exists.
    #[error("Email is already registered")]
    EmailTaken,

    /// Requested resource does not exist or belongs to another user.
    ///
    /// Returns HTTP 404 Not Found. The string names the resource kind
    /// (`campaign`, `npc`, ...) and becomes part of the error code.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// Dice expression could not be parsed or is out of range.
    #[error(transparent)]
    InvalidDiceExpression(#[from] DiceError),

    /// Request body or parameters are invalid.
    #[error("Invalid request")]
    InvalidRequest(String),

    /// Write clashes with existing data (e.g., duplicate session number).
    #[error("Conflict")]
    Conflict(String),
}

impl AppError {
    /// Machine-readable error code placed in the response body.
    pub fn code(&self) -> String {
        match self {
            AppError::Database(_) | AppError::PasswordHash(_) => "internal_error".to_string(),
            AppError::Unauthorized => "unauthorized".to_string(),
            AppError::InvalidCredentials => "invalid_credentials".to_string(),
            AppError::InvalidToken => "invalid_token".to_string(),
            AppError::EmailTaken => "email_taken".to_string(),
            AppError::NotFound(resource) => format!("{resource}_not_found"),
            AppError::InvalidDiceExpression(_) => "invalid_dice_expression".to_string(),
            AppError::InvalidRequest(_) => "invalid_request".to_string(),
            AppError::Conflict(_) => "conflict".to_string(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Database(_) | AppError::PasswordHash(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Unauthorized | AppError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AppError::InvalidToken
            | AppError::InvalidDiceExpression(_)
            | AppError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            AppError::EmailTaken | AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
        }
    }

    /// Shorthand used by validators.
    pub fn invalid(message: impl Into<String>) -> Self {
        AppError::InvalidRequest(message.into())
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::InvalidRequest(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::InvalidRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::InvalidRequest(rejection.body_text())
    }
}

/// Convert AppError into an HTTP response.
///
/// # Response Format
///
/// ```json
/// {
///   "error": {
///     "code": "campaign_not_found",
///     "message": "campaign not found"
///   }
/// }
/// ```
///
/// Internal failures are logged here and answered with a generic message.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();

        let message = match &self {
            AppError::Database(e) => {
                tracing::error!(error = %e, "database error");
                "An internal error occurred".to_string()
            }
            AppError::PasswordHash(e) => {
                tracing::error!(error = %e, "password hashing error");
                "An internal error occurred".to_string()
            }
            AppError::InvalidRequest(msg) | AppError::Conflict(msg) => msg.clone(),
            other => other.to_string(),
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}
